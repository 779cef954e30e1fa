//! SQLite store for the canonical entry set.
//!
//! Characters and words live in separate tables. The full attribute map is kept as JSON;
//! radical, strokes and abbreviation are duplicated into their own columns so they can be
//! indexed and queried.

use crate::config::{PROGRESS_INTERVAL, SCAN_BATCH_SIZE};
use crate::models::{AttrKey, Attributes, Category, Entry, Tier};
use crate::schema::{characters, words};
use crate::stats::PipelineStats;
use anyhow::{bail, Context, Result};
use diesel::connection::SimpleConnection;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use indicatif::ProgressBar;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CREATE_SCHEMA: &str = r#"
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS characters (
    id INTEGER PRIMARY KEY,
    headword TEXT NOT NULL UNIQUE,
    pinyin TEXT NOT NULL,
    radical TEXT,
    strokes INTEGER,
    tier TEXT NOT NULL,
    attributes TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_characters_pinyin ON characters(pinyin);
CREATE INDEX IF NOT EXISTS idx_characters_radical ON characters(radical);
CREATE INDEX IF NOT EXISTS idx_characters_tier ON characters(tier);

CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY,
    headword TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('word', 'idiom')),
    pinyin TEXT NOT NULL,
    abbreviation TEXT,
    tier TEXT NOT NULL,
    attributes TEXT NOT NULL,
    UNIQUE (category, headword)
);
CREATE INDEX IF NOT EXISTS idx_words_headword ON words(headword);
CREATE INDEX IF NOT EXISTS idx_words_pinyin ON words(pinyin);
CREATE INDEX IF NOT EXISTS idx_words_tier ON words(tier);
"#;

#[derive(Insertable)]
#[diesel(table_name = characters)]
struct NewCharacter<'a> {
    headword: &'a str,
    pinyin: String,
    radical: Option<&'a str>,
    strokes: Option<i32>,
    tier: &'static str,
    attributes: String,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = characters)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct CharacterRow {
    id: i32,
    headword: String,
    pinyin: String,
    #[allow(dead_code)]
    radical: Option<String>,
    #[allow(dead_code)]
    strokes: Option<i32>,
    tier: String,
    attributes: String,
}

#[derive(Insertable)]
#[diesel(table_name = words)]
struct NewWord<'a> {
    headword: &'a str,
    category: &'static str,
    pinyin: String,
    abbreviation: Option<&'a str>,
    tier: &'static str,
    attributes: String,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = words)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct WordRow {
    id: i32,
    headword: String,
    category: String,
    pinyin: String,
    #[allow(dead_code)]
    abbreviation: Option<String>,
    tier: String,
    attributes: String,
}

fn decode_entry(
    category: Category,
    headword: String,
    pinyin: &str,
    tier: &str,
    attributes: &str,
) -> Result<Entry> {
    let pinyin: Vec<String> = serde_json::from_str(pinyin)
        .with_context(|| format!("Corrupt pinyin column for {:?}", headword))?;
    let attributes: Attributes = serde_json::from_str(attributes)
        .with_context(|| format!("Corrupt attributes column for {:?}", headword))?;
    let tier: Tier = tier.parse()?;
    Ok(Entry {
        headword,
        category,
        pinyin,
        tier,
        attributes,
    })
}

impl CharacterRow {
    fn into_entry(self) -> Result<Entry> {
        decode_entry(
            Category::Character,
            self.headword,
            &self.pinyin,
            &self.tier,
            &self.attributes,
        )
    }
}

impl WordRow {
    fn into_entry(self) -> Result<Entry> {
        let category: Category = self.category.parse()?;
        decode_entry(
            category,
            self.headword,
            &self.pinyin,
            &self.tier,
            &self.attributes,
        )
    }
}

fn upsert_entry(conn: &mut SqliteConnection, entry: &Entry) -> Result<()> {
    let headword = entry.headword.trim();
    if headword.is_empty() {
        bail!("Refusing to store {} entry with an empty headword", entry.category);
    }
    let pinyin = serde_json::to_string(&entry.pinyin)?;
    let attributes = serde_json::to_string(&entry.attributes)?;

    match entry.category {
        Category::Character => {
            let row = NewCharacter {
                headword,
                pinyin,
                radical: entry.attributes.text(AttrKey::Radical),
                strokes: entry
                    .attributes
                    .count(AttrKey::Strokes)
                    .and_then(|s| i32::try_from(s).ok()),
                tier: entry.tier.as_str(),
                attributes,
            };
            diesel::replace_into(characters::table)
                .values(&row)
                .execute(conn)
                .with_context(|| format!("Failed to store character {:?}", headword))?;
        }
        Category::Word | Category::Idiom => {
            let row = NewWord {
                headword,
                category: entry.category.as_str(),
                pinyin,
                abbreviation: entry.attributes.text(AttrKey::Abbreviation),
                tier: entry.tier.as_str(),
                attributes,
            };
            diesel::replace_into(words::table)
                .values(&row)
                .execute(conn)
                .with_context(|| format!("Failed to store {} {:?}", entry.category, headword))?;
        }
    }
    Ok(())
}

/// Entry counts per category and tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub counts: BTreeMap<(Category, Tier), u64>,
}

impl StoreSummary {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn category_total(&self, category: Category) -> u64 {
        self.counts
            .iter()
            .filter(|((c, _), _)| *c == category)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn print(&self) {
        println!("\n=== Store Summary ===");
        for category in Category::ALL {
            println!("{:<10} {:>8}", category.as_str(), self.category_total(category));
            for ((c, tier), n) in &self.counts {
                if *c == category {
                    println!("  {:<12} {:>8}", tier.as_str(), n);
                }
            }
        }
        println!("{:<10} {:>8}", "total", self.total());
    }
}

pub struct Store {
    conn: SqliteConnection,
    path: PathBuf,
}

impl Store {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let url = path
            .to_str()
            .with_context(|| format!("Database path is not valid UTF-8: {:?}", path))?;
        let mut conn = SqliteConnection::establish(url)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        conn.batch_execute(CREATE_SCHEMA)
            .context("Failed to create schema")?;
        debug!("Opened store at {:?}", path);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts `entry`, replacing any stored entry with the same category and headword.
    pub fn upsert(&mut self, entry: &Entry) -> Result<()> {
        upsert_entry(&mut self.conn, entry)
    }

    /// Upserts every entry in one transaction. Returns the number written.
    pub fn upsert_all(&mut self, entries: &[Entry]) -> Result<u64> {
        let pb = ProgressBar::new_spinner();
        let written = self.conn.transaction::<_, anyhow::Error, _>(|conn| {
            let mut written = 0u64;
            for entry in entries {
                upsert_entry(conn, entry)?;
                written += 1;
                if written % PROGRESS_INTERVAL == 0 {
                    pb.set_message(format!("Stored {} entries", written));
                    pb.tick();
                }
            }
            Ok(written)
        })?;
        pb.finish_and_clear();
        info!(entries = written, "Entries stored");
        Ok(written)
    }

    /// Streams stored entries in fixed-size batches, characters before words.
    pub fn scan(&mut self, category: Option<Category>) -> Scan<'_> {
        let tables = match category {
            None => VecDeque::from([ScanTable::Characters, ScanTable::Words(None)]),
            Some(Category::Character) => VecDeque::from([ScanTable::Characters]),
            Some(c) => VecDeque::from([ScanTable::Words(Some(c))]),
        };
        Scan {
            conn: &mut self.conn,
            tables,
            last_id: 0,
            pending: Vec::new().into_iter(),
            failed: false,
        }
    }

    pub fn lookup(&mut self, category: Category, headword: &str) -> Result<Option<Entry>> {
        match category {
            Category::Character => characters::table
                .filter(characters::headword.eq(headword))
                .select(CharacterRow::as_select())
                .first(&mut self.conn)
                .optional()
                .context("Character lookup failed")?
                .map(CharacterRow::into_entry)
                .transpose(),
            Category::Word | Category::Idiom => words::table
                .filter(words::category.eq(category.as_str()))
                .filter(words::headword.eq(headword))
                .select(WordRow::as_select())
                .first(&mut self.conn)
                .optional()
                .context("Word lookup failed")?
                .map(WordRow::into_entry)
                .transpose(),
        }
    }

    /// Every entry, of any category, stored under `headword`.
    pub fn find_headword(&mut self, headword: &str) -> Result<Vec<Entry>> {
        let mut found = Vec::new();
        if let Some(entry) = self.lookup(Category::Character, headword)? {
            found.push(entry);
        }
        let rows: Vec<WordRow> = words::table
            .filter(words::headword.eq(headword))
            .select(WordRow::as_select())
            .load(&mut self.conn)
            .context("Headword query failed")?;
        for row in rows {
            found.push(row.into_entry()?);
        }
        found.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(found)
    }

    /// Entries with `reading` among their readings.
    pub fn find_by_pinyin(&mut self, reading: &str) -> Result<Vec<Entry>> {
        let pattern = format!("%{}%", serde_json::to_string(reading.trim())?);
        let chars: Vec<CharacterRow> = characters::table
            .filter(characters::pinyin.like(pattern.as_str()))
            .order(characters::id.asc())
            .select(CharacterRow::as_select())
            .load(&mut self.conn)
            .context("Pinyin query failed")?;
        let word_rows: Vec<WordRow> = words::table
            .filter(words::pinyin.like(pattern.as_str()))
            .order(words::id.asc())
            .select(WordRow::as_select())
            .load(&mut self.conn)
            .context("Pinyin query failed")?;

        chars
            .into_iter()
            .map(CharacterRow::into_entry)
            .chain(word_rows.into_iter().map(WordRow::into_entry))
            .collect()
    }

    pub fn find_by_radical(&mut self, radical: &str) -> Result<Vec<Entry>> {
        characters::table
            .filter(characters::radical.eq(radical))
            .order(characters::strokes.asc())
            .then_order_by(characters::id.asc())
            .select(CharacterRow::as_select())
            .load(&mut self.conn)
            .context("Radical query failed")?
            .into_iter()
            .map(CharacterRow::into_entry)
            .collect()
    }

    pub fn summary(&mut self) -> Result<StoreSummary> {
        let mut summary = StoreSummary::default();

        let char_counts: Vec<(String, i64)> = characters::table
            .group_by(characters::tier)
            .select((characters::tier, count_star()))
            .load(&mut self.conn)
            .context("Character summary failed")?;
        for (tier, n) in char_counts {
            summary
                .counts
                .insert((Category::Character, tier.parse()?), n as u64);
        }

        let word_counts: Vec<(String, String, i64)> = words::table
            .group_by((words::category, words::tier))
            .select((words::category, words::tier, count_star()))
            .load(&mut self.conn)
            .context("Word summary failed")?;
        for (category, tier, n) in word_counts {
            summary
                .counts
                .insert((category.parse()?, tier.parse()?), n as u64);
        }

        Ok(summary)
    }

    /// Builds a fresh database beside `path` and renames it into place.
    ///
    /// A store already at `path` is never modified; readers holding it open keep
    /// seeing the previous generation.
    pub fn build(path: &Path, entries: &[Entry], stats: &PipelineStats) -> Result<StoreSummary> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let mut staging = path.as_os_str().to_owned();
        staging.push(".building");
        let staging = PathBuf::from(staging);
        if staging.exists() {
            fs::remove_file(&staging)
                .with_context(|| format!("Failed to remove stale build: {:?}", staging))?;
        }

        let built = (|| -> Result<StoreSummary> {
            let mut store = Store::open(&staging)?;
            let written = store.upsert_all(entries)?;
            stats.add_stored(written);
            store.summary()
        })();

        let summary = match built {
            Ok(summary) => summary,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&staging) {
                    warn!(error = %rm, "Failed to remove partial build {:?}", staging);
                }
                return Err(e);
            }
        };

        fs::rename(&staging, path)
            .with_context(|| format!("Failed to move {:?} into place at {:?}", staging, path))?;
        info!(entries = summary.total(), "Store generation written to {:?}", path);
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy)]
enum ScanTable {
    Characters,
    Words(Option<Category>),
}

/// Batched cursor over stored entries, keyed by row id.
pub struct Scan<'s> {
    conn: &'s mut SqliteConnection,
    tables: VecDeque<ScanTable>,
    last_id: i32,
    pending: std::vec::IntoIter<Entry>,
    failed: bool,
}

impl Scan<'_> {
    fn fetch(&mut self, table: ScanTable) -> Result<Vec<Entry>> {
        match table {
            ScanTable::Characters => {
                let rows: Vec<CharacterRow> = characters::table
                    .filter(characters::id.gt(self.last_id))
                    .order(characters::id.asc())
                    .limit(SCAN_BATCH_SIZE)
                    .select(CharacterRow::as_select())
                    .load(&mut *self.conn)
                    .context("Character scan failed")?;
                if let Some(last) = rows.last() {
                    self.last_id = last.id;
                }
                rows.into_iter().map(CharacterRow::into_entry).collect()
            }
            ScanTable::Words(category) => {
                let mut query = words::table
                    .select(WordRow::as_select())
                    .filter(words::id.gt(self.last_id))
                    .into_boxed();
                if let Some(c) = category {
                    query = query.filter(words::category.eq(c.as_str()));
                }
                let rows: Vec<WordRow> = query
                    .order(words::id.asc())
                    .limit(SCAN_BATCH_SIZE)
                    .load(&mut *self.conn)
                    .context("Word scan failed")?;
                if let Some(last) = rows.last() {
                    self.last_id = last.id;
                }
                rows.into_iter().map(WordRow::into_entry).collect()
            }
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.next() {
                return Some(Ok(entry));
            }
            if self.failed {
                return None;
            }
            let table = *self.tables.front()?;
            match self.fetch(table) {
                Ok(batch) if batch.is_empty() => {
                    self.tables.pop_front();
                    self.last_id = 0;
                }
                Ok(batch) => self.pending = batch.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
