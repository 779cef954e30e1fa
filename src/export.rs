//! StarDict export engine.
//!
//! Entries are filtered by profile, sorted with [`entry_order`], rendered in parallel,
//! and then laid out by a single sequential fold that assigns every fragment its byte
//! offset in the content file. The three files are written to temporaries and renamed
//! into place only once all of them are complete.

use crate::config::{DEFAULT_AUTHOR, WRITE_BUFFER_SIZE};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::models::{Category, Entry, Tier};
use crate::render::{self, RenderError};
use crate::stardict::{headword_defect, Ifo, IndexRecord, TriadPaths};
use crate::stats::PipelineStats;
use crate::store::Store;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Which entries go into one triad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Characters,
    Words,
    Full,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Characters, Profile::Words, Profile::Full];

    pub fn stem(&self) -> &'static str {
        match self {
            Profile::Characters => "chinese-characters",
            Profile::Words => "chinese-words",
            Profile::Full => "chinese-dictionary",
        }
    }

    pub fn bookname(&self) -> &'static str {
        match self {
            Profile::Characters => "汉语拼音辞典 - 汉字",
            Profile::Words => "汉语拼音辞典 - 词语",
            Profile::Full => "汉语拼音辞典 - 完整版",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Profile::Characters => "收录汉字的拼音、笔画、部首、结构及释义",
            Profile::Words => "收录词语、成语的拼音、解释、出处及例句",
            Profile::Full => "收录汉字、词语、成语的完整信息",
        }
    }

    pub fn categories(&self) -> &'static [Category] {
        match self {
            Profile::Characters => &[Category::Character],
            Profile::Words => &[Category::Word, Category::Idiom],
            Profile::Full => &Category::ALL,
        }
    }

    pub fn includes(&self, category: Category) -> bool {
        self.categories().contains(&category)
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "characters" | "chars" => Ok(Profile::Characters),
            "words" => Ok(Profile::Words),
            "full" | "all" => Ok(Profile::Full),
            other => bail!("Unknown export profile: {}", other),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Keep only entries at least this common
    pub max_tier: Option<Tier>,
    pub author: Option<String>,
    pub website: Option<String>,
    /// Written verbatim; omitted by default so rebuilds stay byte-identical
    pub date: Option<String>,
}

impl ExportOptions {
    pub fn accepts(&self, profile: Profile, entry: &Entry) -> bool {
        profile.includes(entry.category)
            && self.max_tier.is_none_or(|limit| entry.tier.within(limit))
    }
}

/// Export order: byte-wise headword, then category precedence (character < word < idiom).
pub fn entry_order(a: &Entry, b: &Entry) -> Ordering {
    a.headword
        .as_bytes()
        .cmp(b.headword.as_bytes())
        .then_with(|| a.category.cmp(&b.category))
}

/// Index and content bytes produced by the offset fold
#[derive(Debug, Default)]
pub struct Layout {
    pub idx: Vec<u8>,
    pub dict: Vec<u8>,
    pub records: u64,
    pub repeated_headwords: bool,
    pub failures: Diagnostics,
    last_headword: Option<String>,
}

/// Lays out rendered fragments in the given order.
///
/// The accumulator is the content size so far; an entry whose rendering failed, or
/// whose headword cannot be an index word, is skipped before it is assigned an offset,
/// so offsets stay contiguous.
pub fn layout<'a, I>(rendered: I) -> Result<Layout>
where
    I: IntoIterator<Item = (&'a Entry, Result<String, RenderError>)>,
{
    rendered
        .into_iter()
        .try_fold(Layout::default(), |mut acc, (entry, fragment)| -> Result<Layout> {
            let fragment = match (fragment, headword_defect(&entry.headword)) {
                (Ok(f), None) => f,
                (Err(e), _) => {
                    acc.failures.push(Diagnostic::Render {
                        category: entry.category,
                        headword: entry.headword.clone(),
                        reason: e.to_string(),
                    });
                    return Ok(acc);
                }
                (Ok(_), Some(reason)) => {
                    acc.failures.push(Diagnostic::Render {
                        category: entry.category,
                        headword: entry.headword.clone(),
                        reason,
                    });
                    return Ok(acc);
                }
            };

            let offset = u32::try_from(acc.dict.len())
                .context("Content file exceeds the 4 GiB addressable by 32-bit offsets")?;
            let length = u32::try_from(fragment.len())
                .with_context(|| format!("Fragment for {:?} is too large", entry.headword))?;
            offset
                .checked_add(length)
                .context("Content file exceeds the 4 GiB addressable by 32-bit offsets")?;

            if acc.last_headword.as_deref() == Some(entry.headword.as_str()) {
                acc.repeated_headwords = true;
            }
            acc.dict.extend_from_slice(fragment.as_bytes());
            IndexRecord {
                headword: entry.headword.clone(),
                offset,
                length,
            }
            .encode_into(&mut acc.idx);
            acc.records += 1;
            acc.last_headword = Some(entry.headword.clone());
            Ok(acc)
        })
}

/// A complete in-memory triad
#[derive(Debug)]
pub struct Triad {
    pub ifo: Ifo,
    pub idx: Vec<u8>,
    pub dict: Vec<u8>,
}

/// Filters, orders, renders and lays out `entries` for one profile.
pub fn build_triad(
    mut entries: Vec<Entry>,
    profile: Profile,
    options: &ExportOptions,
    stats: &PipelineStats,
) -> Result<(Triad, Diagnostics)> {
    entries.retain(|e| options.accepts(profile, e));
    entries.par_sort_by(entry_order);
    debug!(profile = profile.stem(), entries = entries.len(), "Entries ordered");

    let pb = ProgressBar::new(entries.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{bar:40}] {pos}/{len}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Rendering {}", profile.stem()));

    let fragments: Vec<Result<String, RenderError>> = entries
        .par_iter()
        .map(|entry| {
            let fragment = render::render(entry);
            match &fragment {
                Ok(html) => {
                    stats.inc_rendered();
                    stats.add_content_bytes(html.len() as u64);
                }
                Err(_) => stats.inc_render_failures(),
            }
            pb.inc(1);
            fragment
        })
        .collect();
    pb.finish_and_clear();

    let layout = layout(entries.iter().zip(fragments))?;

    let mut ifo = Ifo::new(profile.bookname(), layout.records, layout.idx.len() as u64);
    ifo.description = Some(profile.description().to_string());
    ifo.author = Some(
        options
            .author
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
    );
    ifo.website = options.website.clone();
    ifo.date = options.date.clone();
    ifo.multientry = layout.repeated_headwords;

    Ok((
        Triad {
            ifo,
            idx: layout.idx,
            dict: layout.dict,
        },
        layout.failures,
    ))
}

/// Temporary files of a triad being written; removed unless committed.
struct PendingTriad {
    temps: Vec<PathBuf>,
    committed: Vec<PathBuf>,
    done: bool,
}

impl PendingTriad {
    fn new() -> Self {
        Self {
            temps: Vec::new(),
            committed: Vec::new(),
            done: false,
        }
    }

    fn write(&mut self, target: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = temp_path(target);
        self.temps.push(tmp.clone());
        let file = File::create(&tmp)
            .with_context(|| format!("Failed to create temp file: {:?}", tmp))?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        writer
            .write_all(bytes)
            .with_context(|| format!("Failed to write: {:?}", tmp))?;
        let file = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush: {:?}", tmp))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync: {:?}", tmp))?;
        Ok(())
    }

    /// Renames temporaries in order; the `.ifo` goes last so readers never see it early.
    fn commit(mut self, targets: &[&Path]) -> Result<()> {
        for (tmp, target) in self.temps.clone().iter().zip(targets) {
            fs::rename(tmp, target)
                .with_context(|| format!("Failed to rename {:?} to {:?}", tmp, target))?;
            self.committed.push(target.to_path_buf());
        }
        self.done = true;
        Ok(())
    }
}

impl Drop for PendingTriad {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        for path in self.temps.iter().chain(self.committed.iter()) {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    warn!(error = %e, path = ?path, "Failed to remove partial output");
                }
            }
        }
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes a triad so that either all three files are replaced or none is.
pub fn write_triad(dir: &Path, stem: &str, triad: &Triad) -> Result<TriadPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    let paths = TriadPaths::new(dir, stem);

    let mut pending = PendingTriad::new();
    pending.write(&paths.dict, &triad.dict)?;
    pending.write(&paths.idx, &triad.idx)?;
    pending.write(&paths.ifo, triad.ifo.to_string().as_bytes())?;

    let written = fs::metadata(temp_path(&paths.idx))
        .with_context(|| format!("Failed to stat index: {:?}", paths.idx))?
        .len();
    if written != triad.ifo.idxfilesize {
        bail!(
            "Index file is {} bytes on disk but ifo declares {}",
            written,
            triad.ifo.idxfilesize
        );
    }

    pending.commit(&[&paths.dict, &paths.idx, &paths.ifo])?;
    Ok(paths)
}

#[derive(Debug)]
pub struct ExportReport {
    pub profile: Profile,
    pub paths: TriadPaths,
    pub records: u64,
    pub idx_bytes: u64,
    pub dict_bytes: u64,
    pub diagnostics: Diagnostics,
}

/// Exports one profile from an in-memory entry set.
pub fn export(
    entries: Vec<Entry>,
    out_dir: &Path,
    profile: Profile,
    options: &ExportOptions,
    stats: &PipelineStats,
) -> Result<ExportReport> {
    let (triad, diagnostics) = build_triad(entries, profile, options, stats)?;
    let paths = write_triad(out_dir, profile.stem(), &triad)
        .with_context(|| format!("Export of {} failed", profile.stem()))?;

    info!(
        profile = profile.stem(),
        records = triad.ifo.wordcount,
        idx_bytes = triad.idx.len(),
        dict_bytes = triad.dict.len(),
        render_failures = diagnostics.len(),
        "Triad written"
    );

    Ok(ExportReport {
        profile,
        paths,
        records: triad.ifo.wordcount,
        idx_bytes: triad.idx.len() as u64,
        dict_bytes: triad.dict.len() as u64,
        diagnostics,
    })
}

/// Reads each profile's categories from the store and exports it.
pub fn export_from_store(
    store: &mut Store,
    out_dir: &Path,
    profiles: &[Profile],
    options: &ExportOptions,
    stats: &PipelineStats,
) -> Result<Vec<ExportReport>> {
    let mut reports = Vec::with_capacity(profiles.len());
    for &profile in profiles {
        let mut entries = Vec::new();
        for &category in profile.categories() {
            for entry in store.scan(Some(category)) {
                entries.push(entry?);
            }
        }
        info!(profile = profile.stem(), entries = entries.len(), "Loaded entries from store");
        reports.push(export(entries, out_dir, profile, options, stats)?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttrKey, AttrValue};
    use crate::stardict::{decode_index, StarDict};
    use tempfile::TempDir;

    fn char_entry(headword: &str, pinyin: &str, strokes: u32) -> Entry {
        Entry::new(Category::Character, headword)
            .with_pinyin([pinyin])
            .with_attr(AttrKey::Strokes, AttrValue::Count(strokes))
    }

    #[test]
    fn order_is_bytewise_then_category() {
        let mut entries = vec![
            Entry::new(Category::Idiom, "一"),
            Entry::new(Category::Word, "人"),
            Entry::new(Category::Word, "一"),
            Entry::new(Category::Character, "一"),
            Entry::new(Category::Word, "A"),
        ];
        entries.sort_by(entry_order);
        let got: Vec<(&str, Category)> = entries
            .iter()
            .map(|e| (e.headword.as_str(), e.category))
            .collect();
        assert_eq!(
            got,
            vec![
                ("A", Category::Word),
                ("一", Category::Character),
                ("一", Category::Word),
                ("一", Category::Idiom),
                ("人", Category::Word),
            ]
        );
    }

    #[test]
    fn profile_parse_and_membership() {
        assert_eq!("words".parse::<Profile>().unwrap(), Profile::Words);
        assert!("nope".parse::<Profile>().is_err());
        assert!(Profile::Words.includes(Category::Idiom));
        assert!(!Profile::Characters.includes(Category::Word));
        assert!(Profile::Full.includes(Category::Character));
    }

    #[test]
    fn yi_before_ren_with_contiguous_ranges() {
        let stats = PipelineStats::new();
        let entries = vec![char_entry("人", "rén", 2), char_entry("一", "yī", 1)];
        let (triad, diags) =
            build_triad(entries.clone(), Profile::Characters, &ExportOptions::default(), &stats)
                .unwrap();
        assert!(diags.is_empty());

        let records = decode_index(&triad.idx).unwrap();
        assert_eq!(records[0].headword, "一");
        assert_eq!(records[1].headword, "人");
        assert_eq!(records[0].offset, 0);
        assert_eq!(records[1].offset, records[0].length);

        let yi = render::render(&entries[1]).unwrap();
        let ren = render::render(&entries[0]).unwrap();
        assert_eq!(records[0].length as usize, yi.len());
        assert_eq!(triad.dict.len(), yi.len() + ren.len());
        assert_eq!(triad.ifo.wordcount, 2);
        assert_eq!(triad.ifo.idxfilesize, triad.idx.len() as u64);
    }

    #[test]
    fn render_failure_in_middle_keeps_offsets_contiguous() {
        let stats = PipelineStats::new();
        let entries = vec![
            char_entry("一", "yī", 1),
            Entry::new(Category::Character, "丁"),
            char_entry("七", "qī", 2),
        ];
        let (triad, diags) =
            build_triad(entries, Profile::Characters, &ExportOptions::default(), &stats).unwrap();
        assert_eq!(diags.render_errors(), 1);
        assert_eq!(stats.render_failures(), 1);

        let records = decode_index(&triad.idx).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].offset, records[0].length);
        assert_eq!(
            triad.dict.len() as u32,
            records[0].length + records[1].length
        );
        assert_eq!(triad.ifo.wordcount, 2);

        let expected = [
            render::render(&char_entry("一", "yī", 1)).unwrap(),
            render::render(&char_entry("七", "qī", 2)).unwrap(),
        ];
        for (record, html) in records.iter().zip(&expected) {
            let start = record.offset as usize;
            let end = start + record.length as usize;
            assert_eq!(&triad.dict[start..end], html.as_bytes());
        }
    }

    #[test]
    fn unindexable_headwords_are_never_encoded() {
        let stats = PipelineStats::new();
        let long = "长".repeat(86);
        assert!(long.len() >= crate::stardict::MAX_HEADWORD_BYTES);
        let entries = vec![
            Entry::new(Category::Word, "a\0b").with_pinyin(["a b"]),
            Entry::new(Category::Word, "c").with_pinyin(["c"]),
            Entry::new(Category::Word, long).with_pinyin(["cháng"]),
        ];
        let (triad, diags) =
            build_triad(entries, Profile::Words, &ExportOptions::default(), &stats).unwrap();
        assert_eq!(diags.render_errors(), 2);

        let records = decode_index(&triad.idx).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].headword, "c");
        assert_eq!(records[0].offset, 0);
        assert_eq!(triad.ifo.wordcount, 1);
        assert_eq!(triad.dict.len() as u32, records[0].length);
    }

    #[test]
    fn profile_and_tier_filters() {
        let stats = PipelineStats::new();
        let entries = vec![
            char_entry("的", "de", 8).with_tier(Tier::MostCommon),
            char_entry("龢", "hé", 22),
            Entry::new(Category::Word, "的确")
                .with_pinyin(["dí què"])
                .with_tier(Tier::Common),
        ];
        let options = ExportOptions {
            max_tier: Some(Tier::Common),
            ..Default::default()
        };
        let (triad, _) = build_triad(entries.clone(), Profile::Full, &options, &stats).unwrap();
        let heads: Vec<String> = decode_index(&triad.idx)
            .unwrap()
            .into_iter()
            .map(|r| r.headword)
            .collect();
        assert_eq!(heads, vec!["的", "的确"]);

        let (triad, _) =
            build_triad(entries, Profile::Words, &ExportOptions::default(), &stats).unwrap();
        assert_eq!(triad.ifo.wordcount, 1);
        assert_eq!(triad.ifo.bookname, Profile::Words.bookname());
    }

    #[test]
    fn repeated_headword_sets_multientry() {
        let stats = PipelineStats::new();
        let entries = vec![
            char_entry("一", "yī", 1),
            Entry::new(Category::Word, "一").with_pinyin(["yī"]),
        ];
        let (triad, _) =
            build_triad(entries, Profile::Full, &ExportOptions::default(), &stats).unwrap();
        assert!(triad.ifo.multientry);
        assert!(triad.ifo.to_string().contains("multientry=true"));
    }

    #[test]
    fn export_is_idempotent_and_verifiable() {
        let dir = TempDir::new().unwrap();
        let stats = PipelineStats::new();
        let entries = vec![
            char_entry("人", "rén", 2),
            char_entry("一", "yī", 1),
            Entry::new(Category::Word, "人口").with_pinyin(["rén kǒu"]),
        ];

        let first = export(
            entries.clone(),
            dir.path(),
            Profile::Full,
            &ExportOptions::default(),
            &stats,
        )
        .unwrap();
        let snapshot: Vec<Vec<u8>> = first
            .paths
            .all()
            .iter()
            .map(|p| fs::read(p).unwrap())
            .collect();

        let mut shuffled = entries;
        shuffled.reverse();
        let second = export(
            shuffled,
            dir.path(),
            Profile::Full,
            &ExportOptions::default(),
            &stats,
        )
        .unwrap();
        for (path, before) in second.paths.all().iter().zip(&snapshot) {
            assert_eq!(&fs::read(path).unwrap(), before);
        }

        let dict = StarDict::open(dir.path(), Profile::Full.stem()).unwrap();
        let report = dict.verify().unwrap();
        assert_eq!(report.records, 3);
        assert_eq!(dict.lookup("人口").len(), 1);
    }

    #[test]
    fn no_temp_files_left_after_export() {
        let dir = TempDir::new().unwrap();
        let stats = PipelineStats::new();
        export(
            vec![char_entry("一", "yī", 1)],
            dir.path(),
            Profile::Characters,
            &ExportOptions::default(),
            &stats,
        )
        .unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_write_leaves_no_triad() {
        let dir = TempDir::new().unwrap();
        let stats = PipelineStats::new();
        // A directory squatting on the .idx target makes the final rename fail.
        let blocked = dir.path().join(format!("{}.idx", Profile::Characters.stem()));
        fs::create_dir_all(blocked.join("occupied")).unwrap();

        let result = export(
            vec![char_entry("一", "yī", 1)],
            dir.path(),
            Profile::Characters,
            &ExportOptions::default(),
            &stats,
        );
        assert!(result.is_err());

        let paths = TriadPaths::new(dir.path(), Profile::Characters.stem());
        assert!(!paths.dict.exists());
        assert!(!paths.ifo.exists());
        assert!(!temp_path(&paths.idx).exists());
        assert!(!temp_path(&paths.dict).exists());
    }
}
