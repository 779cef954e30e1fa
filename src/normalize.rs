//! Turns the raw JSON collections into one canonical entry set.
//!
//! Primary collections (base, detail, word, idiom) create or augment entries keyed by
//! `(category, headword)`. Cross-reference collections (polyphone, related, tier lists)
//! only ever join against entries that already exist; anything they name that is
//! unknown is reported and dropped.

use crate::config::{SourceKind, SourceSpec, SOURCES};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::models::{AttrKey, AttrValue, Category, Entry, EntryKey, Gloss, Sense, Tier};
use crate::parser::{
    self, CharBaseRecord, CharDetailRecord, PolyphoneRecord, RelatedRecord, TierRecord,
    WordRecord,
};
use crate::stardict::headword_defect;
use crate::stats::PipelineStats;
use anyhow::{bail, Result};
use indicatif::ProgressBar;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Result of a normalization pass
pub struct Normalized {
    pub entries: Vec<Entry>,
    pub diagnostics: Diagnostics,
}

/// Reads every known collection under `data_dir` and normalizes it.
///
/// Only a missing data directory is fatal; unreadable collections are reported and skipped.
pub fn normalize_dir(data_dir: &Path, stats: &PipelineStats) -> Result<Normalized> {
    if !data_dir.is_dir() {
        bail!("Data directory does not exist: {:?}", data_dir);
    }

    info!("Normalizing sources from: {:?}", data_dir);
    let pb = ProgressBar::new_spinner();
    let mut normalizer = Normalizer::new(stats);

    for spec in SOURCES {
        let path = data_dir.join(spec.path);
        if !path.exists() {
            info!(source = spec.path, "Collection not present, skipping");
            continue;
        }
        match parser::read_collection(&path) {
            Ok(records) => {
                info!(source = spec.path, records = records.len(), "Loaded collection");
                normalizer.ingest(spec, records);
            }
            Err(e) => normalizer.diagnostics.push(Diagnostic::SourceParse {
                path: path.clone(),
                message: format!("{:#}", e),
            }),
        }
        pb.tick();
    }

    pb.finish_and_clear();
    let normalized = normalizer.finish();
    info!(
        entries = normalized.entries.len(),
        diagnostics = normalized.diagnostics.len(),
        "Normalization complete"
    );
    Ok(normalized)
}

pub struct Normalizer<'a> {
    entries: FxHashMap<EntryKey, Entry>,
    diagnostics: Diagnostics,
    stats: &'a PipelineStats,
}

impl<'a> Normalizer<'a> {
    pub fn new(stats: &'a PipelineStats) -> Self {
        Self {
            entries: FxHashMap::default(),
            diagnostics: Diagnostics::new(),
            stats,
        }
    }

    /// Applies one parsed collection.
    pub fn ingest(&mut self, spec: &SourceSpec, records: Vec<Value>) {
        for value in records {
            self.stats.inc_records();
            match spec.kind {
                SourceKind::CharBase => {
                    let rec = self.decode::<CharBaseRecord>(spec, Category::Character, value);
                    if let Some(rec) = rec {
                        self.merge_primary(spec, char_base_entry(rec));
                    }
                }
                SourceKind::CharDetail => {
                    let rec = self.decode::<CharDetailRecord>(spec, Category::Character, value);
                    if let Some(rec) = rec {
                        self.merge_primary(spec, char_detail_entry(rec));
                    }
                }
                SourceKind::Word | SourceKind::Idiom => {
                    let category = if spec.kind == SourceKind::Idiom {
                        Category::Idiom
                    } else {
                        Category::Word
                    };
                    if let Some(rec) = self.decode::<WordRecord>(spec, category, value) {
                        self.merge_primary(spec, word_entry(rec, category));
                    }
                }
                SourceKind::Polyphone => {
                    let rec = self.decode::<PolyphoneRecord>(spec, Category::Character, value);
                    if let Some(rec) = rec {
                        self.apply_polyphone(spec, rec);
                    }
                }
                SourceKind::Related => {
                    let rec = self.decode::<RelatedRecord>(spec, Category::Character, value);
                    if let Some(rec) = rec {
                        self.apply_related(spec, rec);
                    }
                }
                SourceKind::CharTier(tier) => {
                    let rec = self.decode::<TierRecord>(spec, Category::Character, value);
                    if let Some(rec) = rec {
                        self.apply_tier(spec, Category::Character, rec.headword(), tier);
                    }
                }
                SourceKind::WordTier(tier) => {
                    if let Some(rec) = self.decode::<TierRecord>(spec, Category::Word, value) {
                        self.apply_tier(spec, Category::Word, rec.headword(), tier);
                    }
                }
            }
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(
        &mut self,
        spec: &SourceSpec,
        category: Category,
        value: Value,
    ) -> Option<T> {
        let headword = parser::raw_headword(&value);
        match parser::decode_record(value) {
            Ok(rec) => Some(rec),
            Err(reason) => {
                self.reject(spec, category, headword, reason);
                None
            }
        }
    }

    fn reject(&mut self, spec: &SourceSpec, category: Category, headword: String, reason: String) {
        self.stats.inc_rejected();
        self.diagnostics.push(Diagnostic::Validation {
            source_name: spec.path.to_string(),
            category,
            headword,
            reason,
        });
    }

    /// Attribute-level last-write-wins merge keyed by `(category, headword)`.
    ///
    /// Detail records only extend a character's readings; other primary sources that
    /// supply readings replace them.
    pub fn merge_primary(&mut self, spec: &SourceSpec, mut patch: Entry) {
        patch.headword = patch.headword.trim().to_string();
        if let Some(reason) = key_defect(&patch.headword) {
            self.reject(spec, patch.category, patch.headword, reason);
            return;
        }

        match self.entries.get_mut(&patch.key()) {
            Some(existing) => {
                self.stats.inc_merged();
                debug!(
                    headword = %patch.headword,
                    source = spec.path,
                    "Merging into existing entry"
                );
                if spec.kind == SourceKind::CharDetail {
                    append_readings(&mut existing.pinyin, patch.pinyin);
                } else if !patch.pinyin.is_empty() {
                    existing.pinyin = patch.pinyin;
                }
                existing.tier = existing.tier.min(patch.tier);
                existing.attributes.merge_from(patch.attributes);
            }
            None => {
                self.entries.insert(patch.key(), patch);
            }
        }
    }

    fn known(&self, category: Category, headword: &str) -> bool {
        self.entries.contains_key(&(category, headword.to_string()))
    }

    fn unresolved(&mut self, spec: &SourceSpec, origin: &str, target: &str) {
        self.stats.add_references_dropped(1);
        self.diagnostics.push(Diagnostic::CrossReferenceUnresolved {
            source_name: spec.path.to_string(),
            origin: origin.to_string(),
            target: target.to_string(),
        });
    }

    /// Trimmed key of a cross-reference record, or `None` after rejecting a blank one.
    fn reference_key(
        &mut self,
        spec: &SourceSpec,
        category: Category,
        raw: &str,
    ) -> Option<String> {
        let key = raw.trim();
        if key.is_empty() {
            self.reject(spec, category, String::new(), "empty headword".to_string());
            return None;
        }
        Some(key.to_string())
    }

    fn apply_polyphone(&mut self, spec: &SourceSpec, rec: PolyphoneRecord) {
        let Some(headword) = self.reference_key(spec, Category::Character, &rec.char) else {
            return;
        };
        let readings = rec.pinyin.into_vec();
        match self.entries.get_mut(&(Category::Character, headword.clone())) {
            Some(entry) => append_readings(&mut entry.pinyin, readings),
            None => self.unresolved(spec, spec.kind.label(), &headword),
        }
    }

    fn apply_related(&mut self, spec: &SourceSpec, rec: RelatedRecord) {
        let Some(origin) = self.reference_key(spec, Category::Character, &rec.char) else {
            return;
        };
        if !self.known(Category::Character, &origin) {
            self.unresolved(spec, spec.kind.label(), &origin);
            return;
        }

        let groups = [
            (AttrKey::Related, rec.related),
            (AttrKey::Synonyms, rec.synonyms),
            (AttrKey::Antonyms, rec.antonyms),
            (AttrKey::SimilarShape, rec.similar),
        ];
        let mut resolved = Vec::with_capacity(groups.len());
        for (key, targets) in groups {
            let mut kept = Vec::with_capacity(targets.len());
            for target in targets {
                let target = target.trim().to_string();
                if target.is_empty() {
                    continue;
                }
                if self.known(Category::Character, &target) {
                    if !kept.contains(&target) {
                        kept.push(target);
                    }
                } else {
                    self.unresolved(spec, &origin, &target);
                }
            }
            if !kept.is_empty() {
                resolved.push((key, kept));
            }
        }

        if let Some(entry) = self.entries.get_mut(&(Category::Character, origin)) {
            for (key, kept) in resolved {
                entry.attributes.set(key, AttrValue::List(kept));
            }
        }
    }

    fn apply_tier(&mut self, spec: &SourceSpec, category: Category, raw: &str, tier: Tier) {
        let Some(headword) = self.reference_key(spec, category, raw) else {
            return;
        };
        match self.entries.get_mut(&(category, headword.clone())) {
            Some(entry) => entry.tier = entry.tier.min(tier),
            None => self.unresolved(spec, spec.kind.label(), &headword),
        }
    }

    /// Drops entries that still lack readings and returns the canonical set.
    pub fn finish(mut self) -> Normalized {
        let mut entries = Vec::with_capacity(self.entries.len());
        for (_, entry) in self.entries.drain() {
            if entry.pinyin.is_empty() {
                self.stats.inc_excluded();
                self.diagnostics.push(Diagnostic::Validation {
                    source_name: "normalizer".to_string(),
                    category: entry.category,
                    headword: entry.headword,
                    reason: "no pinyin after cross-reference completion".to_string(),
                });
                continue;
            }
            entries.push(entry);
        }

        Normalized {
            entries,
            diagnostics: self.diagnostics,
        }
    }
}

/// Why `headword` cannot key an entry, if it cannot.
fn key_defect(headword: &str) -> Option<String> {
    if headword.is_empty() {
        return Some("empty headword".to_string());
    }
    headword_defect(headword)
}

/// Appends readings not already present, keeping existing order.
fn append_readings(existing: &mut Vec<String>, readings: Vec<String>) {
    for reading in readings {
        if !existing.contains(&reading) {
            existing.push(reading);
        }
    }
}

fn set_text(entry: &mut Entry, key: AttrKey, value: Option<String>) {
    if let Some(v) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        entry.attributes.set(key, AttrValue::Text(v));
    }
}

fn set_list(entry: &mut Entry, key: AttrKey, value: Option<Vec<String>>) {
    let items: Vec<String> = value
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !items.is_empty() {
        entry.attributes.set(key, AttrValue::List(items));
    }
}

fn char_base_entry(rec: CharBaseRecord) -> Entry {
    let mut entry = Entry::new(Category::Character, rec.char).with_pinyin(rec.pinyin.into_vec());
    if let Some(strokes) = rec.strokes.filter(|n| *n > 0) {
        entry.attributes.set(AttrKey::Strokes, AttrValue::Count(strokes));
    }
    if let Some(frequency) = rec.frequency {
        entry.attributes.set(AttrKey::Frequency, AttrValue::Count(frequency));
    }
    set_text(&mut entry, AttrKey::Radical, rec.radicals);
    set_text(&mut entry, AttrKey::Structure, rec.structure);
    set_text(&mut entry, AttrKey::Traditional, rec.traditional);
    set_text(&mut entry, AttrKey::Variant, rec.variant);
    set_text(&mut entry, AttrKey::Explanation, rec.explanation);
    entry
}

fn char_detail_entry(rec: CharDetailRecord) -> Entry {
    let senses: Vec<Sense> = rec
        .pronunciations
        .into_iter()
        .map(|p| Sense {
            pinyin: p.pinyin.trim().to_string(),
            glosses: p
                .explanations
                .into_iter()
                .filter(|e| !e.content.trim().is_empty())
                .map(|e| Gloss {
                    content: e.content.trim().to_string(),
                    example: e.example.filter(|x| !x.trim().is_empty()),
                    citations: e.detail,
                })
                .collect(),
        })
        .collect();

    let readings: Vec<String> = senses
        .iter()
        .map(|s| s.pinyin.clone())
        .filter(|p| !p.is_empty())
        .collect();

    let mut entry = Entry::new(Category::Character, rec.char).with_pinyin(readings);
    if !senses.is_empty() {
        entry.attributes.set(AttrKey::Senses, AttrValue::Senses(senses));
    }
    entry
}

fn word_entry(rec: WordRecord, category: Category) -> Entry {
    let readings: Vec<String> = rec
        .pinyin
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .into_iter()
        .collect();

    let mut entry = Entry::new(category, rec.word).with_pinyin(readings);
    set_text(&mut entry, AttrKey::Abbreviation, rec.abbr);
    set_text(&mut entry, AttrKey::Explanation, rec.explanation);
    set_text(&mut entry, AttrKey::Example, rec.example);
    set_text(&mut entry, AttrKey::Usage, rec.usage);
    set_text(&mut entry, AttrKey::Notice, rec.notice);
    set_list(&mut entry, AttrKey::Story, rec.story);
    set_list(&mut entry, AttrKey::Synonyms, rec.similar);
    set_list(&mut entry, AttrKey::Antonyms, rec.opposite);
    if let Some(source) = rec.source.filter(|c| !c.text.is_empty() || !c.book.is_empty()) {
        entry.attributes.set(AttrKey::Source, AttrValue::Citation(source));
    }
    if let Some(quote) = rec.quote.filter(|c| !c.text.is_empty() || !c.book.is_empty()) {
        entry.attributes.set(AttrKey::Quote, AttrValue::Citation(quote));
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(kind: SourceKind) -> SourceSpec {
        *SOURCES.iter().find(|s| s.kind == kind).unwrap()
    }

    fn find<'e>(entries: &'e [Entry], category: Category, headword: &str) -> Option<&'e Entry> {
        entries
            .iter()
            .find(|e| e.category == category && e.headword == headword)
    }

    #[test]
    fn base_and_detail_merge_by_attribute() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::CharBase),
            vec![json!({
                "char": "一",
                "pinyin": ["yī"],
                "strokes": 1,
                "radicals": "一",
                "structure": "单一结构"
            })],
        );
        n.ingest(
            &spec(SourceKind::CharDetail),
            vec![json!({"char": "一", "pronunciations": [
                {"pinyin": "yī", "explanations": [{"content": "数目", "example": "一个"}]}
            ]})],
        );
        let out = n.finish();

        let e = find(&out.entries, Category::Character, "一").unwrap();
        assert_eq!(e.attributes.count(AttrKey::Strokes), Some(1));
        assert_eq!(e.attributes.text(AttrKey::Radical), Some("一"));
        assert_eq!(e.attributes.senses(AttrKey::Senses).unwrap()[0].glosses.len(), 1);
        assert_eq!(e.pinyin, vec!["yī"]);
        assert_eq!(stats.merged(), 1);
    }

    #[test]
    fn later_source_overwrites_only_supplied_attributes() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::Word),
            vec![
                json!({
                    "word": "中国",
                    "pinyin": "zhōng guó",
                    "abbr": "zg",
                    "explanation": "旧"
                }),
                json!({"word": "中国", "explanation": "新"}),
            ],
        );
        let out = n.finish();
        let e = find(&out.entries, Category::Word, "中国").unwrap();
        assert_eq!(e.attributes.text(AttrKey::Explanation), Some("新"));
        assert_eq!(e.attributes.text(AttrKey::Abbreviation), Some("zg"));
        assert_eq!(e.pinyin, vec!["zhōng guó"]);
    }

    #[test]
    fn empty_headword_rejected_with_reason() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::CharBase),
            vec![json!({"char": "  ", "pinyin": ["a"]}), json!({"strokes": 2})],
        );
        let out = n.finish();
        assert!(out.entries.is_empty());
        assert_eq!(out.diagnostics.validation_errors(), 2);
        assert_eq!(stats.rejected(), 2);
    }

    #[test]
    fn polyphone_completes_missing_pinyin() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::CharBase),
            vec![
                json!({"char": "中", "strokes": 4}),
                json!({"char": "乐", "pinyin": ["lè"]}),
            ],
        );
        n.ingest(
            &spec(SourceKind::Polyphone),
            vec![
                json!({"char": "中", "pinyin": "zhōng, zhòng"}),
                json!({"char": "乐", "pinyin": ["lè", "yuè"]}),
                json!({"char": "丅", "pinyin": ["xià"]}),
            ],
        );
        let out = n.finish();
        assert_eq!(
            find(&out.entries, Category::Character, "中").unwrap().pinyin,
            vec!["zhōng", "zhòng"]
        );
        assert_eq!(
            find(&out.entries, Category::Character, "乐").unwrap().pinyin,
            vec!["lè", "yuè"]
        );
        assert_eq!(out.diagnostics.unresolved_references(), 1);
        assert!(find(&out.entries, Category::Character, "丅").is_none());
    }

    #[test]
    fn detail_extends_base_readings() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::CharBase),
            vec![json!({"char": "中", "pinyin": ["zhōng", "zhòng"]})],
        );
        n.ingest(
            &spec(SourceKind::CharDetail),
            vec![json!({"char": "中", "pronunciations": [
                {"pinyin": "zhōng", "explanations": [{"content": "中心"}]}
            ]})],
        );
        let out = n.finish();
        let e = find(&out.entries, Category::Character, "中").unwrap();
        assert_eq!(e.pinyin, vec!["zhōng", "zhòng"]);
        assert!(e.attributes.senses(AttrKey::Senses).is_some());
    }

    #[test]
    fn headwords_unfit_for_the_index_are_rejected() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::Word),
            vec![
                json!({"word": "a\0b", "pinyin": "a b"}),
                json!({"word": "c", "pinyin": "c"}),
                json!({"word": "长".repeat(86), "pinyin": "cháng"}),
            ],
        );
        let out = n.finish();
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].headword, "c");
        assert_eq!(out.diagnostics.validation_errors(), 2);
        assert_eq!(stats.rejected(), 2);
    }

    #[test]
    fn unresolved_list_records_name_the_list() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::Polyphone),
            vec![json!({"char": "丅", "pinyin": ["xià"]}), json!({"char": " ", "pinyin": ["a"]})],
        );
        n.ingest(&spec(SourceKind::CharTier(Tier::Common)), vec![json!("丄")]);
        let out = n.finish();

        let unresolved: Vec<(&str, &str)> = out
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::CrossReferenceUnresolved { origin, target, .. } => {
                    Some((origin.as_str(), target.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            unresolved,
            vec![("polyphone list", "丅"), ("character tier list", "丄")]
        );
        assert_eq!(out.diagnostics.validation_errors(), 1);
        assert_eq!(stats.rejected(), 1);
    }

    #[test]
    fn entry_without_pinyin_is_excluded() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(&spec(SourceKind::CharBase), vec![json!({"char": "丂", "strokes": 2})]);
        let out = n.finish();
        assert!(out.entries.is_empty());
        assert_eq!(out.diagnostics.validation_errors(), 1);
        assert_eq!(stats.excluded(), 1);
    }

    #[test]
    fn related_drops_unknown_targets_keeps_entry() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::CharBase),
            vec![
                json!({"char": "大", "pinyin": ["dà"]}),
                json!({"char": "小", "pinyin": ["xiǎo"]}),
                json!({"char": "太", "pinyin": ["tài"]}),
            ],
        );
        n.ingest(
            &spec(SourceKind::Related),
            vec![
                json!({"char": "大", "antonyms": ["小"], "similar": ["太", "犬"]}),
                json!({"char": "龘", "related": ["大"]}),
            ],
        );
        let out = n.finish();
        let e = find(&out.entries, Category::Character, "大").unwrap();
        assert_eq!(e.attributes.list(AttrKey::Antonyms).unwrap(), ["小"]);
        assert_eq!(e.attributes.list(AttrKey::SimilarShape).unwrap(), ["太"]);
        assert!(e.attributes.list(AttrKey::Related).is_none());
        assert_eq!(out.diagnostics.unresolved_references(), 2);
        assert_eq!(stats.references_dropped(), 2);
    }

    #[test]
    fn most_specific_tier_wins() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::CharBase),
            vec![
                json!({"char": "的", "pinyin": ["de"]}),
                json!({"char": "龢", "pinyin": ["hé"]}),
                json!({"char": "丙", "pinyin": ["bǐng"]}),
            ],
        );
        n.ingest(&spec(SourceKind::CharTier(Tier::MostCommon)), vec![json!("的")]);
        n.ingest(
            &spec(SourceKind::CharTier(Tier::Common)),
            vec![json!({"char": "的"}), json!({"char": "丙"}), json!("不存在")],
        );
        let out = n.finish();
        assert_eq!(find(&out.entries, Category::Character, "的").unwrap().tier, Tier::MostCommon);
        assert_eq!(find(&out.entries, Category::Character, "丙").unwrap().tier, Tier::Common);
        assert_eq!(find(&out.entries, Category::Character, "龢").unwrap().tier, Tier::Full);
        assert_eq!(out.diagnostics.unresolved_references(), 1);
    }

    #[test]
    fn word_and_idiom_are_distinct_keys() {
        let stats = PipelineStats::new();
        let mut n = Normalizer::new(&stats);
        n.ingest(
            &spec(SourceKind::Idiom),
            vec![json!({"word": "一心一意", "pinyin": "yī xīn yī yì", "abbr": "yxyy",
                        "story": ["故事"], "similar": ["全心全意"]})],
        );
        n.ingest(
            &spec(SourceKind::Word),
            vec![json!({"word": "一心一意", "pinyin": "yī xīn yī yì"})],
        );
        let out = n.finish();
        assert_eq!(out.entries.len(), 2);
        let idiom = find(&out.entries, Category::Idiom, "一心一意").unwrap();
        assert_eq!(idiom.attributes.list(AttrKey::Story).unwrap(), ["故事"]);
        assert_eq!(idiom.attributes.list(AttrKey::Synonyms).unwrap(), ["全心全意"]);
    }

    #[test]
    fn normalize_dir_skips_malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let chars = dir.path().join("character");
        std::fs::create_dir_all(&chars).unwrap();
        std::fs::write(
            chars.join("char_base.json"),
            r#"[{"char": "人", "pinyin": ["rén"], "strokes": 2}]"#,
        )
        .unwrap();
        std::fs::write(chars.join("char_detail.json"), "[{\"char\": ").unwrap();

        let stats = PipelineStats::new();
        let out = normalize_dir(dir.path(), &stats).unwrap();
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.diagnostics.source_parse_errors(), 1);
    }

    #[test]
    fn normalize_dir_requires_directory() {
        let stats = PipelineStats::new();
        assert!(normalize_dir(Path::new("/nonexistent/data/dir"), &stats).is_err());
    }
}
