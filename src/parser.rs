use crate::models::Citation;
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

static READING_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[,，、;；]\s*").unwrap());

/// Reads a JSON collection into raw records, repairing common truncation damage first.
pub fn read_collection(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read collection: {:?}", path))?;
    let repaired = repair_json_array(&content);
    let value: Value = serde_json::from_str(&repaired)
        .with_context(|| format!("Invalid JSON in collection: {:?}", path))?;
    match value {
        Value::Array(records) => Ok(records),
        other => bail!(
            "Collection {:?} is not an array (found {})",
            path,
            json_type_name(&other)
        ),
    }
}

/// Adds a missing opening `[`, strips a trailing comma and closes an unterminated array.
pub fn repair_json_array(content: &str) -> Cow<'_, str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Cow::Borrowed("[]");
    }
    let opens = trimmed.starts_with('[');
    let closes = trimmed.ends_with(']');
    if opens && closes {
        return Cow::Borrowed(trimmed);
    }

    let mut repaired = String::with_capacity(trimmed.len() + 2);
    if !opens {
        repaired.push('[');
    }
    if closes {
        repaired.push_str(trimmed);
    } else {
        repaired.push_str(trimmed.trim_end_matches(|c: char| c == ',' || c.is_whitespace()));
        repaired.push(']');
    }
    Cow::Owned(repaired)
}

/// Deserializes one raw record, describing the failure in terms of the record.
pub fn decode_record<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Best-effort headword of a raw record, for diagnostics on records that failed to decode.
pub fn raw_headword(value: &Value) -> String {
    ["char", "word", "headword"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Readings given either as a list or as one separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Readings {
    Many(Vec<String>),
    One(String),
}

impl Default for Readings {
    fn default() -> Self {
        Readings::Many(Vec::new())
    }
}

impl Readings {
    pub fn into_vec(self) -> Vec<String> {
        let raw = match self {
            Readings::Many(v) => v,
            Readings::One(s) => READING_SEPARATOR.split(&s).map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct CharBaseRecord {
    #[serde(alias = "headword")]
    pub char: String,
    #[serde(default)]
    pub pinyin: Readings,
    pub strokes: Option<u32>,
    #[serde(alias = "radical")]
    pub radicals: Option<String>,
    pub frequency: Option<u32>,
    pub structure: Option<String>,
    pub traditional: Option<String>,
    pub variant: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawExplanation {
    pub content: String,
    pub example: Option<String>,
    #[serde(default)]
    pub detail: Vec<Citation>,
}

#[derive(Debug, Deserialize)]
pub struct RawPronunciation {
    #[serde(default)]
    pub pinyin: String,
    #[serde(default)]
    pub explanations: Vec<RawExplanation>,
}

#[derive(Debug, Deserialize)]
pub struct CharDetailRecord {
    #[serde(alias = "headword")]
    pub char: String,
    #[serde(default)]
    pub pronunciations: Vec<RawPronunciation>,
}

#[derive(Debug, Deserialize)]
pub struct PolyphoneRecord {
    #[serde(alias = "headword")]
    pub char: String,
    pub pinyin: Readings,
}

#[derive(Debug, Deserialize)]
pub struct RelatedRecord {
    #[serde(alias = "headword")]
    pub char: String,
    #[serde(default)]
    pub related: Vec<String>,
    #[serde(default, alias = "synonym")]
    pub synonyms: Vec<String>,
    #[serde(default, alias = "antonym")]
    pub antonyms: Vec<String>,
    #[serde(default, alias = "similar_shape")]
    pub similar: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct WordRecord {
    #[serde(alias = "headword")]
    pub word: String,
    pub pinyin: Option<String>,
    pub abbr: Option<String>,
    pub explanation: Option<String>,
    pub source: Option<Citation>,
    pub quote: Option<Citation>,
    pub story: Option<Vec<String>>,
    pub similar: Option<Vec<String>>,
    pub opposite: Option<Vec<String>>,
    pub example: Option<String>,
    pub usage: Option<String>,
    pub notice: Option<String>,
}

/// Tier list member, either a bare headword or an object naming one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TierRecord {
    Bare(String),
    Keyed {
        #[serde(alias = "word", alias = "headword")]
        char: String,
    },
}

impl TierRecord {
    pub fn headword(&self) -> &str {
        match self {
            TierRecord::Bare(h) => h,
            TierRecord::Keyed { char } => char,
        }
    }
}
