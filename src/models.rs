use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of headword. Declaration order is the export tie-break precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Character,
    Word,
    Idiom,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Character, Category::Word, Category::Idiom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Character => "character",
            Category::Word => "word",
            Category::Idiom => "idiom",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "character" => Ok(Category::Character),
            "word" => Ok(Category::Word),
            "idiom" => Ok(Category::Idiom),
            other => anyhow::bail!("Unknown category: {}", other),
        }
    }
}

/// Commonality class. Smaller is more specific (more common).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    MostCommon,
    Common,
    Full,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::MostCommon => "most_common",
            Tier::Common => "common",
            Tier::Full => "full",
        }
    }

    /// True if this tier is at least as common as `limit`.
    pub fn within(&self, limit: Tier) -> bool {
        *self <= limit
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "most_common" | "most-common" => Ok(Tier::MostCommon),
            "common" => Ok(Tier::Common),
            "full" => Ok(Tier::Full),
            other => anyhow::bail!("Unknown tier: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKey {
    Strokes,
    Radical,
    Structure,
    Frequency,
    Traditional,
    Variant,
    Explanation,
    Senses,
    Related,
    Synonyms,
    Antonyms,
    SimilarShape,
    Abbreviation,
    Example,
    Source,
    Quote,
    Story,
    Usage,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub book: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gloss {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

/// One reading of a character with its glosses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sense {
    pub pinyin: String,
    #[serde(default)]
    pub glosses: Vec<Gloss>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Count(u32),
    Text(String),
    List(Vec<String>),
    Senses(Vec<Sense>),
    Citation(Citation),
}

/// Attribute map with attribute-level merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<AttrKey, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: AttrKey, value: AttrValue) {
        self.0.insert(key, value);
    }

    pub fn remove(&mut self, key: AttrKey) -> Option<AttrValue> {
        self.0.remove(&key)
    }

    pub fn get(&self, key: AttrKey) -> Option<&AttrValue> {
        self.0.get(&key)
    }

    pub fn text(&self, key: AttrKey) -> Option<&str> {
        match self.0.get(&key) {
            Some(AttrValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn count(&self, key: AttrKey) -> Option<u32> {
        match self.0.get(&key) {
            Some(AttrValue::Count(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn list(&self, key: AttrKey) -> Option<&[String]> {
        match self.0.get(&key) {
            Some(AttrValue::List(v)) => Some(v),
            _ => None,
        }
    }

    pub fn senses(&self, key: AttrKey) -> Option<&[Sense]> {
        match self.0.get(&key) {
            Some(AttrValue::Senses(v)) => Some(v),
            _ => None,
        }
    }

    pub fn citation(&self, key: AttrKey) -> Option<&Citation> {
        match self.0.get(&key) {
            Some(AttrValue::Citation(c)) => Some(c),
            _ => None,
        }
    }

    /// Overwrites every attribute present in `newer`; keeps the rest.
    pub fn merge_from(&mut self, newer: Attributes) {
        self.0.extend(newer.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The canonical unit exported to the dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub headword: String,
    pub category: Category,
    pub pinyin: Vec<String>,
    pub tier: Tier,
    pub attributes: Attributes,
}

pub type EntryKey = (Category, String);

impl Entry {
    pub fn new(category: Category, headword: impl Into<String>) -> Self {
        Self {
            headword: headword.into(),
            category,
            pinyin: Vec::new(),
            tier: Tier::Full,
            attributes: Attributes::new(),
        }
    }

    pub fn with_pinyin<I, S>(mut self, readings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pinyin = readings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attr(mut self, key: AttrKey, value: AttrValue) -> Self {
        self.attributes.set(key, value);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn key(&self) -> EntryKey {
        (self.category, self.headword.clone())
    }
}
