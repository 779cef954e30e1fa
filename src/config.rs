/// Rows fetched per query when scanning the store
pub const SCAN_BATCH_SIZE: i64 = 2048;

/// Progress update interval (tick every N stored entries)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Buffer size for triad writers
pub const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Default database file name inside the output directory
pub const DEFAULT_DB_NAME: &str = "chinese_dictionary.db";

/// StarDict version token written to every `.ifo`
pub const IFO_VERSION: &str = "2.4.2";

/// Content type of every fragment (HTML)
pub const SAME_TYPE_SEQUENCE: &str = "h";

pub const DEFAULT_AUTHOR: &str = "hanzi-stardict";

/// Role a JSON collection plays during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    CharBase,
    CharDetail,
    Word,
    Idiom,
    Polyphone,
    Related,
    CharTier(crate::models::Tier),
    WordTier(crate::models::Tier),
}

impl SourceKind {
    /// Short name used when reporting a reference the collection could not resolve
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::CharBase => "character base",
            SourceKind::CharDetail => "character detail",
            SourceKind::Word => "word list",
            SourceKind::Idiom => "idiom list",
            SourceKind::Polyphone => "polyphone list",
            SourceKind::Related => "related list",
            SourceKind::CharTier(_) => "character tier list",
            SourceKind::WordTier(_) => "word tier list",
        }
    }
}

/// A collection path relative to the data directory
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    pub path: &'static str,
    pub kind: SourceKind,
}

/// Collections in processing order. Primary sources come first so cross-references
/// and tier lists can join against the complete base set.
pub const SOURCES: &[SourceSpec] = &[
    SourceSpec {
        path: "character/char_base.json",
        kind: SourceKind::CharBase,
    },
    SourceSpec {
        path: "character/char_detail.json",
        kind: SourceKind::CharDetail,
    },
    SourceSpec {
        path: "idiom/idiom.json",
        kind: SourceKind::Idiom,
    },
    SourceSpec {
        path: "word/word.json",
        kind: SourceKind::Word,
    },
    SourceSpec {
        path: "character/char_polyphone.json",
        kind: SourceKind::Polyphone,
    },
    SourceSpec {
        path: "character/char_related.json",
        kind: SourceKind::Related,
    },
    SourceSpec {
        path: "character/char_common.json",
        kind: SourceKind::CharTier(crate::models::Tier::MostCommon),
    },
    SourceSpec {
        path: "character/char_standard.json",
        kind: SourceKind::CharTier(crate::models::Tier::Common),
    },
    SourceSpec {
        path: "word/word_common.json",
        kind: SourceKind::WordTier(crate::models::Tier::Common),
    },
];
