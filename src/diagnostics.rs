use crate::models::Category;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Recoverable problems collected during a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("failed to parse {path:?}: {message}")]
    SourceParse { path: PathBuf, message: String },

    #[error("rejected {category} record {headword:?} from {source_name}: {reason}")]
    Validation {
        source_name: String,
        category: Category,
        headword: String,
        reason: String,
    },

    #[error("unresolved reference {target:?} from {origin:?} in {source_name}")]
    CrossReferenceUnresolved {
        source_name: String,
        origin: String,
        target: String,
    },

    #[error("failed to render {category} entry {headword:?}: {reason}")]
    Render {
        category: Category,
        headword: String,
        reason: String,
    },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::SourceParse { .. } => "source_parse",
            Diagnostic::Validation { .. } => "validation",
            Diagnostic::CrossReferenceUnresolved { .. } => "cross_reference_unresolved",
            Diagnostic::Render { .. } => "render",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!(kind = diagnostic.kind(), "{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn source_parse_errors(&self) -> usize {
        self.count_of("source_parse")
    }

    pub fn validation_errors(&self) -> usize {
        self.count_of("validation")
    }

    pub fn unresolved_references(&self) -> usize {
        self.count_of("cross_reference_unresolved")
    }

    pub fn render_errors(&self) -> usize {
        self.count_of("render")
    }

    fn count_of(&self, kind: &str) -> usize {
        self.items.iter().filter(|d| d.kind() == kind).count()
    }

    /// Prints the end-of-run report.
    pub fn print_summary(&self) {
        println!("Source parse errors:     {}", self.source_parse_errors());
        println!("Rejected records:        {}", self.validation_errors());
        println!("Unresolved references:   {}", self.unresolved_references());
        println!("Render failures:         {}", self.render_errors());
    }
}
