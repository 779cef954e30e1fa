//! hanzi-stardict: Chinese dictionary normalization and StarDict export pipeline
//!
//! This crate turns a directory of heterogeneous JSON collections describing Chinese
//! characters, words and idioms into offline dictionaries for StarDict-compatible readers:
//!
//! 1. **Normalize** -- Read every collection (leniently repairing malformed arrays),
//!    merge primary records by `(category, headword)`, and join cross-reference and
//!    frequency-tier lists against the merged set
//! 2. **Store** -- Write the canonical entries into a SQLite database, built as a fresh
//!    generation and renamed into place
//! 3. **Export** -- Stream entries back out per profile, render each to HTML, and lay out
//!    the `.ifo`/`.idx`/`.dict` triad
//!
//! # Architecture
//!
//! - **Recoverable diagnostics** -- Bad records, unresolved references and render failures
//!   are collected and summarized; only I/O and database failures abort a run
//! - **Parallel rendering** -- rayon sorts and renders; offsets come from one sequential fold
//! - **Atomic output** -- Triads and databases are written to temporaries and renamed
//! - **Atomic operations** -- Lock-free counters for pipeline statistics
//!
//! # Key Modules
//!
//! - [`parser`] -- Lenient JSON loading and raw record shapes
//! - [`normalize`] -- Merge and cross-reference resolution
//! - [`store`] -- SQLite persistence with batched scans
//! - [`render`] -- Entry to HTML fragment
//! - [`export`] -- Ordering, offset layout and triad writing
//! - [`stardict`] -- Triad format: encoding, parsing, lookup and verification
//! - [`models`] -- Core data types (Entry, Category, Tier, attributes)
//! - [`diagnostics`] -- Recoverable problem taxonomy
//! - [`stats`] -- Thread-safe atomic counters
//! - [`config`] -- Constants and the source collection table
//!
//! # Example Usage
//!
//! ```bash
//! # Normalize sources into the database
//! hanzi-stardict build -d data/ -o output/
//!
//! # Export all three dictionaries from the database
//! hanzi-stardict export -o output/
//!
//! # Both at once, restricted to common entries
//! hanzi-stardict run -d data/ -o output/ --max-tier common
//! ```

pub mod config;
pub mod diagnostics;
pub mod export;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod render;
pub mod schema;
pub mod stardict;
pub mod stats;
pub mod store;
