//! # Lucy Core
//!
//! The storage and retrieval core of a segment-based inverted index.
//!
//! ## Features
//!
//! - Compact lexicon and posting codecs with skip data
//! - Immutable segments published atomically through snapshot files
//! - Exclusive and shared file locks for concurrent writers and readers
//! - Incremental merging, including merges in the background
//! - Deletions tracked per segment as bit vectors
//! - Boolean, range, term and phrase matchers with TF/IDF scoring
//! - Per-document term vectors for highlighting
pub mod analysis;
pub mod document;
mod error;
pub mod index;
pub mod plan;
pub mod search;
pub mod store;
pub mod util;

// Re-exports for the public API
pub use analysis::Analyzer;
pub use document::{Doc, FieldValue, HitDoc};
pub use error::{IndexError, Result};
pub use index::{BackgroundMerger, IndexManager, IndexManagerConfig, Indexer, IndexerConfig, PolyReader};
pub use plan::{FieldType, Schema};
pub use search::{Hits, IndexSearcher, Query};
pub use store::{Folder, FsFolder, RamFolder};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
