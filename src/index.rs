//! Segment-based index: writers, readers and the commit protocol.

pub mod background_merger;
pub mod data_reader;
pub mod data_writer;
pub mod deletions;
pub mod doc_reader;
pub mod doc_writer;
pub mod file_names;
pub mod file_purger;
pub mod highlight;
pub mod index_manager;
pub mod indexer;
pub mod inverter;
pub mod lexicon;
pub mod poly_reader;
pub mod posting;
pub mod seg_reader;
pub mod seg_writer;
pub mod segment;
pub mod snapshot;
pub mod sort;
pub mod term_info;

pub use background_merger::BackgroundMerger;
pub use data_reader::DataReader;
pub use data_writer::DataWriter;
pub use deletions::{DeletionsReader, DeletionsWriter};
pub use doc_reader::DocReader;
pub use doc_writer::DocWriter;
pub use file_purger::FilePurger;
pub use highlight::{DocVector, HighlightReader, HighlightWriter, TermVector};
pub use index_manager::{IndexManager, IndexManagerConfig};
pub use indexer::{Indexer, IndexerConfig};
pub use inverter::{Inverter, InverterEntry};
pub use lexicon::{LexiconReader, LexiconWriter, PolyLexicon, SegLexicon};
pub use poly_reader::PolyReader;
pub use posting::{PostingListReader, PostingListWriter, SegPostingList};
pub use seg_reader::SegReader;
pub use seg_writer::SegWriter;
pub use segment::Segment;
pub use snapshot::Snapshot;
pub use sort::{SortCache, SortReader, SortWriter};
pub use term_info::TermInfo;
