//! Term vectors kept for highlighting.
//!
//! For every document a segment holds one record in `highlight.dat`: the
//! number of highlightable fields, then each field name followed by a
//! length-prefixed term vector buffer. `highlight.ix` holds a big-endian
//! `i64` start offset per doc id, beginning with a placeholder for doc 0 and
//! ending with the end offset of the last record.
//!
//! A term vector buffer starts with the number of distinct terms. Each term
//! is stored as the bytes it shares with its predecessor, the differing
//! suffix, the number of occurrences and then `(position, start_offset,
//! end_offset)` for every occurrence.

pub mod doc_vector;
pub mod reader;
pub mod writer;

pub use doc_vector::{DocVector, TermVector};
pub use reader::HighlightReader;
pub use writer::HighlightWriter;

/// Version written into the segment's "highlight" metadata.
pub const CURRENT_FILE_FORMAT: i32 = 1;

pub(crate) fn ix_file(seg_name: &str) -> String {
    format!("{seg_name}/highlight.ix")
}

pub(crate) fn dat_file(seg_name: &str) -> String {
    format!("{seg_name}/highlight.dat")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::document::Doc;
    use crate::index::{Indexer, IndexerConfig, PolyReader};
    use crate::plan::{FieldType, Schema};
    use crate::store::{Folder, RamFolder};

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .spec_field("body", FieldType::full_text("standard").with_highlightable(true))
            .unwrap();
        schema.spec_field("title", FieldType::full_text("standard")).unwrap();
        schema
    }

    fn index_docs(folder: &Arc<dyn Folder>, bodies: &[&str]) {
        let mut indexer =
            Indexer::open(Some(schema()), folder.clone(), None, IndexerConfig::create()).unwrap();
        for body in bodies {
            indexer
                .add_doc(&Doc::new().with_field("body", *body).with_field("title", "untracked"))
                .unwrap();
        }
        indexer.commit().unwrap();
    }

    #[test]
    fn test_doc_vectors_follow_doc_ids() {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        index_docs(&folder, &["red fish blue fish", "one fish"]);
        let reader = PolyReader::open(folder, None, None).unwrap();

        let doc_vec = reader.fetch_doc_vec(1).unwrap();
        assert_eq!(doc_vec.field_names().collect::<Vec<_>>(), vec!["body"]);
        let fish = doc_vec.term_vector("body", "fish").unwrap().unwrap();
        assert_eq!(fish.positions(), &[1, 3]);
        assert_eq!(fish.start_offsets(), &[4, 14]);
        assert_eq!(fish.end_offsets(), &[8, 18]);
        assert!(doc_vec.term_vector("body", "one").unwrap().is_none());
        assert!(doc_vec.term_vector("title", "untracked").unwrap().is_none());

        let one = reader.fetch_doc_vec(2).unwrap().term_vector("body", "one").unwrap().unwrap();
        assert_eq!(one.positions(), &[0]);
    }

    #[test]
    fn test_merge_drops_deleted_records() {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        index_docs(&folder, &["alpha beta", "gamma"]);
        index_docs(&folder, &["delta epsilon"]);

        let mut indexer = Indexer::open(None, folder.clone(), None, IndexerConfig::default()).unwrap();
        indexer.delete_by_term("body", "alpha").unwrap();
        indexer.optimize();
        indexer.commit().unwrap();

        let reader = PolyReader::open(folder, None, None).unwrap();
        assert_eq!(reader.seg_readers().len(), 1);
        let gamma = reader.fetch_doc_vec(1).unwrap();
        assert!(gamma.term_vector("body", "gamma").unwrap().is_some());
        let delta = reader.fetch_doc_vec(2).unwrap().term_vector("body", "epsilon").unwrap().unwrap();
        assert_eq!(delta.start_offsets(), &[6]);
    }
}
