//! Per-document values of sortable fields.
//!
//! For every sortable field `n` a segment holds:
//!
//! * `sort-<n>.ord`: one big-endian `i32` ordinal per doc id, starting with
//!   doc 0. Ordinal 0 means the document has no value; values are numbered
//!   from 1 in ascending order.
//! * `sort-<n>.ix`: a big-endian `i64` offset into `.dat` per ordinal,
//!   followed by the end offset of the last value.
//! * `sort-<n>.dat`: the unique values, in order.

pub mod cache;
pub mod reader;
pub mod writer;

pub use cache::SortCache;
pub use reader::SortReader;
pub use writer::SortWriter;

/// Version written into the segment's "sort" metadata.
pub const CURRENT_FILE_FORMAT: i32 = 3;

pub(crate) fn ord_file(seg_name: &str, field_num: i32) -> String {
    format!("{seg_name}/sort-{field_num}.ord")
}

pub(crate) fn ix_file(seg_name: &str, field_num: i32) -> String {
    format!("{seg_name}/sort-{field_num}.ix")
}

pub(crate) fn dat_file(seg_name: &str, field_num: i32) -> String {
    format!("{seg_name}/sort-{field_num}.dat")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::{Doc, FieldValue};
    use crate::error::Result;
    use crate::index::inverter::Inverter;
    use crate::index::data_writer::DataWriter;
    use crate::index::segment::Segment;
    use crate::plan::{FieldType, Schema};
    use crate::store::{Folder, RamFolder};

    fn schema() -> Arc<Schema> {
        let mut schema = Schema::new();
        schema
            .spec_field("name", FieldType::string().with_sortable(true))
            .unwrap();
        schema
            .spec_field("rank", FieldType::int32().with_sortable(true))
            .unwrap();
        Arc::new(schema)
    }

    #[test]
    fn test_write_and_read_caches() -> Result<()> {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        let schema = schema();
        let mut segment = Segment::new(1);
        folder.mkdir(segment.name())?;

        let docs = [
            Doc::new().with_field("name", "pear").with_field("rank", 3i32),
            Doc::new().with_field("rank", 1i32),
            Doc::new().with_field("name", "apple").with_field("rank", 3i32),
            Doc::new().with_field("name", "fig"),
        ];
        let mut writer = SortWriter::new(folder.clone(), schema.clone(), segment.name());
        let mut inverter = Inverter::new(schema.clone());
        for doc in &docs {
            let doc_id = segment.increment_count(1) as i32;
            inverter.invert_doc(doc, &mut segment)?;
            writer.add_inverted_doc(&inverter, doc_id)?;
        }
        writer.finish(&mut segment)?;

        let reader = SortReader::open(folder.as_ref(), &schema, &segment)?;
        let names = reader.fetch_sort_cache("name").expect("name cache");
        assert_eq!(names.cardinality(), 3);
        assert_eq!(names.value(names.ordinal(1)), Some(&FieldValue::from("pear")));
        assert_eq!(names.ordinal(2), 0, "missing values have ordinal 0");
        assert_eq!(names.ordinal(3), 1);
        assert_eq!(names.find(&FieldValue::from("banana")), 1);
        assert_eq!(names.find(&FieldValue::from("aardvark")), 0);
        assert_eq!(names.find(&FieldValue::from("zucchini")), 3);

        let ranks = reader.fetch_sort_cache("rank").expect("rank cache");
        assert_eq!(ranks.cardinality(), 2);
        assert_eq!(ranks.ordinal(1), ranks.ordinal(3));
        assert!(ranks.ordinal(2) < ranks.ordinal(1));
        assert_eq!(ranks.ordinal(4), 0);
        assert_eq!(ranks.ordinal(99), 0, "out of range doc ids have no value");
        Ok(())
    }

    #[test]
    fn test_no_sortable_values() -> Result<()> {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        let schema = schema();
        let mut segment = Segment::new(2);
        folder.mkdir(segment.name())?;
        let mut writer = SortWriter::new(folder.clone(), schema.clone(), segment.name());
        writer.finish(&mut segment)?;
        let reader = SortReader::open(folder.as_ref(), &schema, &segment)?;
        assert!(reader.fetch_sort_cache("name").is_none());
        Ok(())
    }
}
