//! Writes one new segment by fanning documents and merged segments out to
//! the per-component writers.

use std::sync::Arc;

use crate::document::Doc;
use crate::error::{IndexError, Result};
use crate::index::data_writer::DataWriter;
use crate::index::deletions::DeletionsWriter;
use crate::index::doc_writer::DocWriter;
use crate::index::highlight::HighlightWriter;
use crate::index::inverter::Inverter;
use crate::index::poly_reader::PolyReader;
use crate::index::posting::PostingListWriter;
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;
use crate::index::snapshot::Snapshot;
use crate::index::sort::SortWriter;
use crate::plan::Schema;
use crate::store::Folder;

#[derive(Debug)]
pub struct SegWriter {
    folder: Arc<dyn Folder>,
    schema: Arc<Schema>,
    snapshot: Snapshot,
    segment: Segment,
    polyreader: Arc<PolyReader>,
    inverter: Inverter,
    writers: Vec<Box<dyn DataWriter>>,
    del_writer: DeletionsWriter,
}

impl SegWriter {
    /// Set up the standard component writers for `segment`. Deletions are
    /// recorded against the segments of `polyreader`.
    pub fn new(
        folder: Arc<dyn Folder>,
        schema: Arc<Schema>,
        snapshot: Snapshot,
        segment: Segment,
        polyreader: Arc<PolyReader>,
    ) -> Self {
        let seg_name = segment.name().to_string();
        let del_writer = DeletionsWriter::new(folder.clone(), polyreader.clone(), seg_name.clone());
        let writers: Vec<Box<dyn DataWriter>> = vec![
            Box::new(PostingListWriter::new(folder.clone(), schema.clone(), seg_name.clone())),
            Box::new(SortWriter::new(folder.clone(), schema.clone(), seg_name.clone())),
            Box::new(DocWriter::new(folder.clone(), seg_name.clone())),
            Box::new(HighlightWriter::new(folder.clone(), seg_name)),
        ];
        SegWriter {
            inverter: Inverter::new(schema.clone()),
            folder,
            schema,
            snapshot,
            segment,
            polyreader,
            writers,
            del_writer,
        }
    }

    /// Add another component writer. Each API name may be registered once.
    pub fn register(&mut self, writer: Box<dyn DataWriter>) -> Result<()> {
        let api = writer.api();
        if self.fetch(api).is_some() {
            return Err(IndexError::contract(format!("API {api} already registered")));
        }
        self.writers.push(writer);
        Ok(())
    }

    pub fn fetch(&self, api: &str) -> Option<&dyn DataWriter> {
        self.writers
            .iter()
            .find(|writer| writer.api() == api)
            .map(|writer| writer.as_ref())
    }

    pub fn folder(&self) -> &Arc<dyn Folder> {
        &self.folder
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Switch to a schema which has absorbed new fields. Documents added
    /// afterwards are inverted against it.
    pub fn set_schema(&mut self, schema: Arc<Schema>) {
        self.inverter = Inverter::new(schema.clone());
        self.schema = schema;
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn segment_mut(&mut self) -> &mut Segment {
        &mut self.segment
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut Snapshot {
        &mut self.snapshot
    }

    /// Hand back the snapshot, with this segment added if it was finished.
    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    pub fn polyreader(&self) -> &Arc<PolyReader> {
        &self.polyreader
    }

    pub fn del_writer(&self) -> &DeletionsWriter {
        &self.del_writer
    }

    pub fn del_writer_mut(&mut self) -> &mut DeletionsWriter {
        &mut self.del_writer
    }

    /// Create an empty directory for the segment, removing whatever a
    /// crashed session may have left under the same name.
    pub fn prep_seg_dir(&self) -> Result<()> {
        let seg_name = self.segment.name();
        if self.folder.exists(seg_name) && !self.folder.delete_tree(seg_name)? {
            return Err(IndexError::internal(format!(
                "Couldn't completely remove '{seg_name}'"
            )));
        }
        self.folder.mkdir(seg_name)
    }

    /// Add a document and return its segment-local id.
    pub fn add_doc(&mut self, doc: &Doc) -> Result<i32> {
        let doc_id = self.segment.increment_count(1) as i32;
        self.inverter.invert_doc(doc, &mut self.segment)?;
        for writer in self.writers.iter_mut() {
            writer.add_inverted_doc(&self.inverter, doc_id)?;
        }
        Ok(doc_id)
    }

    /// Copy the live documents of a segment from another index.
    pub fn add_segment(&mut self, reader: &SegReader, doc_map: &[i32]) -> Result<()> {
        for writer in self.writers.iter_mut() {
            writer.add_segment(reader, doc_map)?;
        }
        self.adjust_doc_id(reader, doc_map);
        Ok(())
    }

    /// Absorb a segment of this index, which is dropped from the snapshot.
    pub fn merge_segment(&mut self, reader: &SegReader, doc_map: &[i32]) -> Result<()> {
        for writer in self.writers.iter_mut() {
            writer.merge_segment(reader, doc_map)?;
        }
        self.del_writer.merge_segment(reader)?;
        self.snapshot.delete_entry(reader.seg_name());
        self.adjust_doc_id(reader, doc_map);
        Ok(())
    }

    /// Drop a segment without copying anything from it.
    pub fn delete_segment(&mut self, reader: &SegReader) -> Result<()> {
        for writer in self.writers.iter_mut() {
            writer.delete_segment(reader)?;
        }
        self.snapshot.delete_entry(reader.seg_name());
        Ok(())
    }

    /// Advance the document count past the entries of `doc_map` that
    /// survived. The count is derived from the map rather than from the
    /// reader, whose deletions may be older than the writer's.
    fn adjust_doc_id(&mut self, reader: &SegReader, doc_map: &[i32]) {
        let dropped = doc_map.iter().skip(1).filter(|&&new_id| new_id == 0).count() as i64;
        self.segment.increment_count(reader.doc_max() as i64 - dropped);
    }

    /// Write out pending deletions into this segment's directory.
    pub fn finish_deletions(&mut self) -> Result<()> {
        self.del_writer.finish(&mut self.segment)
    }

    /// Finish every component, write the segment metadata, add the segment
    /// to the snapshot and consolidate its files.
    pub fn finish(&mut self) -> Result<()> {
        for writer in self.writers.iter_mut() {
            writer.finish(&mut self.segment)?;
        }
        self.segment.write_file(self.folder.as_ref())?;
        let seg_name = self.segment.name().to_string();
        self.snapshot.add_entry(seg_name.as_str());
        self.folder.consolidate(&seg_name)?;
        log::debug!("Finished {seg_name} with {} docs", self.segment.count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::data_writer::generate_doc_map;
    use crate::plan::FieldType;
    use crate::store::RamFolder;

    fn schema() -> Arc<Schema> {
        let mut schema = Schema::new();
        schema.spec_field("title", FieldType::full_text("standard")).unwrap();
        Arc::new(schema)
    }

    fn write_segment(folder: &Arc<dyn Folder>, number: u64, titles: &[&str]) -> Snapshot {
        let schema = schema();
        let polyreader = Arc::new(PolyReader::empty(folder.clone(), schema.clone()));
        let mut segment = Segment::new(number);
        for field in schema.all_fields() {
            segment.add_field(field);
        }
        let mut seg_writer =
            SegWriter::new(folder.clone(), schema.clone(), Snapshot::new(), segment, polyreader);
        seg_writer.prep_seg_dir().unwrap();
        for (i, title) in titles.iter().enumerate() {
            let doc_id = seg_writer.add_doc(&Doc::new().with_field("title", *title)).unwrap();
            assert_eq!(doc_id, i as i32 + 1);
        }
        seg_writer.finish().unwrap();
        let mut snapshot = seg_writer.into_snapshot();
        schema.write(folder.as_ref(), "schema_1.json").unwrap();
        snapshot.add_entry("schema_1.json");
        snapshot.write_file(folder.as_ref(), None).unwrap();
        snapshot
    }

    #[test]
    fn test_add_docs_and_finish() {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        let snapshot = write_segment(&folder, 1, &["foo", "bar", "foo bar"]);
        assert!(snapshot.contains("seg_1"));
        assert!(folder.exists("seg_1/cfmeta.json"));

        let reader = PolyReader::open(folder, None, None).unwrap();
        assert_eq!(reader.doc_max(), 3);
        assert_eq!(reader.doc_freq("title", "foo").unwrap(), 2);
    }

    #[test]
    fn test_register_rejects_duplicate_api() {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        let schema = schema();
        let polyreader = Arc::new(PolyReader::empty(folder.clone(), schema.clone()));
        let mut seg_writer =
            SegWriter::new(folder.clone(), schema, Snapshot::new(), Segment::new(1), polyreader);
        assert!(seg_writer.fetch(DocWriter::API).is_some());
        let err = seg_writer
            .register(Box::new(DocWriter::new(folder, "seg_1")))
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_add_segment_counts_live_docs() {
        let source: Arc<dyn Folder> = Arc::new(RamFolder::new());
        write_segment(&source, 1, &["a", "b", "c", "d"]);
        let source_reader = PolyReader::open(source, None, None).unwrap();
        let seg_reader = source_reader.seg_readers()[0].clone();

        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        let schema = schema();
        let polyreader = Arc::new(PolyReader::empty(folder.clone(), schema.clone()));
        let mut seg_writer =
            SegWriter::new(folder.clone(), schema, Snapshot::new(), Segment::new(1), polyreader);
        seg_writer.prep_seg_dir().unwrap();
        seg_writer.add_doc(&Doc::new().with_field("title", "z")).unwrap();

        let offset = seg_writer.segment().count() as i32;
        let doc_map = generate_doc_map(|id| id == 2, seg_reader.doc_max(), offset);
        seg_writer.add_segment(&seg_reader, &doc_map).unwrap();
        assert_eq!(seg_writer.segment().count(), 4);
        assert_eq!(seg_writer.add_doc(&Doc::new().with_field("title", "y")).unwrap(), 5);
    }
}
