//! Read access to a single segment through its registered components.

use std::sync::Arc;

use ahash::AHashMap;

use crate::document::Doc;
use crate::error::{IndexError, Result};
use crate::index::data_reader::{DataReader, downcast};
use crate::index::deletions::DeletionsReader;
use crate::index::doc_reader::DocReader;
use crate::index::highlight::{DocVector, HighlightReader};
use crate::index::lexicon::LexiconReader;
use crate::index::posting::PostingListReader;
use crate::index::segment::Segment;
use crate::index::sort::SortReader;
use crate::plan::Schema;
use crate::store::Folder;

#[derive(Debug)]
pub struct SegReader {
    schema: Arc<Schema>,
    segment: Arc<Segment>,
    components: AHashMap<&'static str, Arc<dyn DataReader>>,
    doc_max: i32,
    del_count: i32,
}

impl SegReader {
    /// Open `segments[seg_tick]`. The full segment list is needed to find
    /// the newest deletions recorded against it.
    pub fn open(
        folder: Arc<dyn Folder>,
        schema: Arc<Schema>,
        segments: &[Arc<Segment>],
        seg_tick: usize,
    ) -> Result<SegReader> {
        let segment = segments
            .get(seg_tick)
            .cloned()
            .ok_or_else(|| IndexError::invalid_argument(format!("Segment tick {seg_tick} out of range")))?;
        let mut reader = SegReader {
            schema: schema.clone(),
            doc_max: segment.count() as i32,
            segment: segment.clone(),
            components: AHashMap::new(),
            del_count: 0,
        };

        let lex_reader = Arc::new(LexiconReader::open(folder.as_ref(), &schema, segment.clone())?);
        let plist_reader =
            PostingListReader::open(folder.as_ref(), &schema, &segment, lex_reader.clone())?;
        let doc_reader = DocReader::open(folder.as_ref(), &segment)?;
        let sort_reader = SortReader::open(folder.as_ref(), &schema, &segment)?;
        let hl_reader = HighlightReader::open(folder.as_ref(), &segment)?;
        let del_reader = DeletionsReader::open(folder.as_ref(), segments, seg_tick)?;
        reader.del_count = del_reader.del_count();

        reader.register(lex_reader)?;
        reader.register(Arc::new(plist_reader))?;
        reader.register(Arc::new(doc_reader))?;
        reader.register(Arc::new(sort_reader))?;
        reader.register(Arc::new(hl_reader))?;
        reader.register(Arc::new(del_reader))?;
        log::trace!(
            "Opened {} with {} docs ({} deleted)",
            segment.name(),
            reader.doc_max,
            reader.del_count
        );
        Ok(reader)
    }

    /// Add a component under its API name. Each name may be registered once.
    pub fn register(&mut self, component: Arc<dyn DataReader>) -> Result<()> {
        let api = component.api();
        if self.components.contains_key(api) {
            return Err(IndexError::contract(format!(
                "Interface '{api}' already registered"
            )));
        }
        self.components.insert(api, component);
        Ok(())
    }

    pub fn fetch(&self, api: &str) -> Option<&Arc<dyn DataReader>> {
        self.components.get(api)
    }

    /// The component registered as `api`, if it is a `T`.
    pub fn component<T: 'static>(&self, api: &str) -> Option<&T> {
        self.fetch(api).and_then(|c| downcast::<T>(c.as_ref()))
    }

    pub fn doc_reader(&self) -> Option<&DocReader> {
        self.component(DocReader::API)
    }

    pub fn lexicon_reader(&self) -> Option<&LexiconReader> {
        self.component(LexiconReader::API)
    }

    pub fn posting_list_reader(&self) -> Option<&PostingListReader> {
        self.component(PostingListReader::API)
    }

    pub fn deletions_reader(&self) -> Option<&DeletionsReader> {
        self.component(DeletionsReader::API)
    }

    pub fn sort_reader(&self) -> Option<&SortReader> {
        self.component(SortReader::API)
    }

    pub fn highlight_reader(&self) -> Option<&HighlightReader> {
        self.component(HighlightReader::API)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }

    pub fn seg_name(&self) -> &str {
        self.segment.name()
    }

    pub fn seg_num(&self) -> u64 {
        self.segment.number()
    }

    /// Highest doc id in the segment, deleted or not.
    pub fn doc_max(&self) -> i32 {
        self.doc_max
    }

    pub fn del_count(&self) -> i32 {
        self.del_count
    }

    /// Live documents.
    pub fn doc_count(&self) -> i32 {
        self.doc_max - self.del_count
    }

    pub fn doc_freq(&self, field: &str, term: &str) -> Result<u32> {
        match self.lexicon_reader() {
            Some(lex_reader) => lex_reader.doc_freq(field, term),
            None => Ok(0),
        }
    }

    pub fn fetch_doc(&self, doc_id: i32) -> Result<Doc> {
        let doc_reader = self
            .doc_reader()
            .ok_or_else(|| IndexError::not_found(format!("No DocReader for {}", self.seg_name())))?;
        doc_reader.fetch_doc(doc_id)
    }

    /// Term vectors of `doc_id`; empty if the segment keeps none.
    pub fn fetch_doc_vec(&self, doc_id: i32) -> Result<DocVector> {
        match self.highlight_reader() {
            Some(hl_reader) => hl_reader.fetch_doc_vec(doc_id),
            None => Ok(DocVector::new()),
        }
    }
}
