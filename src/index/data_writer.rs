use std::any::Any;
use std::fmt;

use serde_json::{Value, json};

use crate::error::Result;
use crate::index::inverter::Inverter;
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;

/// A per-segment writer for one component of the index.
///
/// `SegWriter` fans every document and every segment merge out to each of
/// its registered writers, then calls [`DataWriter::finish`] once.
pub trait DataWriter: Send + fmt::Debug {
    /// Name under which the writer is registered.
    fn api(&self) -> &'static str;

    /// Process one already-inverted document. `doc_id` is the segment-local
    /// id and must be exactly one more than the previous call's.
    fn add_inverted_doc(&mut self, inverter: &Inverter, doc_id: i32) -> Result<()>;

    /// Copy the content of another segment. `doc_map` maps every local id in
    /// `reader` to its new id in the segment being written, 0 for deleted
    /// documents.
    fn add_segment(&mut self, reader: &SegReader, doc_map: &[i32]) -> Result<()>;

    /// Like [`DataWriter::add_segment`], but the source segment will be
    /// removed from the index once the commit succeeds.
    fn merge_segment(&mut self, reader: &SegReader, doc_map: &[i32]) -> Result<()> {
        self.add_segment(reader, doc_map)
    }

    /// Called when a segment with no live documents is dropped from the
    /// index.
    fn delete_segment(&mut self, _reader: &SegReader) -> Result<()> {
        Ok(())
    }

    /// Write any buffered data and register the component's metadata with
    /// `segment`.
    fn finish(&mut self, segment: &mut Segment) -> Result<()>;

    fn format(&self) -> i32;

    fn metadata(&self) -> Value {
        json!({ "format": self.format() })
    }

    fn as_any(&self) -> &dyn Any;
}

/// Build the doc map for `reader`: live documents are renumbered
/// contiguously starting after `offset`, deleted ones map to 0.
pub fn generate_doc_map(
    is_deleted: impl Fn(i32) -> bool,
    doc_max: i32,
    offset: i32,
) -> Vec<i32> {
    let mut doc_map = vec![0; (doc_max.max(0) + 1) as usize];
    let mut next = offset;
    for doc_id in 1..=doc_max {
        if !is_deleted(doc_id) {
            next += 1;
            doc_map[doc_id as usize] = next;
        }
    }
    doc_map
}
