use std::sync::Arc;

use ahash::AHashMap;
use serde_json::{Map, Value, json};

use crate::error::{IndexError, Result};
use crate::index::data_writer::generate_doc_map;
use crate::index::deletions::{CURRENT_FILE_FORMAT, del_file};
use crate::index::poly_reader::PolyReader;
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;
use crate::search::{IndexSearcher, Matcher, Query};
use crate::store::Folder;
use crate::store::compound::json_to_i64;
use crate::util::BitVector;

/// Records deletions against the segments of an existing index while a new
/// segment is being written, and persists them alongside it.
#[derive(Debug)]
pub struct DeletionsWriter {
    folder: Arc<dyn Folder>,
    seg_name: String,
    polyreader: Arc<PolyReader>,
    bit_vecs: Vec<BitVector>,
    updated: Vec<bool>,
    name_to_tick: AHashMap<String, usize>,
}

impl DeletionsWriter {
    /// Start from the deletions currently recorded for every segment of
    /// `polyreader`.
    pub fn new<S: Into<String>>(folder: Arc<dyn Folder>, polyreader: Arc<PolyReader>, seg_name: S) -> Self {
        let seg_readers = polyreader.seg_readers();
        let mut bit_vecs = Vec::with_capacity(seg_readers.len());
        let mut name_to_tick = AHashMap::with_capacity(seg_readers.len());
        for (tick, seg_reader) in seg_readers.iter().enumerate() {
            let mut bit_vec = BitVector::new(seg_reader.doc_max().max(0) as usize + 1);
            if let Some(del_reader) = seg_reader.deletions_reader() {
                bit_vec.or(del_reader.deldocs());
            }
            bit_vecs.push(bit_vec);
            name_to_tick.insert(seg_reader.seg_name().to_string(), tick);
        }
        DeletionsWriter {
            folder,
            seg_name: seg_name.into(),
            updated: vec![false; bit_vecs.len()],
            bit_vecs,
            polyreader,
            name_to_tick,
        }
    }

    fn zap<M: Matcher + ?Sized>(&mut self, tick: usize, matcher: &mut M) -> Result<()> {
        let bit_vec = &mut self.bit_vecs[tick];
        let mut num_zapped = 0;
        loop {
            let doc_id = matcher.next()?;
            if doc_id == 0 {
                break;
            }
            if !bit_vec.get(doc_id as usize) {
                num_zapped += 1;
                bit_vec.set(doc_id as usize);
            }
        }
        if num_zapped > 0 {
            self.updated[tick] = true;
        }
        Ok(())
    }

    /// Delete every document whose `field` contains `term` exactly.
    pub fn delete_by_term(&mut self, field: &str, term: &str) -> Result<()> {
        let polyreader = self.polyreader.clone();
        for (tick, seg_reader) in polyreader.seg_readers().iter().enumerate() {
            let Some(plist_reader) = seg_reader.posting_list_reader() else {
                continue;
            };
            let Some(plist) = plist_reader.posting_list(field, term)? else {
                continue;
            };
            let mut matcher = crate::search::matcher::TermMatcher::new(plist, 0.0);
            self.zap(tick, &mut matcher)?;
        }
        Ok(())
    }

    /// Delete every document matching `query`.
    pub fn delete_by_query(&mut self, query: &dyn Query) -> Result<()> {
        let polyreader = self.polyreader.clone();
        let searcher = IndexSearcher::new(polyreader.clone());
        let compiler = query.make_compiler(&searcher, query.boost(), false)?;
        for (tick, seg_reader) in polyreader.seg_readers().iter().enumerate() {
            if let Some(mut matcher) = compiler.make_matcher(seg_reader, false)? {
                self.zap(tick, matcher.as_mut())?;
            }
        }
        Ok(())
    }

    /// Delete a document by its index-wide doc id.
    pub fn delete_by_doc_id(&mut self, doc_id: i32) -> Result<()> {
        if doc_id < 1 || doc_id > self.polyreader.doc_max() {
            return Err(IndexError::invalid_argument(format!(
                "Doc id {doc_id} out of range (max {})",
                self.polyreader.doc_max()
            )));
        }
        let tick = self.polyreader.sub_tick(doc_id);
        let seg_doc_id = (doc_id - self.polyreader.offsets()[tick]) as usize;
        let bit_vec = &mut self.bit_vecs[tick];
        if !bit_vec.get(seg_doc_id) {
            bit_vec.set(seg_doc_id);
            self.updated[tick] = true;
        }
        Ok(())
    }

    /// True if any deletion was recorded in this session.
    pub fn updated(&self) -> bool {
        self.updated.iter().any(|u| *u)
    }

    /// Number of deleted documents in the named segment, counting this
    /// session's deletions.
    pub fn seg_del_count(&self, seg_name: &str) -> i32 {
        self.name_to_tick
            .get(seg_name)
            .map_or(0, |&tick| self.bit_vecs[tick].count() as i32)
    }

    /// Current deletions for a segment of the index, if it has any.
    pub fn seg_deletions(&self, reader: &SegReader) -> Option<&BitVector> {
        let tick = *self.name_to_tick.get(reader.seg_name())?;
        let existing = reader.deletions_reader().map_or(0, |d| d.del_count());
        (self.updated[tick] || existing > 0).then(|| &self.bit_vecs[tick])
    }

    /// Map `reader`'s doc ids onto a segment already holding `offset`
    /// documents, dropping deleted ones.
    pub fn generate_doc_map(&self, reader: &SegReader, offset: i32) -> Vec<i32> {
        let doc_max = reader.doc_max();
        match self.name_to_tick.get(reader.seg_name()) {
            Some(&tick) => {
                let bit_vec = &self.bit_vecs[tick];
                generate_doc_map(|doc_id| bit_vec.get(doc_id as usize), doc_max, offset)
            }
            None => {
                let del_reader = reader.deletions_reader();
                generate_doc_map(
                    |doc_id| del_reader.is_some_and(|d| d.is_deleted(doc_id)),
                    doc_max,
                    offset,
                )
            }
        }
    }

    /// Carry forward deletions files that `reader`'s segment holds for
    /// other live segments, since that segment is about to disappear.
    pub fn merge_segment(&mut self, reader: &SegReader) -> Result<()> {
        let Some(del_meta) = reader.segment().fetch_metadata("deletions") else {
            return Ok(());
        };
        let Some(files) = del_meta.get("files").and_then(Value::as_object) else {
            return Ok(());
        };
        for (seg, mini_meta) in files {
            let Some(&tick) = self.name_to_tick.get(seg) else {
                continue;
            };
            let count = mini_meta.get("count").and_then(json_to_i64).unwrap_or(-1);
            let candidate = &self.polyreader.seg_readers()[tick];
            let current = candidate.deletions_reader().map_or(0, |d| d.del_count());
            // The newest file for the candidate lives in the merged segment,
            // so a fresh copy has to be written.
            if count == current as i64 {
                self.updated[tick] = true;
            }
        }
        Ok(())
    }

    pub fn format(&self) -> i32 {
        CURRENT_FILE_FORMAT
    }

    pub fn metadata(&self) -> Value {
        let mut files = Map::new();
        for (tick, seg_reader) in self.polyreader.seg_readers().iter().enumerate() {
            if !self.updated[tick] {
                continue;
            }
            files.insert(
                seg_reader.seg_name().to_string(),
                json!({
                    "count": self.bit_vecs[tick].count(),
                    "filename": del_file(&self.seg_name, seg_reader.seg_name()),
                }),
            );
        }
        json!({ "format": CURRENT_FILE_FORMAT, "files": files })
    }

    /// Write a bit vector file for every segment with new deletions.
    pub fn finish(&mut self, segment: &mut Segment) -> Result<()> {
        for (tick, seg_reader) in self.polyreader.seg_readers().iter().enumerate() {
            if !self.updated[tick] {
                continue;
            }
            let doc_max = seg_reader.doc_max().max(0) as usize;
            let byte_size = (doc_max + 1).div_ceil(8);
            let bit_vec = &mut self.bit_vecs[tick];
            bit_vec.grow(byte_size * 8);
            let filename = del_file(&self.seg_name, seg_reader.seg_name());
            let mut out = self.folder.open_out(&filename)?;
            out.write_bytes(&bit_vec.to_bytes_sized(byte_size))?;
            out.close()?;
            log::debug!(
                "Wrote {} deletions for {} to '{filename}'",
                bit_vec.count(),
                seg_reader.seg_name()
            );
        }
        segment.store_metadata("deletions", self.metadata())
    }
}
