use std::any::Any;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{IndexError, Result};
use crate::index::data_reader::DataReader;
use crate::index::segment::Segment;
use crate::search::matcher::BitVecMatcher;
use crate::store::Folder;
use crate::store::compound::json_to_i64;
use crate::util::BitVector;

/// The deleted documents of one segment.
#[derive(Debug)]
pub struct DeletionsReader {
    deldocs: Arc<BitVector>,
    del_count: i32,
    filename: Option<String>,
}

impl DeletionsReader {
    pub const API: &'static str = "DeletionsReader";

    /// Find the most recent deletions file for `segments[seg_tick]`.
    pub fn open(folder: &dyn Folder, segments: &[Arc<Segment>], seg_tick: usize) -> Result<Self> {
        let segment = segments.get(seg_tick).ok_or_else(|| {
            IndexError::invalid_argument(format!("Segment tick {seg_tick} out of range"))
        })?;
        let my_seg_name = segment.name();

        for other in segments.iter().rev() {
            let Some(metadata) = other.fetch_metadata("deletions") else {
                continue;
            };
            let files = metadata
                .get("files")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    IndexError::format(format!("Missing 'files' in deletions metadata of {}", other.name()))
                })?;
            let Some(entry) = files.get(my_seg_name) else {
                continue;
            };
            let del_count = entry
                .get("count")
                .and_then(json_to_i64)
                .ok_or_else(|| IndexError::format("Missing 'count' in deletions entry"))?;
            let filename = entry
                .get("filename")
                .and_then(Value::as_str)
                .ok_or_else(|| IndexError::format("Missing 'filename' in deletions entry"))?;
            let bytes = folder.slurp(filename)?;
            return Ok(DeletionsReader {
                deldocs: Arc::new(BitVector::from_bytes(&bytes)),
                del_count: del_count as i32,
                filename: Some(filename.to_string()),
            });
        }

        Ok(DeletionsReader {
            deldocs: Arc::new(BitVector::new(0)),
            del_count: 0,
            filename: None,
        })
    }

    pub fn del_count(&self) -> i32 {
        self.del_count
    }

    pub fn is_deleted(&self, doc_id: i32) -> bool {
        doc_id > 0 && self.deldocs.get(doc_id as usize)
    }

    pub fn deldocs(&self) -> &Arc<BitVector> {
        &self.deldocs
    }

    /// The file the deletions were read from, if any.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// A matcher over the deleted doc ids.
    pub fn iterator(&self) -> BitVecMatcher {
        BitVecMatcher::new(self.deldocs.clone())
    }
}

impl DataReader for DeletionsReader {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
