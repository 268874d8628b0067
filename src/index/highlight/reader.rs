use std::any::Any;

use crate::error::{IndexError, Result};
use crate::index::data_reader::DataReader;
use crate::index::highlight::{CURRENT_FILE_FORMAT, DocVector, dat_file, ix_file};
use crate::index::segment::Segment;
use crate::store::compound::json_to_i64;
use crate::store::{Folder, InStream};

/// Term vector access for one segment.
#[derive(Debug)]
pub struct HighlightReader {
    ix_in: Option<InStream>,
    dat_in: Option<InStream>,
    doc_max: i32,
}

impl HighlightReader {
    pub const API: &'static str = "HighlightReader";

    pub fn open(folder: &dyn Folder, segment: &Segment) -> Result<Self> {
        let mut reader = HighlightReader {
            ix_in: None,
            dat_in: None,
            doc_max: segment.count() as i32,
        };
        if let Some(metadata) = segment.fetch_metadata("highlight") {
            let format = metadata
                .get("format")
                .and_then(json_to_i64)
                .ok_or_else(|| IndexError::format("Missing 'format' in highlight metadata"))?;
            if format != CURRENT_FILE_FORMAT as i64 {
                return Err(IndexError::format(format!(
                    "Unsupported highlight data format: {format}"
                )));
            }
        }

        let ix_path = ix_file(segment.name());
        if folder.exists_virtual(&ix_path) {
            reader.ix_in = Some(folder.open_in(&ix_path)?);
            reader.dat_in = Some(folder.open_in(&dat_file(segment.name()))?);
        }
        Ok(reader)
    }

    /// The encoded record for `doc_id`, or `None` if the segment holds no
    /// term vectors.
    pub fn read_record(&self, doc_id: i32) -> Result<Option<Vec<u8>>> {
        let (Some(ix_in), Some(dat_in)) = (&self.ix_in, &self.dat_in) else {
            return Ok(None);
        };
        if doc_id < 1 || doc_id > self.doc_max {
            return Err(IndexError::invalid_argument(format!(
                "Doc id {doc_id} out of range (max {})",
                self.doc_max
            )));
        }
        let mut ix_in = ix_in.clone();
        ix_in.seek(doc_id as u64 * 8)?;
        let start = ix_in.read_i64()?;
        let end = ix_in.read_i64()?;
        if end < start {
            return Err(IndexError::format(format!(
                "Corrupt highlight index: record {doc_id} ends before it starts"
            )));
        }
        let mut dat_in = dat_in.clone();
        dat_in.seek(start as u64)?;
        dat_in.read_bytes((end - start) as usize).map(Some)
    }

    pub fn fetch_doc_vec(&self, doc_id: i32) -> Result<DocVector> {
        let mut doc_vec = DocVector::new();
        let Some(record) = self.read_record(doc_id)? else {
            return Ok(doc_vec);
        };
        let mut input = InStream::from_vec("highlight record", record);
        let num_fields = input.read_c32()?;
        for _ in 0..num_fields {
            let field = input.read_string()?;
            let buf = input.read_blob()?;
            doc_vec.add_field_buf(field, buf);
        }
        Ok(doc_vec)
    }
}

impl DataReader for HighlightReader {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
