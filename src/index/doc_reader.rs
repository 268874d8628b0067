use std::any::Any;

use crate::document::{Doc, FieldValue};
use crate::error::{IndexError, Result};
use crate::index::data_reader::DataReader;
use crate::index::doc_writer::{CURRENT_FILE_FORMAT, dat_file, ix_file};
use crate::index::segment::Segment;
use crate::store::compound::json_to_i64;
use crate::store::{Folder, InStream};

/// Stored-field access for one segment.
#[derive(Debug)]
pub struct DocReader {
    ix_in: Option<InStream>,
    dat_in: Option<InStream>,
    doc_max: i32,
}

impl DocReader {
    pub const API: &'static str = "DocReader";

    pub fn open(folder: &dyn Folder, segment: &Segment) -> Result<Self> {
        let mut reader = DocReader {
            ix_in: None,
            dat_in: None,
            doc_max: segment.count() as i32,
        };
        let Some(metadata) = segment.fetch_metadata("documents") else {
            return Ok(reader);
        };
        let format = metadata
            .get("format")
            .and_then(json_to_i64)
            .ok_or_else(|| IndexError::format("Missing 'format' in documents metadata"))?;
        if format < 1 {
            return Err(IndexError::format(format!("Obsolete doc storage format {format}")));
        }
        if format > CURRENT_FILE_FORMAT as i64 {
            return Err(IndexError::format(format!(
                "Unsupported doc storage format: {format} (current = {CURRENT_FILE_FORMAT})"
            )));
        }

        let ix_path = ix_file(segment.name());
        if folder.exists_virtual(&ix_path) {
            reader.ix_in = Some(folder.open_in(&ix_path)?);
            reader.dat_in = Some(folder.open_in(&dat_file(segment.name()))?);
        }
        Ok(reader)
    }

    /// The encoded record for `doc_id`.
    pub fn read_record(&self, doc_id: i32) -> Result<Vec<u8>> {
        let (Some(ix_in), Some(dat_in)) = (&self.ix_in, &self.dat_in) else {
            return Err(IndexError::not_found(format!("No stored documents for doc id {doc_id}")));
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
                "Corrupt document index: record {doc_id} ends before it starts"
            )));
        }
        let mut dat_in = dat_in.clone();
        dat_in.seek(start as u64)?;
        dat_in.read_bytes((end - start) as usize)
    }

    /// Materialize every stored field of `doc_id`.
    pub fn fetch_doc(&self, doc_id: i32) -> Result<Doc> {
        let record = self.read_record(doc_id)?;
        let mut input = InStream::from_vec("document", record);
        let num_fields = input.read_c32()?;
        let mut doc = Doc::new();
        for _ in 0..num_fields {
            let field = input.read_string()?;
            let value = FieldValue::read_from(&mut input)?;
            doc.store(field, value);
        }
        Ok(doc)
    }
}

impl DataReader for DocReader {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
