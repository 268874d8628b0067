//! The document store writer.
//!
//! `documents.dat` holds one record per document: the number of stored
//! fields, then each field name and typed value. `documents.ix` holds a
//! big-endian `i64` start offset per doc id, beginning with a placeholder
//! for doc 0 and ending with the end offset of the last record.

use std::any::Any;
use std::sync::Arc;

use crate::error::{IndexError, Result};
use crate::index::data_writer::DataWriter;
use crate::index::inverter::Inverter;
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;
use crate::store::{Folder, OutStream};

/// Version written into the segment's "documents" metadata.
pub const CURRENT_FILE_FORMAT: i32 = 2;

pub(crate) fn ix_file(seg_name: &str) -> String {
    format!("{seg_name}/documents.ix")
}

pub(crate) fn dat_file(seg_name: &str) -> String {
    format!("{seg_name}/documents.dat")
}

#[derive(Debug)]
pub struct DocWriter {
    folder: Arc<dyn Folder>,
    seg_name: String,
    ix_out: Option<OutStream>,
    dat_out: Option<OutStream>,
}

impl DocWriter {
    pub const API: &'static str = "DocWriter";

    pub fn new<S: Into<String>>(folder: Arc<dyn Folder>, seg_name: S) -> Self {
        DocWriter {
            folder,
            seg_name: seg_name.into(),
            ix_out: None,
            dat_out: None,
        }
    }

    fn lazy_init(&mut self) -> Result<(&mut OutStream, &mut OutStream)> {
        if self.dat_out.is_none() {
            let mut ix_out = self.folder.open_out(&ix_file(&self.seg_name))?;
            let dat_out = self.folder.open_out(&dat_file(&self.seg_name))?;
            // Doc ids start at 1.
            ix_out.write_i64(0)?;
            self.ix_out = Some(ix_out);
            self.dat_out = Some(dat_out);
        }
        match (self.ix_out.as_mut(), self.dat_out.as_mut()) {
            (Some(ix_out), Some(dat_out)) => Ok((ix_out, dat_out)),
            _ => Err(IndexError::internal("Document store streams not open")),
        }
    }

    fn check_doc_id(ix_out: &OutStream, doc_id: i32) -> Result<()> {
        let expected = (ix_out.tell() / 8) as i64;
        if doc_id as i64 != expected {
            return Err(IndexError::contract(format!(
                "Expected doc id {expected} but got {doc_id}"
            )));
        }
        Ok(())
    }
}

impl DataWriter for DocWriter {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn add_inverted_doc(&mut self, inverter: &Inverter, doc_id: i32) -> Result<()> {
        let (ix_out, dat_out) = self.lazy_init()?;
        DocWriter::check_doc_id(ix_out, doc_id)?;
        let start = dat_out.tell();

        let stored: Vec<_> = inverter
            .entries()
            .iter()
            .filter(|entry| entry.field_type.is_stored())
            .collect();
        dat_out.write_c32(stored.len() as u32)?;
        for entry in stored {
            dat_out.write_string(&entry.field)?;
            entry.value.write_to(dat_out)?;
        }

        ix_out.write_i64(start as i64)
    }

    fn add_segment(&mut self, reader: &SegReader, doc_map: &[i32]) -> Result<()> {
        let Some(doc_reader) = reader.doc_reader() else {
            return Ok(());
        };
        let (ix_out, dat_out) = self.lazy_init()?;
        for (old_id, &new_id) in doc_map.iter().enumerate().skip(1) {
            if new_id == 0 {
                continue;
            }
            DocWriter::check_doc_id(ix_out, new_id)?;
            let start = dat_out.tell();
            let record = doc_reader.read_record(old_id as i32)?;
            dat_out.write_bytes(&record)?;
            ix_out.write_i64(start as i64)?;
        }
        Ok(())
    }

    fn finish(&mut self, segment: &mut Segment) -> Result<()> {
        if let (Some(mut ix_out), Some(mut dat_out)) = (self.ix_out.take(), self.dat_out.take()) {
            // Bound the last record.
            ix_out.write_i64(dat_out.tell() as i64)?;
            dat_out.close()?;
            ix_out.close()?;
        }
        segment.store_metadata("documents", self.metadata())
    }

    fn format(&self) -> i32 {
        CURRENT_FILE_FORMAT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
