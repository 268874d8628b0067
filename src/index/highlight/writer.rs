use std::any::Any;
use std::sync::Arc;

use crate::analysis::Inversion;
use crate::error::{IndexError, Result};
use crate::index::data_writer::DataWriter;
use crate::index::highlight::{CURRENT_FILE_FORMAT, dat_file, ix_file};
use crate::index::inverter::Inverter;
use crate::index::lexicon::shared_prefix_len;
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;
use crate::store::{Folder, OutStream};
use crate::util::varint;

/// Encode the term vectors of an inverted field.
pub(crate) fn term_vector_buf(inversion: &Inversion) -> Vec<u8> {
    let clusters: Vec<_> = inversion.clusters().collect();
    let mut buf = Vec::with_capacity(8 + inversion.len() * 8);
    varint::encode_into(clusters.len() as u64, &mut buf);

    let mut last_text: &[u8] = &[];
    for cluster in clusters {
        let text = cluster[0].text.as_bytes();
        let overlap = shared_prefix_len(last_text, text);
        varint::encode_into(overlap as u64, &mut buf);
        varint::encode_into((text.len() - overlap) as u64, &mut buf);
        buf.extend_from_slice(&text[overlap..]);
        last_text = text;

        varint::encode_into(cluster.len() as u64, &mut buf);
        for token in cluster {
            varint::encode_into(token.pos.max(0) as u64, &mut buf);
            varint::encode_into(token.start_offset as u64, &mut buf);
            varint::encode_into(token.end_offset as u64, &mut buf);
        }
    }
    buf
}

/// Records term vectors for the highlightable fields of every document.
#[derive(Debug)]
pub struct HighlightWriter {
    folder: Arc<dyn Folder>,
    seg_name: String,
    ix_out: Option<OutStream>,
    dat_out: Option<OutStream>,
}

impl HighlightWriter {
    pub const API: &'static str = "HighlightWriter";

    pub fn new<S: Into<String>>(folder: Arc<dyn Folder>, seg_name: S) -> Self {
        HighlightWriter {
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
            ix_out.write_i64(0)?;
            self.ix_out = Some(ix_out);
            self.dat_out = Some(dat_out);
        }
        match (self.ix_out.as_mut(), self.dat_out.as_mut()) {
            (Some(ix_out), Some(dat_out)) => Ok((ix_out, dat_out)),
            _ => Err(IndexError::internal("Highlight streams not open")),
        }
    }

    fn start_record(ix_out: &mut OutStream, dat_out: &OutStream, doc_id: i32) -> Result<()> {
        let expected = (ix_out.tell() / 8) as i64;
        if doc_id as i64 != expected {
            return Err(IndexError::contract(format!(
                "Expected doc id {expected} but got {doc_id}"
            )));
        }
        ix_out.write_i64(dat_out.tell() as i64)
    }
}

impl DataWriter for HighlightWriter {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn add_inverted_doc(&mut self, inverter: &Inverter, doc_id: i32) -> Result<()> {
        let (ix_out, dat_out) = self.lazy_init()?;
        HighlightWriter::start_record(ix_out, dat_out, doc_id)?;

        let highlightable: Vec<_> = inverter
            .entries()
            .iter()
            .filter(|entry| entry.field_type.is_highlightable())
            .filter_map(|entry| entry.inversion.as_ref().map(|inversion| (&entry.field, inversion)))
            .collect();
        dat_out.write_c32(highlightable.len() as u32)?;
        for (field, inversion) in highlightable {
            dat_out.write_string(field)?;
            dat_out.write_blob(&term_vector_buf(inversion))?;
        }
        Ok(())
    }

    fn add_segment(&mut self, reader: &SegReader, doc_map: &[i32]) -> Result<()> {
        if reader.doc_max() == 0 {
            return Ok(());
        }
        let hl_reader = reader.highlight_reader();
        let (ix_out, dat_out) = self.lazy_init()?;
        for (old_id, &new_id) in doc_map.iter().enumerate().skip(1) {
            if new_id == 0 {
                continue;
            }
            HighlightWriter::start_record(ix_out, dat_out, new_id)?;
            match hl_reader.map(|r| r.read_record(old_id as i32)).transpose()?.flatten() {
                Some(record) => dat_out.write_bytes(&record)?,
                // A segment written without term vectors.
                None => dat_out.write_c32(0)?,
            }
        }
        Ok(())
    }

    fn finish(&mut self, segment: &mut Segment) -> Result<()> {
        if let (Some(mut ix_out), Some(mut dat_out)) = (self.ix_out.take(), self.dat_out.take()) {
            ix_out.write_i64(dat_out.tell() as i64)?;
            dat_out.close()?;
            ix_out.close()?;
            segment.store_metadata("highlight", self.metadata())?;
        }
        Ok(())
    }

    fn format(&self) -> i32 {
        CURRENT_FILE_FORMAT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
