use crate::error::{IndexError, Result};
use crate::index::lexicon::{LexIndex, dat_file, ix_file, ixix_file};
use crate::index::term_info::TermInfo;
use crate::store::{Folder, InStream};

/// Forward-only cursor over one field's terms in one segment.
#[derive(Debug, Clone)]
pub struct SegLexicon {
    field: String,
    dat: InStream,
    lex_index: LexIndex,
    size: i32,
    skip_interval: u32,
    term_num: i32,
    term: String,
    tinfo: TermInfo,
}

impl SegLexicon {
    pub fn new<S: Into<String>>(
        field: S,
        dat: InStream,
        lex_index: LexIndex,
        size: i32,
        skip_interval: u32,
    ) -> Self {
        SegLexicon {
            field: field.into(),
            dat,
            lex_index,
            size,
            skip_interval,
            term_num: -1,
            term: String::new(),
            tinfo: TermInfo::default(),
        }
    }

    /// Open the lexicon files of `field_num` in `seg_name`.
    pub fn open(
        folder: &dyn Folder,
        seg_name: &str,
        field: &str,
        field_num: i32,
        size: i32,
        index_interval: u32,
        skip_interval: u32,
    ) -> Result<Self> {
        let dat = folder.open_in(&dat_file(seg_name, field_num))?;
        let ix = folder.open_in(&ix_file(seg_name, field_num))?;
        let ixix = folder.open_in(&ixix_file(seg_name, field_num))?;
        let lex_index = LexIndex::new(ixix, ix, index_interval, skip_interval)?;
        Ok(SegLexicon::new(field, dat, lex_index, size, skip_interval))
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Number of terms in the field.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Ordinal of the current term, -1 before the first call to `next`.
    pub fn term_num(&self) -> i32 {
        self.term_num
    }

    fn positioned(&self) -> bool {
        self.term_num >= 0 && self.term_num < self.size
    }

    /// The current term, or `None` before iteration starts and once the
    /// lexicon is exhausted.
    pub fn term(&self) -> Option<&str> {
        self.positioned().then_some(self.term.as_str())
    }

    pub fn term_info(&self) -> Option<&TermInfo> {
        self.positioned().then_some(&self.tinfo)
    }

    pub fn doc_freq(&self) -> u32 {
        if self.positioned() { self.tinfo.doc_freq } else { 0 }
    }

    pub fn reset(&mut self) -> Result<()> {
        self.term_num = -1;
        self.dat.seek(0)?;
        self.term.clear();
        self.tinfo.reset();
        Ok(())
    }

    /// Step to the next term. Returns false once every term has been read.
    pub fn next(&mut self) -> Result<bool> {
        self.term_num += 1;
        if self.term_num >= self.size {
            self.term_num = self.size;
            self.term.clear();
            self.tinfo.reset();
            return Ok(false);
        }

        let shared = self.dat.read_c32()? as usize;
        let suffix_len = self.dat.read_c32()? as usize;
        if shared > self.term.len() {
            return Err(IndexError::format(format!(
                "Corrupt lexicon '{}': shared prefix {shared} exceeds previous term",
                self.dat.filename()
            )));
        }
        let mut bytes = std::mem::take(&mut self.term).into_bytes();
        bytes.truncate(shared);
        bytes.extend_from_slice(&self.dat.read_bytes(suffix_len)?);
        self.term = String::from_utf8(bytes).map_err(|e| {
            IndexError::format(format!("Invalid UTF-8 in lexicon '{}': {e}", self.dat.filename()))
        })?;

        self.tinfo.doc_freq = self.dat.read_c32()?;
        self.tinfo.post_filepos += self.dat.read_c64()?;
        self.tinfo.skip_filepos = if self.tinfo.doc_freq >= self.skip_interval {
            self.dat.read_c64()?
        } else {
            0
        };
        Ok(true)
    }

    /// Position on the first term greater than or equal to `target`, or
    /// reset to the start when `target` is `None`.
    pub fn seek(&mut self, target: Option<&str>) -> Result<()> {
        let Some(target) = target else {
            return self.reset();
        };

        self.lex_index.seek(target)?;
        self.term.clear();
        self.term.push_str(self.lex_index.term());
        self.tinfo = *self.lex_index.term_info();
        self.dat.seek(self.tinfo.lex_filepos)?;
        self.term_num = self.lex_index.term_num();

        loop {
            if self.term_num != -1 && self.term.as_str() >= target {
                break;
            }
            if !self.next()? {
                break;
            }
        }
        Ok(())
    }
}
