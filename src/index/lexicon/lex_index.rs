use crate::error::{IndexError, Result};
use crate::index::lexicon::read_key_frame;
use crate::index::term_info::TermInfo;
use crate::store::InStream;

/// Binary-searchable view of a field's lexicon key frames.
#[derive(Debug, Clone)]
pub struct LexIndex {
    ixix: InStream,
    ix: InStream,
    size: i32,
    index_interval: u32,
    skip_interval: u32,
    tick: i32,
    term: String,
    tinfo: TermInfo,
}

impl LexIndex {
    pub fn new(ixix: InStream, ix: InStream, index_interval: u32, skip_interval: u32) -> Result<Self> {
        if ixix.length() % 8 != 0 {
            return Err(IndexError::format(format!(
                "Corrupt lexicon index '{}': length {} is not a multiple of 8",
                ixix.filename(),
                ixix.length()
            )));
        }
        let size = (ixix.length() / 8) as i32;
        let mut lex_index = LexIndex {
            ixix,
            ix,
            size,
            index_interval: index_interval.max(1),
            skip_interval,
            tick: 0,
            term: String::new(),
            tinfo: TermInfo::default(),
        };
        if size > 0 {
            lex_index.read_entry(0)?;
        }
        Ok(lex_index)
    }

    /// Number of key frames.
    pub fn size(&self) -> i32 {
        self.size
    }

    fn read_term_at(&mut self, tick: i32) -> Result<String> {
        self.ixix.seek(tick as u64 * 8)?;
        let offset = self.ixix.read_i64()?;
        self.ix.seek(offset as u64)?;
        self.ix.read_string()
    }

    fn read_entry(&mut self, tick: i32) -> Result<()> {
        self.ixix.seek(tick as u64 * 8)?;
        let offset = self.ixix.read_i64()?;
        self.ix.seek(offset as u64)?;
        let (term, tinfo) = read_key_frame(&mut self.ix, self.skip_interval)?;
        self.tick = tick;
        self.term = term;
        self.tinfo = tinfo;
        Ok(())
    }

    /// Position on the last key frame whose term is less than or equal to
    /// `target`.
    pub fn seek(&mut self, target: &str) -> Result<()> {
        if self.size == 0 {
            self.tick = 0;
            self.term.clear();
            self.tinfo.reset();
            return Ok(());
        }
        let mut lo = 0;
        let mut hi = self.size - 1;
        let mut result = -1;
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let term = self.read_term_at(mid)?;
            match term.as_str().cmp(target) {
                std::cmp::Ordering::Less => {
                    result = mid;
                    lo = mid + 1;
                }
                std::cmp::Ordering::Greater => hi = mid - 1,
                std::cmp::Ordering::Equal => {
                    result = mid;
                    break;
                }
            }
        }
        self.read_entry(result.max(0))
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn term_info(&self) -> &TermInfo {
        &self.tinfo
    }

    /// Number of the lexicon term the current key frame stands for, -1 for
    /// the frame preceding the first term.
    pub fn term_num(&self) -> i32 {
        (self.index_interval as i32 * self.tick) - 1
    }
}
