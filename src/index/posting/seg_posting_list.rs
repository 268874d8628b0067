use crate::error::Result;
use crate::index::posting::raw_posting::read_positions;
use crate::index::posting::read_doc_code;
use crate::index::term_info::TermInfo;
use crate::store::InStream;

#[derive(Debug, Clone, Copy)]
struct SkipEntry {
    doc_id: i32,
    filepos: u64,
    /// Postings consumed once the stream is positioned at `filepos`.
    count: u32,
}

/// Cursor over the postings of one term in one segment.
#[derive(Debug, Clone)]
pub struct SegPostingList {
    post: InStream,
    skip: Option<InStream>,
    doc_freq: u32,
    skip_interval: u32,
    count: u32,
    doc_id: i32,
    freq: u32,
    positions: Vec<u32>,
    num_skips: u32,
    skips_read: u32,
    skip_doc: i32,
    skip_filepos: u64,
    pending: Option<SkipEntry>,
}

impl SegPostingList {
    pub fn new(
        mut post: InStream,
        mut skip: Option<InStream>,
        tinfo: &TermInfo,
        skip_interval: u32,
    ) -> Result<Self> {
        let skip_interval = skip_interval.max(1);
        post.seek(tinfo.post_filepos)?;
        let mut num_skips = 0;
        if tinfo.doc_freq >= skip_interval
            && let Some(skip) = skip.as_mut()
        {
            skip.seek(tinfo.skip_filepos)?;
            num_skips = (tinfo.doc_freq - 1) / skip_interval;
        }
        Ok(SegPostingList {
            post,
            skip,
            doc_freq: tinfo.doc_freq,
            skip_interval,
            count: 0,
            doc_id: 0,
            freq: 0,
            positions: Vec::new(),
            num_skips,
            skips_read: 0,
            skip_doc: 0,
            skip_filepos: tinfo.post_filepos,
            pending: None,
        })
    }

    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    /// Current doc id; 0 before the first call to `next` and once exhausted.
    pub fn doc_id(&self) -> i32 {
        self.doc_id
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    pub fn next(&mut self) -> Result<i32> {
        if self.count >= self.doc_freq {
            self.doc_id = 0;
            self.freq = 0;
            self.positions.clear();
            return Ok(0);
        }
        let (delta, freq) = read_doc_code(&mut self.post)?;
        self.doc_id += delta as i32;
        self.freq = freq;
        self.positions = read_positions(&mut self.post, freq)?;
        self.count += 1;
        Ok(self.doc_id)
    }

    fn read_skip_entry(&mut self) -> Result<Option<SkipEntry>> {
        if self.skips_read >= self.num_skips {
            return Ok(None);
        }
        let Some(skip) = self.skip.as_mut() else {
            return Ok(None);
        };
        self.skip_doc += skip.read_c32()? as i32;
        self.skip_filepos += skip.read_c64()?;
        self.skips_read += 1;
        Ok(Some(SkipEntry {
            doc_id: self.skip_doc,
            filepos: self.skip_filepos,
            count: self.skips_read * self.skip_interval,
        }))
    }

    /// Move to the first doc id greater than or equal to `target`, always
    /// moving past the current one.
    pub fn advance(&mut self, target: i32) -> Result<i32> {
        if self.num_skips > 0 {
            loop {
                let entry = match self.pending {
                    Some(entry) => entry,
                    None => match self.read_skip_entry()? {
                        Some(entry) => entry,
                        None => break,
                    },
                };
                if entry.doc_id >= target {
                    self.pending = Some(entry);
                    break;
                }
                self.pending = None;
                if entry.count > self.count {
                    self.count = entry.count;
                    self.doc_id = entry.doc_id;
                    self.post.seek(entry.filepos)?;
                }
            }
        }

        loop {
            let doc_id = self.next()?;
            if doc_id == 0 || doc_id >= target {
                return Ok(doc_id);
            }
        }
    }
}
