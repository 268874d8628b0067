use std::collections::BTreeMap;

use crate::analysis::Inversion;
use crate::error::{IndexError, Result};
use crate::index::lexicon::SegLexicon;
use crate::index::posting::raw_posting::RawPosting;
use crate::index::posting::reader::PostingListReader;
use crate::index::posting::write_doc_code;
use crate::index::term_info::TermInfo;
use crate::store::OutStream;

/// In-memory postings for one field, kept sorted by term and doc id until
/// the segment is finished.
///
/// There is no flush threshold: every posting of the segment, including
/// those copied in by [`PostingPool::add_segment`], stays in memory until
/// [`PostingPool::flush`]. Memory use grows with the segment, so a merge
/// needs room for all postings of the merged field.
#[derive(Debug, Default)]
pub struct PostingPool {
    field: String,
    terms: BTreeMap<String, Vec<RawPosting>>,
    num_postings: usize,
}

impl PostingPool {
    pub fn new<S: Into<String>>(field: S) -> Self {
        PostingPool {
            field: field.into(),
            ..PostingPool::default()
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn num_postings(&self) -> usize {
        self.num_postings
    }

    pub fn is_empty(&self) -> bool {
        self.num_postings == 0
    }

    /// Add a posting. Postings for a term must arrive in increasing doc id
    /// order.
    pub fn add_posting(&mut self, term: &str, posting: RawPosting) -> Result<()> {
        let postings = self.terms.entry(term.to_string()).or_default();
        if let Some(last) = postings.last()
            && last.doc_id >= posting.doc_id
        {
            return Err(IndexError::contract(format!(
                "Doc ids out of order for '{}' in field '{}': {} then {}",
                term, self.field, last.doc_id, posting.doc_id
            )));
        }
        postings.push(posting);
        self.num_postings += 1;
        Ok(())
    }

    /// Add one posting per distinct term of an inverted field.
    pub fn add_inversion(&mut self, inversion: &Inversion, doc_id: i32) -> Result<()> {
        for cluster in inversion.clusters() {
            let positions: Vec<u32> = cluster.iter().map(|token| token.pos.max(0) as u32).collect();
            self.add_posting(&cluster[0].text, RawPosting::new(doc_id, &positions))?;
        }
        Ok(())
    }

    /// Copy every posting of another segment's field, renumbering documents
    /// through `doc_map` and dropping those mapped to 0.
    pub fn add_segment(
        &mut self,
        lexicon: &mut SegLexicon,
        plist_reader: &PostingListReader,
        doc_map: &[i32],
    ) -> Result<()> {
        lexicon.reset()?;
        while lexicon.next()? {
            let (Some(term), Some(tinfo)) = (lexicon.term(), lexicon.term_info()) else {
                break;
            };
            let Some(mut plist) = plist_reader.posting_list_for(lexicon.field(), tinfo)? else {
                continue;
            };
            loop {
                let doc_id = plist.next()?;
                if doc_id == 0 {
                    break;
                }
                let new_doc_id = doc_map.get(doc_id as usize).copied().unwrap_or(0);
                if new_doc_id == 0 {
                    continue;
                }
                self.add_posting(term, RawPosting::new(new_doc_id, plist.positions()))?;
            }
        }
        Ok(())
    }

    /// Write every posting run to `post` and skip data to `skip`, reporting
    /// each term and its location to `on_term` in sorted order. The pool is
    /// empty afterwards.
    pub fn flush<F>(
        &mut self,
        post: &mut OutStream,
        skip: &mut OutStream,
        skip_interval: u32,
        mut on_term: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &TermInfo) -> Result<()>,
    {
        let skip_interval = skip_interval.max(1);
        let terms = std::mem::take(&mut self.terms);
        self.num_postings = 0;

        for (term, postings) in terms {
            let doc_freq = postings.len() as u32;
            let mut tinfo = TermInfo::new(doc_freq);
            tinfo.post_filepos = post.tell();
            let with_skips = doc_freq >= skip_interval;
            if with_skips {
                tinfo.skip_filepos = skip.tell();
            }

            let mut last_doc = 0;
            let mut last_skip_doc = 0;
            let mut last_skip_filepos = tinfo.post_filepos;
            for (i, posting) in postings.iter().enumerate() {
                write_doc_code(post, (posting.doc_id - last_doc) as u32, posting.freq)?;
                post.write_bytes(&posting.aux)?;
                last_doc = posting.doc_id;

                let count = i as u32 + 1;
                if with_skips && count % skip_interval == 0 && count < doc_freq {
                    let filepos = post.tell();
                    skip.write_c32((last_doc - last_skip_doc) as u32)?;
                    skip.write_c64(filepos - last_skip_filepos)?;
                    last_skip_doc = last_doc;
                    last_skip_filepos = filepos;
                }
            }
            on_term(&term, &tinfo)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Token;
    use crate::store::{Folder, RamFolder};

    #[test]
    fn test_add_inversion() {
        let mut inversion = Inversion::new();
        for word in ["b", "a", "b"] {
            inversion.append(Token::new(word, 0, 1)).unwrap();
        }
        inversion.invert().unwrap();

        let mut pool = PostingPool::new("content");
        pool.add_inversion(&inversion, 1).unwrap();
        assert_eq!(pool.num_postings(), 2);
        assert_eq!(pool.terms["b"][0].positions().unwrap(), vec![0, 2]);
        assert!(pool.add_inversion(&inversion, 1).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_holds_every_posting_until_flush() {
        let folder = RamFolder::new();
        let mut pool = PostingPool::new("content");
        for doc_id in 1..=500 {
            pool.add_posting("common", RawPosting::new(doc_id, &[0])).unwrap();
            pool.add_posting(&format!("rare{doc_id}"), RawPosting::new(doc_id, &[1])).unwrap();
        }
        assert_eq!(pool.num_postings(), 1000);

        let mut post = folder.open_out("content.post").unwrap();
        let mut skip = folder.open_out("content.skip").unwrap();
        let mut num_terms = 0;
        pool.flush(&mut post, &mut skip, 16, |_, _| {
            num_terms += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(num_terms, 501);
        assert!(pool.is_empty());
        assert!(pool.terms.is_empty());
    }
}
