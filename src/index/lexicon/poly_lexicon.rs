use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::index::lexicon::SegLexicon;

/// Merged cursor over one field's terms in several segments.
///
/// Each distinct term is visited once, in sorted order. Like
/// [`SegLexicon`] the cursor starts before the first term.
#[derive(Debug)]
pub struct PolyLexicon {
    field: String,
    seg_lexicons: Vec<SegLexicon>,
    /// Current term of every positioned segment lexicon, with its tick.
    queue: BinaryHeap<Reverse<(String, usize)>>,
    term: Option<String>,
}

impl PolyLexicon {
    pub fn new<S: Into<String>>(field: S, seg_lexicons: Vec<SegLexicon>) -> Result<Self> {
        let mut lexicon = PolyLexicon {
            field: field.into(),
            seg_lexicons,
            queue: BinaryHeap::new(),
            term: None,
        };
        lexicon.reset()?;
        Ok(lexicon)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn num_seg_lexicons(&self) -> usize {
        self.seg_lexicons.len()
    }

    /// The current term; `None` before iteration starts and once exhausted.
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    /// Documents containing the current term, summed over segments.
    pub fn doc_freq(&self) -> u32 {
        let Some(term) = self.term.as_deref() else {
            return 0;
        };
        self.seg_lexicons
            .iter()
            .filter(|lexicon| lexicon.term() == Some(term))
            .map(SegLexicon::doc_freq)
            .sum()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.queue.clear();
        self.term = None;
        for (tick, lexicon) in self.seg_lexicons.iter_mut().enumerate() {
            lexicon.reset()?;
            if lexicon.next()?
                && let Some(term) = lexicon.term()
            {
                self.queue.push(Reverse((term.to_string(), tick)));
            }
        }
        Ok(())
    }

    /// Step to the next distinct term. Returns false once every segment is
    /// exhausted.
    pub fn next(&mut self) -> Result<bool> {
        loop {
            let Some(Reverse((candidate, tick))) = self.queue.peek() else {
                self.term = None;
                return Ok(false);
            };
            if self.term.as_deref() != Some(candidate.as_str()) {
                self.term = Some(candidate.clone());
                return Ok(true);
            }

            let tick = *tick;
            self.queue.pop();
            let lexicon = &mut self.seg_lexicons[tick];
            if lexicon.next()?
                && let Some(term) = lexicon.term()
            {
                self.queue.push(Reverse((term.to_string(), tick)));
            }
        }
    }

    /// Position on the first term greater than or equal to `target`, or
    /// reset to the start when `target` is `None`.
    pub fn seek(&mut self, target: Option<&str>) -> Result<()> {
        if target.is_none() {
            return self.reset();
        }
        self.queue.clear();
        for (tick, lexicon) in self.seg_lexicons.iter_mut().enumerate() {
            lexicon.seek(target)?;
            if let Some(term) = lexicon.term() {
                self.queue.push(Reverse((term.to_string(), tick)));
            }
        }
        self.term = self.queue.peek().map(|Reverse((term, _))| term.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::document::Doc;
    use crate::index::{Indexer, IndexerConfig, PolyReader};
    use crate::plan::{FieldType, Schema};
    use crate::store::{Folder, RamFolder};

    fn three_segments() -> PolyReader {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        let mut schema = Schema::new();
        schema.spec_field("tag", FieldType::string()).unwrap();
        schema.spec_field("note", FieldType::string().with_indexed(false)).unwrap();
        for batch in [&["kiwi", "apple"][..], &["mango", "apple"], &["banana", "kiwi", "kiwi"]] {
            let mut indexer =
                Indexer::open(Some(schema.clone()), folder.clone(), None, IndexerConfig::create())
                    .unwrap();
            for tag in batch {
                indexer.add_doc(&Doc::new().with_field("tag", *tag)).unwrap();
            }
            indexer.commit().unwrap();
        }
        PolyReader::open(folder, None, None).unwrap()
    }

    #[test]
    fn test_merges_segment_terms() {
        let reader = three_segments();
        let mut lexicon = reader.lexicon("tag", None).unwrap().unwrap();
        assert!(lexicon.num_seg_lexicons() >= 1);
        assert_eq!(lexicon.term(), None);

        let mut seen = Vec::new();
        while lexicon.next().unwrap() {
            seen.push((lexicon.term().unwrap().to_string(), lexicon.doc_freq()));
        }
        let want: Vec<(String, u32)> = [("apple", 2), ("banana", 1), ("kiwi", 3), ("mango", 1)]
            .into_iter()
            .map(|(term, freq)| (term.to_string(), freq))
            .collect();
        assert_eq!(seen, want);
        assert_eq!(lexicon.term(), None);
        assert!(!lexicon.next().unwrap());
    }

    #[test]
    fn test_seek() {
        let reader = three_segments();
        let mut lexicon = reader.lexicon("tag", Some("c")).unwrap().unwrap();
        assert_eq!(lexicon.term(), Some("kiwi"));
        assert_eq!(lexicon.doc_freq(), 3);
        assert!(lexicon.next().unwrap());
        assert_eq!(lexicon.term(), Some("mango"));

        lexicon.seek(Some("mango")).unwrap();
        assert_eq!(lexicon.term(), Some("mango"));
        lexicon.seek(Some("zebra")).unwrap();
        assert_eq!(lexicon.term(), None);

        lexicon.seek(None).unwrap();
        assert!(lexicon.next().unwrap());
        assert_eq!(lexicon.term(), Some("apple"));
        assert!(reader.lexicon("note", None).unwrap().is_none());
    }
}
