use crate::error::Result;
use crate::index::posting::SegPostingList;
use crate::search::matcher::Matcher;
use crate::search::similarity::Similarity;

/// Matches the documents of one posting list.
#[derive(Debug)]
pub struct TermMatcher {
    plist: SegPostingList,
    weight: f32,
    sim: Similarity,
}

impl TermMatcher {
    pub fn new(plist: SegPostingList, weight: f32) -> Self {
        TermMatcher {
            plist,
            weight,
            sim: Similarity::new(),
        }
    }

    pub fn posting_list(&self) -> &SegPostingList {
        &self.plist
    }
}

impl Matcher for TermMatcher {
    fn next(&mut self) -> Result<i32> {
        self.plist.next()
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        self.plist.advance(target)
    }

    fn doc_id(&self) -> i32 {
        self.plist.doc_id()
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.sim.tf(self.plist.freq()) * self.weight)
    }
}
