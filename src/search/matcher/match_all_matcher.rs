use crate::error::Result;
use crate::search::matcher::Matcher;

/// Matches every doc id from 1 to `doc_max` with a constant score.
#[derive(Debug, Clone)]
pub struct MatchAllMatcher {
    doc_id: i32,
    doc_max: i32,
    score: f32,
}

impl MatchAllMatcher {
    pub fn new(score: f32, doc_max: i32) -> Self {
        MatchAllMatcher {
            doc_id: 0,
            doc_max,
            score,
        }
    }
}

impl Matcher for MatchAllMatcher {
    fn next(&mut self) -> Result<i32> {
        let target = self.doc_id + 1;
        self.advance(target)
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        let target = target.max(self.doc_id + 1);
        if self.doc_id > self.doc_max || target > self.doc_max {
            self.doc_id = self.doc_max + 1;
            return Ok(0);
        }
        self.doc_id = target;
        Ok(target)
    }

    fn doc_id(&self) -> i32 {
        if self.doc_id > self.doc_max { 0 } else { self.doc_id }
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.score)
    }
}

/// Matches nothing.
#[derive(Debug, Clone, Default)]
pub struct NoMatchMatcher;

impl NoMatchMatcher {
    pub fn new() -> Self {
        NoMatchMatcher
    }
}

impl Matcher for NoMatchMatcher {
    fn next(&mut self) -> Result<i32> {
        Ok(0)
    }

    fn advance(&mut self, _target: i32) -> Result<i32> {
        Ok(0)
    }

    fn doc_id(&self) -> i32 {
        0
    }

    fn score(&mut self) -> Result<f32> {
        Ok(0.0)
    }
}
