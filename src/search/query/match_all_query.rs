use crate::error::Result;
use crate::index::seg_reader::SegReader;
use crate::search::matcher::{MatchAllMatcher, Matcher, NoMatchMatcher};
use crate::search::query::{Compiler, Query};
use crate::search::searcher::IndexSearcher;

/// Matches every live document.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchAllQuery {
    boost: f32,
}

impl MatchAllQuery {
    pub fn new() -> Self {
        MatchAllQuery { boost: 1.0 }
    }
}

impl Default for MatchAllQuery {
    fn default() -> Self {
        MatchAllQuery::new()
    }
}

impl Query for MatchAllQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn make_compiler(
        &self,
        _searcher: &IndexSearcher,
        boost: f32,
        _subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        Ok(Box::new(MatchAllCompiler { boost }))
    }
}

#[derive(Debug)]
pub struct MatchAllCompiler {
    boost: f32,
}

impl Compiler for MatchAllCompiler {
    fn make_matcher(&self, reader: &SegReader, _need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        Ok(Some(Box::new(MatchAllMatcher::new(self.weight(), reader.doc_max()))))
    }

    fn boost(&self) -> f32 {
        self.boost
    }
}

/// Matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoMatchQuery;

impl NoMatchQuery {
    pub fn new() -> Self {
        NoMatchQuery
    }
}

impl Query for NoMatchQuery {
    fn boost(&self) -> f32 {
        1.0
    }

    fn make_compiler(
        &self,
        _searcher: &IndexSearcher,
        boost: f32,
        _subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        Ok(Box::new(NoMatchCompiler { boost }))
    }
}

#[derive(Debug)]
pub struct NoMatchCompiler {
    boost: f32,
}

impl Compiler for NoMatchCompiler {
    fn make_matcher(&self, _reader: &SegReader, _need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        Ok(Some(Box::new(NoMatchMatcher::new())))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn sum_of_squared_weights(&self) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query::tests::searcher_for;

    #[test]
    fn test_all_and_nothing() {
        let searcher = searcher_for(&[("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(searcher.hits(&MatchAllQuery::new(), 0, 10, None).unwrap().total_hits, 3);
        assert_eq!(searcher.hits(&NoMatchQuery::new(), 0, 10, None).unwrap().total_hits, 0);
    }
}
