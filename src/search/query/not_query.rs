use crate::error::Result;
use crate::index::seg_reader::SegReader;
use crate::search::matcher::{MatchAllMatcher, Matcher, NotMatcher};
use crate::search::query::{Compiler, Query};
use crate::search::searcher::IndexSearcher;

/// Matches every document the negated query does not.
#[derive(Debug)]
pub struct NotQuery {
    negated: Box<dyn Query>,
    boost: f32,
}

impl NotQuery {
    pub fn new(negated: Box<dyn Query>) -> Self {
        NotQuery { negated, boost: 1.0 }
    }

    pub fn negated(&self) -> &dyn Query {
        self.negated.as_ref()
    }
}

impl Query for NotQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn make_compiler(
        &self,
        searcher: &IndexSearcher,
        boost: f32,
        _subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        let negated = self
            .negated
            .make_compiler(searcher, self.negated.boost(), true)?;
        Ok(Box::new(NotCompiler { negated, boost }))
    }
}

#[derive(Debug)]
pub struct NotCompiler {
    negated: Box<dyn Compiler>,
    boost: f32,
}

impl Compiler for NotCompiler {
    fn make_matcher(&self, reader: &SegReader, _need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        let doc_max = reader.doc_max();
        match self.negated.make_matcher(reader, false)? {
            Some(negated) => Ok(Some(Box::new(NotMatcher::new(negated, doc_max)))),
            None => Ok(Some(Box::new(MatchAllMatcher::new(self.weight(), doc_max)))),
        }
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    // Negated clauses never contribute to the score.
    fn weight(&self) -> f32 {
        0.0
    }

    fn sum_of_squared_weights(&self) -> f32 {
        0.0
    }
}
