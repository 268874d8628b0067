use crate::error::Result;
use crate::index::highlight::DocVector;
use crate::index::seg_reader::SegReader;
use crate::search::matcher::{AndMatcher, Matcher};
use crate::search::query::{
    Compiler, Query, children_highlight_spans, children_sum_of_squared_weights, compile_children,
};
use crate::search::searcher::IndexSearcher;
use crate::search::similarity::Similarity;
use crate::search::span::Span;

/// Matches documents which match every child.
#[derive(Debug)]
pub struct AndQuery {
    children: Vec<Box<dyn Query>>,
    boost: f32,
}

impl AndQuery {
    pub fn new(children: Vec<Box<dyn Query>>) -> Self {
        AndQuery {
            children,
            boost: 1.0,
        }
    }

    pub fn add_child(&mut self, child: Box<dyn Query>) {
        self.children.push(child);
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn children(&self) -> &[Box<dyn Query>] {
        &self.children
    }
}

impl Query for AndQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn make_compiler(
        &self,
        searcher: &IndexSearcher,
        boost: f32,
        subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        let mut compiler = AndCompiler {
            children: compile_children(&self.children, searcher)?,
            boost,
        };
        if !subordinate {
            compiler.normalize();
        }
        Ok(Box::new(compiler))
    }
}

#[derive(Debug)]
pub struct AndCompiler {
    children: Vec<Box<dyn Compiler>>,
    boost: f32,
}

impl Compiler for AndCompiler {
    fn make_matcher(&self, reader: &SegReader, need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        let mut kids = Vec::with_capacity(self.children.len());
        for child in &self.children {
            match child.make_matcher(reader, need_score)? {
                Some(matcher) => kids.push(matcher),
                // One child without matches rules out the whole segment.
                None => return Ok(None),
            }
        }
        match kids.len() {
            0 => Ok(None),
            1 => Ok(kids.pop()),
            _ => Ok(Some(Box::new(AndMatcher::new(kids, &Similarity::new())))),
        }
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn sum_of_squared_weights(&self) -> f32 {
        children_sum_of_squared_weights(&self.children, self.boost)
    }

    fn apply_norm_factor(&mut self, factor: f32) {
        for child in self.children.iter_mut() {
            child.apply_norm_factor(factor);
        }
    }

    fn highlight_spans(&self, doc_vec: &DocVector, field: &str) -> Result<Vec<Span>> {
        children_highlight_spans(&self.children, doc_vec, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query::TermQuery;
    use crate::search::query::tests::searcher_for;

    #[test]
    fn test_conjunction() {
        let searcher = searcher_for(&[
            ("lorem ipsum", 2001),
            ("lorem dolor", 2002),
            ("ipsum lorem dolor", 2003),
        ]);
        let query = AndQuery::new(vec![
            Box::new(TermQuery::new("content", "lorem")),
            Box::new(TermQuery::new("content", "dolor")),
        ]);
        let hits = searcher.hits(&query, 0, 10, None).unwrap();
        let mut ids: Vec<i32> = hits.match_docs.iter().map(|d| d.doc_id).collect();
        ids.sort();
        assert_eq!(ids, vec![2, 3]);

        let query = AndQuery::new(vec![
            Box::new(TermQuery::new("content", "lorem")),
            Box::new(TermQuery::new("content", "missing")),
        ]);
        assert_eq!(searcher.hits(&query, 0, 10, None).unwrap().total_hits, 0);
    }
}
