use crate::error::Result;
use crate::index::highlight::DocVector;
use crate::index::seg_reader::SegReader;
use crate::search::matcher::{Matcher, OrMatcher};
use crate::search::query::{
    Compiler, Query, children_highlight_spans, children_sum_of_squared_weights, compile_children,
};
use crate::search::searcher::IndexSearcher;
use crate::search::similarity::Similarity;
use crate::search::span::Span;

/// Matches documents which match any child.
#[derive(Debug)]
pub struct OrQuery {
    children: Vec<Box<dyn Query>>,
    boost: f32,
}

impl OrQuery {
    pub fn new(children: Vec<Box<dyn Query>>) -> Self {
        OrQuery {
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

impl Query for OrQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn make_compiler(
        &self,
        searcher: &IndexSearcher,
        boost: f32,
        subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        let mut compiler = OrCompiler {
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
pub struct OrCompiler {
    children: Vec<Box<dyn Compiler>>,
    boost: f32,
}

impl Compiler for OrCompiler {
    fn make_matcher(&self, reader: &SegReader, need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        let mut kids = Vec::with_capacity(self.children.len());
        for child in &self.children {
            if let Some(matcher) = child.make_matcher(reader, need_score)? {
                kids.push(matcher);
            }
        }
        match kids.len() {
            0 => Ok(None),
            1 => Ok(kids.pop()),
            _ => Ok(Some(Box::new(OrMatcher::new(kids, &Similarity::new())))),
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
