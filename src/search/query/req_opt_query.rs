use crate::error::Result;
use crate::index::seg_reader::SegReader;
use crate::search::matcher::{Matcher, RequiredOptionalMatcher};
use crate::search::query::{Compiler, Query};
use crate::search::searcher::IndexSearcher;
use crate::search::similarity::Similarity;

/// Matches what `required` matches; documents also matching `optional`
/// score higher.
#[derive(Debug)]
pub struct RequiredOptionalQuery {
    required: Box<dyn Query>,
    optional: Box<dyn Query>,
    boost: f32,
}

impl RequiredOptionalQuery {
    pub fn new(required: Box<dyn Query>, optional: Box<dyn Query>) -> Self {
        RequiredOptionalQuery {
            required,
            optional,
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for RequiredOptionalQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn make_compiler(
        &self,
        searcher: &IndexSearcher,
        boost: f32,
        subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        let mut compiler = RequiredOptionalCompiler {
            required: self.required.make_compiler(searcher, self.required.boost(), true)?,
            optional: self.optional.make_compiler(searcher, self.optional.boost(), true)?,
            boost,
        };
        if !subordinate {
            compiler.normalize();
        }
        Ok(Box::new(compiler))
    }
}

#[derive(Debug)]
pub struct RequiredOptionalCompiler {
    required: Box<dyn Compiler>,
    optional: Box<dyn Compiler>,
    boost: f32,
}

impl Compiler for RequiredOptionalCompiler {
    fn make_matcher(&self, reader: &SegReader, need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        let Some(required) = self.required.make_matcher(reader, need_score)? else {
            return Ok(None);
        };
        if !need_score {
            return Ok(Some(required));
        }
        match self.optional.make_matcher(reader, need_score)? {
            Some(optional) => Ok(Some(Box::new(RequiredOptionalMatcher::new(
                required,
                optional,
                &Similarity::new(),
            )))),
            None => Ok(Some(required)),
        }
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn sum_of_squared_weights(&self) -> f32 {
        let sum = self.required.sum_of_squared_weights() + self.optional.sum_of_squared_weights();
        sum * self.boost * self.boost
    }

    fn apply_norm_factor(&mut self, factor: f32) {
        self.required.apply_norm_factor(factor);
        self.optional.apply_norm_factor(factor);
    }
}
