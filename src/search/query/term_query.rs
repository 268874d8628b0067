use crate::error::Result;
use crate::index::highlight::DocVector;
use crate::index::seg_reader::SegReader;
use crate::search::matcher::{Matcher, TermMatcher};
use crate::search::query::{Compiler, Query};
use crate::search::searcher::IndexSearcher;
use crate::search::similarity::Similarity;
use crate::search::span::Span;

/// Matches documents whose `field` contains `term` exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    field: String,
    term: String,
    boost: f32,
}

impl TermQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

impl Query for TermQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn make_compiler(
        &self,
        searcher: &IndexSearcher,
        boost: f32,
        subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        let sim = Similarity::new();
        let doc_freq = searcher.doc_freq(&self.field, &self.term)?;
        let idf = sim.idf(doc_freq, searcher.doc_max());
        let raw_weight = idf * boost;
        let mut compiler = TermCompiler {
            field: self.field.clone(),
            term: self.term.clone(),
            boost,
            idf,
            raw_weight,
            normalized_weight: raw_weight * idf,
        };
        if !subordinate {
            compiler.normalize();
        }
        Ok(Box::new(compiler))
    }
}

#[derive(Debug)]
pub struct TermCompiler {
    field: String,
    term: String,
    boost: f32,
    idf: f32,
    raw_weight: f32,
    normalized_weight: f32,
}

impl Compiler for TermCompiler {
    fn make_matcher(&self, reader: &SegReader, _need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        let Some(plist_reader) = reader.posting_list_reader() else {
            return Ok(None);
        };
        let plist = plist_reader.posting_list(&self.field, &self.term)?;
        Ok(plist.map(|plist| Box::new(TermMatcher::new(plist, self.normalized_weight)) as Box<dyn Matcher>))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn weight(&self) -> f32 {
        self.normalized_weight
    }

    fn sum_of_squared_weights(&self) -> f32 {
        self.raw_weight * self.raw_weight
    }

    fn apply_norm_factor(&mut self, factor: f32) {
        self.normalized_weight = self.raw_weight * self.idf * factor;
    }

    fn highlight_spans(&self, doc_vec: &DocVector, field: &str) -> Result<Vec<Span>> {
        if field != self.field {
            return Ok(Vec::new());
        }
        let Some(term_vector) = doc_vec.term_vector(field, &self.term)? else {
            return Ok(Vec::new());
        };
        Ok(term_vector
            .start_offsets()
            .iter()
            .zip(term_vector.end_offsets())
            .map(|(&start, &end)| Span::new(start, end - start, self.normalized_weight))
            .collect())
    }
}
