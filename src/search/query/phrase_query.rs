use std::fmt;

use crate::error::Result;
use crate::index::highlight::DocVector;
use crate::index::seg_reader::SegReader;
use crate::search::matcher::{Matcher, PhraseMatcher};
use crate::search::query::{Compiler, Query, TermQuery};
use crate::search::searcher::IndexSearcher;
use crate::search::similarity::Similarity;
use crate::search::span::Span;

/// Matches documents whose `field` contains `terms` at consecutive
/// positions.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseQuery {
    field: String,
    terms: Vec<String>,
    boost: f32,
}

impl PhraseQuery {
    pub fn new<F, I, T>(field: F, terms: I) -> Self
    where
        F: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        PhraseQuery {
            field: field.into(),
            terms: terms.into_iter().map(Into::into).collect(),
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

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

impl fmt::Display for PhraseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\"{}\"", self.field, self.terms.join(" "))
    }
}

impl Query for PhraseQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn make_compiler(
        &self,
        searcher: &IndexSearcher,
        boost: f32,
        subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        if let [term] = self.terms.as_slice() {
            return TermQuery::new(self.field.as_str(), term.as_str())
                .with_boost(self.boost)
                .make_compiler(searcher, boost, subordinate);
        }

        let sim = Similarity::new();
        let mut idf = 0.0;
        for term in &self.terms {
            let doc_freq = searcher.doc_freq(&self.field, term)?;
            idf += sim.idf(doc_freq, searcher.doc_max());
        }
        let raw_weight = idf * boost;
        let mut compiler = PhraseCompiler {
            field: self.field.clone(),
            terms: self.terms.clone(),
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
pub struct PhraseCompiler {
    field: String,
    terms: Vec<String>,
    boost: f32,
    idf: f32,
    raw_weight: f32,
    normalized_weight: f32,
}

impl Compiler for PhraseCompiler {
    fn make_matcher(&self, reader: &SegReader, _need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        if self.terms.is_empty() {
            return Ok(None);
        }
        let Some(plist_reader) = reader.posting_list_reader() else {
            return Ok(None);
        };
        let mut plists = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            match plist_reader.posting_list(&self.field, term)? {
                Some(plist) if plist.doc_freq() > 0 => plists.push(plist),
                // Every term must be present in the segment.
                _ => return Ok(None),
            }
        }
        Ok(Some(Box::new(PhraseMatcher::new(plists, self.normalized_weight))))
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
        if self.terms.is_empty() || field != self.field {
            return Ok(Vec::new());
        }
        let mut term_vectors = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            match doc_vec.term_vector(field, term)? {
                Some(term_vector) => term_vectors.push(term_vector),
                None => return Ok(Vec::new()),
            }
        }

        // Start positions from which every later term follows in order.
        let mut starts: Vec<i32> = term_vectors[0].positions().to_vec();
        for (offset, term_vector) in term_vectors.iter().enumerate().skip(1) {
            let positions = term_vector.positions();
            starts.retain(|&start| positions.binary_search(&(start + offset as i32)).is_ok());
        }

        let first = &term_vectors[0];
        let last = &term_vectors[term_vectors.len() - 1];
        let mut spans = Vec::with_capacity(starts.len());
        for start in starts {
            let end_pos = start + term_vectors.len() as i32 - 1;
            let (Ok(first_tick), Ok(last_tick)) = (
                first.positions().binary_search(&start),
                last.positions().binary_search(&end_pos),
            ) else {
                continue;
            };
            let start_offset = first.start_offsets()[first_tick];
            let end_offset = last.end_offsets()[last_tick];
            spans.push(Span::new(start_offset, end_offset - start_offset, self.normalized_weight));
        }
        Ok(spans)
    }
}
