use crate::document::FieldValue;
use crate::error::{IndexError, Result};
use crate::index::seg_reader::SegReader;
use crate::index::sort::SortCache;
use crate::search::matcher::{Matcher, RangeMatcher};
use crate::search::query::{Compiler, Query};
use crate::search::searcher::IndexSearcher;

/// Matches documents whose sortable `field` lies between two values.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    field: String,
    lower: Option<FieldValue>,
    upper: Option<FieldValue>,
    include_lower: bool,
    include_upper: bool,
    boost: f32,
}

impl RangeQuery {
    /// At least one bound is required.
    pub fn new<S: Into<String>>(
        field: S,
        lower: Option<FieldValue>,
        upper: Option<FieldValue>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        if lower.is_none() && upper.is_none() {
            return Err(IndexError::invalid_argument(
                "RangeQuery needs a lower or an upper bound",
            ));
        }
        Ok(RangeQuery {
            field: field.into(),
            lower,
            upper,
            include_lower,
            include_upper,
            boost: 1.0,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Query for RangeQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn make_compiler(
        &self,
        _searcher: &IndexSearcher,
        boost: f32,
        subordinate: bool,
    ) -> Result<Box<dyn Compiler>> {
        let mut compiler = RangeCompiler {
            query: self.clone(),
            boost,
        };
        if !subordinate {
            compiler.normalize();
        }
        Ok(Box::new(compiler))
    }
}

#[derive(Debug)]
pub struct RangeCompiler {
    query: RangeQuery,
    boost: f32,
}

impl RangeCompiler {
    fn lower_bound(&self, cache: &SortCache) -> i32 {
        let Some(lower) = &self.query.lower else {
            return 1;
        };
        let ord = cache.find(lower);
        if ord == 0 {
            return 1;
        }
        let exact = cache.value(ord) == Some(lower);
        if exact && self.query.include_lower { ord } else { ord + 1 }
    }

    fn upper_bound(&self, cache: &SortCache) -> i32 {
        let Some(upper) = &self.query.upper else {
            return i32::MAX;
        };
        let ord = cache.find(upper);
        if ord == 0 {
            return 0;
        }
        let exact = cache.value(ord) == Some(upper);
        if exact && !self.query.include_upper { ord - 1 } else { ord }
    }
}

impl Compiler for RangeCompiler {
    fn make_matcher(&self, reader: &SegReader, _need_score: bool) -> Result<Option<Box<dyn Matcher>>> {
        let Some(cache) = reader
            .sort_reader()
            .and_then(|r| r.fetch_sort_cache(&self.query.field))
        else {
            return Ok(None);
        };
        let lower = self.lower_bound(cache);
        let upper = self.upper_bound(cache);
        if lower > upper {
            return Ok(None);
        }
        Ok(Some(Box::new(RangeMatcher::new(cache.clone(), lower, upper, reader.doc_max()))))
    }

    fn boost(&self) -> f32 {
        self.boost
    }
}
