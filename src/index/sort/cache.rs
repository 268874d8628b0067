use crate::document::FieldValue;

/// The sorted values of one field in one segment, and each document's
/// ordinal into them.
#[derive(Debug, Clone)]
pub struct SortCache {
    field: String,
    ords: Vec<i32>,
    values: Vec<FieldValue>,
}

impl SortCache {
    /// `ords` is indexed by doc id; `values` must be strictly ascending.
    pub fn new<S: Into<String>>(field: S, ords: Vec<i32>, values: Vec<FieldValue>) -> Self {
        SortCache {
            field: field.into(),
            ords,
            values,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Highest doc id covered by the cache.
    pub fn doc_max(&self) -> i32 {
        self.ords.len().saturating_sub(1) as i32
    }

    /// Ordinal of `doc_id`'s value, 0 if it has none.
    pub fn ordinal(&self, doc_id: i32) -> i32 {
        if doc_id < 0 {
            return 0;
        }
        self.ords.get(doc_id as usize).copied().unwrap_or(0)
    }

    pub fn value(&self, ord: i32) -> Option<&FieldValue> {
        if ord < 1 {
            return None;
        }
        self.values.get(ord as usize - 1)
    }

    /// Value of `doc_id`, if it has one.
    pub fn doc_value(&self, doc_id: i32) -> Option<&FieldValue> {
        self.value(self.ordinal(doc_id))
    }

    /// The greatest ordinal whose value is less than or equal to `value`,
    /// 0 if every value is greater.
    pub fn find(&self, value: &FieldValue) -> i32 {
        self.values.partition_point(|v| v <= value) as i32
    }

    /// Number of unique values.
    pub fn cardinality(&self) -> usize {
        self.values.len()
    }
}
