//! Bounded priority queue of the best hits seen so far.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::FieldValue;

/// One criterion of a sort order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SortRule {
    /// Highest score first.
    Score,
    /// Lowest doc id first.
    DocId,
    /// By the value of a sortable field, ascending unless `reverse`.
    /// Documents without a value sort last either way.
    Field { name: String, reverse: bool },
}

impl SortRule {
    pub fn field<S: Into<String>>(name: S) -> Self {
        SortRule::Field {
            name: name.into(),
            reverse: false,
        }
    }

    pub fn field_reversed<S: Into<String>>(name: S) -> Self {
        SortRule::Field {
            name: name.into(),
            reverse: true,
        }
    }
}

/// An ordered list of sort rules. Ties left after the last rule are broken
/// by doc id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    rules: Vec<SortRule>,
}

impl SortSpec {
    pub fn new(rules: Vec<SortRule>) -> Self {
        SortSpec { rules }
    }

    pub fn rules(&self) -> &[SortRule] {
        &self.rules
    }

    pub fn needs_score(&self) -> bool {
        self.rules.iter().any(|rule| matches!(rule, SortRule::Score))
    }
}

/// A hit: index-wide doc id, score and, under a [`SortSpec`], one value per
/// rule (`None` for non-field rules and missing values).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDoc {
    pub doc_id: i32,
    pub score: f32,
    pub values: Option<Vec<Option<FieldValue>>>,
}

impl MatchDoc {
    pub fn new(doc_id: i32, score: f32) -> Self {
        MatchDoc {
            doc_id,
            score,
            values: None,
        }
    }
}

fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>, reverse: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if reverse => b.cmp(a),
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `Less` when `a` ranks ahead of `b`.
pub fn rank(spec: Option<&SortSpec>, a: &MatchDoc, b: &MatchDoc) -> Ordering {
    let Some(spec) = spec else {
        return b
            .score
            .total_cmp(&a.score)
            .then_with(|| a.doc_id.cmp(&b.doc_id));
    };
    for (i, rule) in spec.rules.iter().enumerate() {
        let ord = match rule {
            SortRule::Score => b.score.total_cmp(&a.score),
            SortRule::DocId => a.doc_id.cmp(&b.doc_id),
            SortRule::Field { reverse, .. } => {
                let value_a = a.values.as_ref().and_then(|v| v.get(i)).and_then(Option::as_ref);
                let value_b = b.values.as_ref().and_then(|v| v.get(i)).and_then(Option::as_ref);
                compare_values(value_a, value_b, *reverse)
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.doc_id.cmp(&b.doc_id)
}

#[derive(Debug)]
struct Ranked {
    doc: MatchDoc,
    spec: Option<Arc<SortSpec>>,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    // The heap's top is the weakest hit.
    fn cmp(&self, other: &Self) -> Ordering {
        rank(self.spec.as_deref(), &self.doc, &other.doc)
    }
}

#[derive(Debug)]
pub struct HitQueue {
    spec: Option<Arc<SortSpec>>,
    max_size: usize,
    heap: BinaryHeap<Ranked>,
}

impl HitQueue {
    pub fn new(spec: Option<Arc<SortSpec>>, max_size: usize) -> Self {
        HitQueue {
            spec,
            max_size,
            heap: BinaryHeap::with_capacity(max_size.min(1024) + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Keep `doc` if it is among the best `max_size` so far.
    pub fn insert(&mut self, doc: MatchDoc) -> bool {
        if self.max_size == 0 {
            return false;
        }
        let ranked = Ranked {
            doc,
            spec: self.spec.clone(),
        };
        if self.heap.len() < self.max_size {
            self.heap.push(ranked);
            return true;
        }
        match self.heap.peek() {
            Some(weakest) if ranked < *weakest => {
                self.heap.pop();
                self.heap.push(ranked);
                true
            }
            _ => false,
        }
    }

    /// Drain the queue, best hit first.
    pub fn pop_all(&mut self) -> Vec<MatchDoc> {
        let heap = std::mem::take(&mut self.heap);
        heap.into_sorted_vec().into_iter().map(|ranked| ranked.doc).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_best_by_score() {
        let mut queue = HitQueue::new(None, 3);
        for (doc_id, score) in [(1, 0.5), (2, 2.0), (3, 1.0), (4, 2.0), (5, 0.1)] {
            queue.insert(MatchDoc::new(doc_id, score));
        }
        let ids: Vec<i32> = queue.pop_all().iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![2, 4, 3], "ties broken by ascending doc id");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_field_rules() {
        let spec = Arc::new(SortSpec::new(vec![SortRule::field_reversed("year"), SortRule::Score]));
        let mut queue = HitQueue::new(Some(spec), 10);
        let docs = [
            (1, 1.0, Some(FieldValue::I32(2001))),
            (2, 3.0, None),
            (3, 0.5, Some(FieldValue::I32(2009))),
            (4, 2.0, Some(FieldValue::I32(2001))),
        ];
        for (doc_id, score, year) in docs {
            queue.insert(MatchDoc {
                doc_id,
                score,
                values: Some(vec![year, None]),
            });
        }
        let ids: Vec<i32> = queue.pop_all().iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![3, 4, 1, 2], "missing values sort last");
    }

    #[test]
    fn test_zero_size() {
        let mut queue = HitQueue::new(None, 0);
        assert!(!queue.insert(MatchDoc::new(1, 1.0)));
        assert!(queue.pop_all().is_empty());
    }
}
