use std::sync::Arc;

use crate::error::Result;
use crate::index::seg_reader::SegReader;
use crate::index::sort::SortCache;
use crate::search::collector::Collector;
use crate::search::hit_queue::{HitQueue, MatchDoc, SortRule, SortSpec};

/// Keeps the top hits by score or by a [`SortSpec`], counting every hit.
#[derive(Debug)]
pub struct SortCollector {
    spec: Option<Arc<SortSpec>>,
    queue: HitQueue,
    caches: Vec<Option<Arc<SortCache>>>,
    base: i32,
    total_hits: usize,
    need_score: bool,
}

impl SortCollector {
    pub fn new(spec: Option<SortSpec>, wanted: usize) -> Self {
        let spec = spec.map(Arc::new);
        let need_score = spec.as_ref().is_none_or(|s| s.needs_score());
        SortCollector {
            queue: HitQueue::new(spec.clone(), wanted),
            spec,
            caches: Vec::new(),
            base: 0,
            total_hits: 0,
            need_score,
        }
    }

    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// The retained hits, best first.
    pub fn pop_match_docs(&mut self) -> Vec<MatchDoc> {
        self.queue.pop_all()
    }
}

impl Collector for SortCollector {
    fn collect(&mut self, doc_id: i32, score: f32) -> Result<()> {
        self.total_hits += 1;
        let values = self.spec.as_ref().map(|spec| {
            spec.rules()
                .iter()
                .zip(&self.caches)
                .map(|(rule, cache)| match (rule, cache) {
                    (SortRule::Field { .. }, Some(cache)) => cache.doc_value(doc_id).cloned(),
                    _ => None,
                })
                .collect()
        });
        self.queue.insert(MatchDoc {
            doc_id: doc_id + self.base,
            score,
            values,
        });
        Ok(())
    }

    fn need_score(&self) -> bool {
        self.need_score
    }

    fn set_reader(&mut self, reader: &Arc<SegReader>) {
        self.caches.clear();
        let Some(spec) = self.spec.as_ref() else {
            return;
        };
        let sort_reader = reader.sort_reader();
        for rule in spec.rules() {
            let cache = match rule {
                SortRule::Field { name, .. } => {
                    sort_reader.and_then(|r| r.fetch_sort_cache(name)).cloned()
                }
                _ => None,
            };
            self.caches.push(cache);
        }
    }

    fn set_base(&mut self, base: i32) {
        self.base = base;
    }
}
