use std::sync::Arc;

use crate::document::HitDoc;
use crate::error::Result;
use crate::index::highlight::DocVector;
use crate::index::poly_reader::PolyReader;
use crate::search::collector::Collector;
use crate::search::hit_queue::{MatchDoc, SortSpec};
use crate::search::matcher::{self, Matcher};
use crate::search::query::Query;
use crate::search::sort_collector::SortCollector;
use crate::store::Folder;

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hits {
    /// Number of live documents matching the query.
    pub total_hits: usize,
    /// The requested page, best first, with index-wide doc ids.
    pub match_docs: Vec<MatchDoc>,
}

impl Hits {
    pub fn len(&self) -> usize {
        self.match_docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.match_docs.is_empty()
    }
}

/// Runs queries against a point-in-time view of an index.
#[derive(Debug, Clone)]
pub struct IndexSearcher {
    reader: Arc<PolyReader>,
}

impl IndexSearcher {
    pub fn new(reader: Arc<PolyReader>) -> Self {
        IndexSearcher { reader }
    }

    /// Search the most recent snapshot of the index in `folder`.
    pub fn open(folder: Arc<dyn Folder>) -> Result<Self> {
        let reader = PolyReader::open(folder, None, None)?;
        Ok(IndexSearcher::new(Arc::new(reader)))
    }

    pub fn reader(&self) -> &Arc<PolyReader> {
        &self.reader
    }

    pub fn doc_max(&self) -> i32 {
        self.reader.doc_max()
    }

    /// Number of documents (deleted ones included) containing `term`.
    pub fn doc_freq(&self, field: &str, term: &str) -> Result<u32> {
        self.reader.doc_freq(field, term)
    }

    /// The stored fields of a document by index-wide id.
    pub fn fetch_doc(&self, doc_id: i32) -> Result<HitDoc> {
        let doc = self.reader.fetch_doc(doc_id)?;
        Ok(HitDoc {
            doc_id,
            score: 0.0,
            doc,
        })
    }

    /// Term vectors of a document's highlightable fields.
    pub fn fetch_doc_vec(&self, doc_id: i32) -> Result<DocVector> {
        self.reader.fetch_doc_vec(doc_id)
    }

    /// Stored fields for every hit of a page, scores attached.
    pub fn fetch_hits(&self, hits: &Hits) -> Result<Vec<HitDoc>> {
        hits.match_docs
            .iter()
            .map(|match_doc| {
                let mut hit = self.fetch_doc(match_doc.doc_id)?;
                hit.score = match_doc.score;
                Ok(hit)
            })
            .collect()
    }

    /// Feed every live document matching `query` to `collector`, segment by
    /// segment.
    pub fn collect(&self, query: &dyn Query, collector: &mut dyn Collector) -> Result<()> {
        let compiler = query.make_compiler(self, query.boost(), false)?;
        let need_score = collector.need_score();
        let offsets = self.reader.offsets();
        for (tick, seg_reader) in self.reader.seg_readers().iter().enumerate() {
            collector.set_reader(seg_reader);
            collector.set_base(offsets[tick]);
            let Some(mut matcher) = compiler.make_matcher(seg_reader, need_score)? else {
                continue;
            };
            let mut deletions = seg_reader
                .deletions_reader()
                .filter(|d| d.del_count() > 0)
                .map(|d| d.iterator());
            matcher::collect(
                matcher.as_mut(),
                collector,
                deletions.as_mut().map(|d| d as &mut dyn Matcher),
            )?;
        }
        Ok(())
    }

    /// The `num_wanted` best hits after skipping `offset`, ranked by score
    /// or by `sort_spec`.
    pub fn hits(
        &self,
        query: &dyn Query,
        offset: usize,
        num_wanted: usize,
        sort_spec: Option<SortSpec>,
    ) -> Result<Hits> {
        let mut collector = SortCollector::new(sort_spec, offset + num_wanted);
        self.collect(query, &mut collector)?;
        let match_docs = collector.pop_match_docs().into_iter().skip(offset).collect();
        log::trace!("Query {query:?} matched {} docs", collector.total_hits());
        Ok(Hits {
            total_hits: collector.total_hits(),
            match_docs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;
    use crate::search::collector::BitCollector;
    use crate::search::hit_queue::SortRule;
    use crate::search::query::tests::searcher_for;
    use crate::search::query::{MatchAllQuery, TermQuery};

    #[test]
    fn test_paging() {
        let searcher = searcher_for(&[
            ("lorem", 2001),
            ("lorem lorem", 2002),
            ("lorem lorem lorem", 2003),
            ("ipsum", 2004),
        ]);
        let query = TermQuery::new("content", "lorem");
        let first = searcher.hits(&query, 0, 2, None).unwrap();
        assert_eq!(first.total_hits, 3);
        let ids: Vec<i32> = first.match_docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![3, 2]);

        let second = searcher.hits(&query, 2, 2, None).unwrap();
        assert_eq!(second.total_hits, 3);
        let ids: Vec<i32> = second.match_docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![1]);

        let docs = searcher.fetch_hits(&first).unwrap();
        assert_eq!(docs[0].get("content"), Some(&FieldValue::from("lorem lorem lorem")));
        assert!(docs[0].score > docs[1].score);
    }

    #[test]
    fn test_sorted_by_field() {
        let searcher = searcher_for(&[("a", 2003), ("b", 2001), ("c", 2002)]);
        let spec = SortSpec::new(vec![SortRule::field("year")]);
        let hits = searcher.hits(&MatchAllQuery::new(), 0, 10, Some(spec)).unwrap();
        let ids: Vec<i32> = hits.match_docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let spec = SortSpec::new(vec![SortRule::field_reversed("year")]);
        let hits = searcher.hits(&MatchAllQuery::new(), 0, 10, Some(spec)).unwrap();
        let ids: Vec<i32> = hits.match_docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_collect_into_bits() {
        let searcher = searcher_for(&[("x y", 1), ("y", 2), ("x", 3)]);
        let mut collector = BitCollector::new(8);
        searcher.collect(&TermQuery::new("content", "x"), &mut collector).unwrap();
        let hits: Vec<usize> = collector.bit_vector().iter_ones().collect();
        assert_eq!(hits, vec![1, 3]);
        assert_eq!(searcher.doc_freq("content", "y").unwrap(), 2);
        assert_eq!(searcher.doc_max(), 3);
    }
}
