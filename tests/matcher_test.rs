use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lucy_core::index::SortCache;
use lucy_core::search::matcher::{
    AndMatcher, BitVecMatcher, MatchAllMatcher, NotMatcher, OrMatcher, RangeMatcher,
    RequiredOptionalMatcher, SeriesMatcher, TermMatcher,
};
use lucy_core::search::{BitCollector, Matcher, Similarity, collect};
use lucy_core::util::BitVector;
use lucy_core::{
    Doc, FieldType, FieldValue, Folder, Indexer, IndexerConfig, PolyReader, RamFolder, Schema,
};

/// And, Or, Not, RequiredOptional, Series, Range, MatchAll and BitVec.
const NUM_KINDS: usize = 8;

/// Cursor over a sorted list of doc ids, each scoring 1.0.
#[derive(Debug)]
struct ListMatcher {
    doc_ids: Vec<i32>,
    tick: usize,
}

impl ListMatcher {
    fn boxed(doc_ids: &[i32]) -> Box<dyn Matcher> {
        Box::new(ListMatcher {
            doc_ids: doc_ids.to_vec(),
            tick: 0,
        })
    }
}

impl Matcher for ListMatcher {
    fn next(&mut self) -> lucy_core::Result<i32> {
        self.tick += 1;
        Ok(self.doc_id())
    }

    fn doc_id(&self) -> i32 {
        match self.tick {
            0 => 0,
            tick => self.doc_ids.get(tick - 1).copied().unwrap_or(0),
        }
    }

    fn score(&mut self) -> lucy_core::Result<f32> {
        Ok(1.0)
    }
}

fn random_doc_ids(rng: &mut StdRng, doc_max: i32, density: f64) -> Vec<i32> {
    (1..=doc_max).filter(|_| rng.random_bool(density)).collect()
}

fn drain(matcher: &mut dyn Matcher) -> Vec<i32> {
    let mut doc_ids = Vec::new();
    loop {
        let doc_id = matcher.next().unwrap();
        if doc_id == 0 {
            return doc_ids;
        }
        doc_ids.push(doc_id);
    }
}

fn bit_vector(doc_ids: &[i32], doc_max: i32) -> BitVector {
    let mut bits = BitVector::new(doc_max as usize + 1);
    for &doc_id in doc_ids {
        bits.set(doc_id as usize);
    }
    bits
}

/// Number of lists holding each doc id, used as its sort ordinal.
fn list_counts(lists: &[Vec<i32>], doc_max: i32) -> Vec<i32> {
    let mut counts = vec![0; doc_max as usize + 1];
    for list in lists {
        for &doc_id in list {
            counts[doc_id as usize] += 1;
        }
    }
    counts
}

fn build(kind: usize, lists: &[Vec<i32>], doc_max: i32) -> Box<dyn Matcher> {
    let sim = Similarity::new();
    let kids = || lists.iter().map(|list| ListMatcher::boxed(list)).collect();
    match kind {
        0 => Box::new(AndMatcher::new(kids(), &sim)),
        1 => Box::new(OrMatcher::new(kids(), &sim)),
        2 => Box::new(NotMatcher::new(ListMatcher::boxed(&lists[0]), doc_max)),
        3 => Box::new(RequiredOptionalMatcher::new(
            ListMatcher::boxed(&lists[0]),
            ListMatcher::boxed(&lists[1]),
            &sim,
        )),
        4 => {
            // Three segments, the middle one without a matcher.
            let first_end = doc_max / 3;
            let second_end = 2 * doc_max / 3;
            let local = |lo: i32, hi: i32| -> Vec<i32> {
                lists[0].iter().filter(|&&id| id > lo && id <= hi).map(|id| id - lo).collect()
            };
            let matchers = vec![
                Some(ListMatcher::boxed(&local(0, first_end))),
                None,
                Some(ListMatcher::boxed(&local(second_end, doc_max))),
            ];
            Box::new(SeriesMatcher::new(matchers, vec![0, first_end, second_end]))
        }
        5 => {
            let values = (1..=3).map(|v| FieldValue::I32(v * 10)).collect();
            let cache = SortCache::new("overlap", list_counts(lists, doc_max), values);
            Box::new(RangeMatcher::new(Arc::new(cache), 2, 3, doc_max))
        }
        6 => Box::new(MatchAllMatcher::new(1.0, doc_max)),
        _ => Box::new(BitVecMatcher::new(Arc::new(bit_vector(&lists[0], doc_max)))),
    }
}

fn expected(kind: usize, lists: &[Vec<i32>], doc_max: i32) -> Vec<i32> {
    let sets: Vec<BTreeSet<i32>> = lists.iter().map(|list| list.iter().copied().collect()).collect();
    match kind {
        0 => (1..=doc_max).filter(|id| sets.iter().all(|set| set.contains(id))).collect(),
        1 => (1..=doc_max).filter(|id| sets.iter().any(|set| set.contains(id))).collect(),
        2 => (1..=doc_max).filter(|id| !sets[0].contains(id)).collect(),
        4 => {
            let (first_end, second_end) = (doc_max / 3, 2 * doc_max / 3);
            lists[0]
                .iter()
                .copied()
                .filter(|&id| id <= first_end || id > second_end)
                .collect()
        }
        5 => {
            let counts = list_counts(lists, doc_max);
            (1..=doc_max).filter(|&id| counts[id as usize] >= 2).collect()
        }
        6 => (1..=doc_max).collect(),
        _ => lists[0].clone(),
    }
}

/// Drive `matcher` with a random mix of `next` and `advance`, checking each
/// step against a plain scan of `want`.
fn check_interleaved(rng: &mut StdRng, matcher: &mut dyn Matcher, want: &[i32], context: &str) {
    // Last doc id returned; i32::MAX once the reference is exhausted.
    let mut current = 0;
    for step in 0..60 {
        let use_advance = rng.random_bool(0.5);
        let target = if use_advance {
            // Targets at, below and beyond the current doc id.
            let base = if current == i32::MAX { 1 } else { current };
            (base + rng.random_range(-3..25)).max(1)
        } else {
            current.saturating_add(1)
        };
        let floor = target.max(current.saturating_add(1));
        let reference = want.iter().copied().find(|&id| id >= floor).unwrap_or(0);

        let got = if use_advance {
            matcher.advance(target).unwrap()
        } else {
            matcher.next().unwrap()
        };
        let op = if use_advance { format!("advance({target})") } else { "next()".to_string() };
        assert_eq!(got, reference, "{context}, step {step}: {op} after {current}");
        assert_eq!(matcher.doc_id(), got, "{context}, step {step}: doc_id after {op}");
        current = if got == 0 { i32::MAX } else { got };
    }
}

#[test]
fn test_matchers_strictly_increase() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for round in 0..40 {
        let doc_max = rng.random_range(1..300);
        let lists: Vec<Vec<i32>> = (0..3).map(|_| random_doc_ids(&mut rng, doc_max, 0.3)).collect();
        for kind in 0..NUM_KINDS {
            let mut matcher = build(kind, &lists, doc_max);
            let doc_ids = drain(matcher.as_mut());
            assert!(
                doc_ids.windows(2).all(|pair| pair[0] < pair[1]),
                "round {round}, kind {kind}: {doc_ids:?}"
            );
            assert_eq!(doc_ids, expected(kind, &lists, doc_max), "round {round}, kind {kind}");
        }
    }
}

#[test]
fn test_advance_agrees_with_next() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..40 {
        let doc_max = rng.random_range(2..200);
        let lists: Vec<Vec<i32>> = (0..2).map(|_| random_doc_ids(&mut rng, doc_max, 0.4)).collect();
        let target = rng.random_range(1..=doc_max);
        for kind in 0..NUM_KINDS {
            let want = expected(kind, &lists, doc_max)
                .into_iter()
                .find(|&id| id >= target)
                .unwrap_or(0);
            let mut matcher = build(kind, &lists, doc_max);
            assert_eq!(matcher.advance(target).unwrap(), want, "kind {kind}, target {target}");
        }
    }
}

#[test]
fn test_interleaved_next_and_advance() {
    let mut rng = StdRng::seed_from_u64(0xadd);
    for round in 0..50 {
        let doc_max = rng.random_range(3..250);
        let density = rng.random_range(0.05..0.6);
        let lists: Vec<Vec<i32>> =
            (0..3).map(|_| random_doc_ids(&mut rng, doc_max, density)).collect();
        for kind in 0..NUM_KINDS {
            let want = expected(kind, &lists, doc_max);
            let mut matcher = build(kind, &lists, doc_max);
            let context = format!("round {round}, kind {kind}");
            check_interleaved(&mut rng, matcher.as_mut(), &want, &context);
        }
    }
}

/// Index `num_docs` documents, each holding a random subset of three terms,
/// and return the doc ids per term.
fn term_index(rng: &mut StdRng, num_docs: i32) -> (Arc<dyn Folder>, Vec<Vec<i32>>) {
    let terms = ["red", "green", "blue"];
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    let mut schema = Schema::new();
    schema.spec_field("color", FieldType::full_text("whitespace")).unwrap();
    let mut indexer = Indexer::open(Some(schema), folder.clone(), None, IndexerConfig::create()).unwrap();

    let mut postings = vec![Vec::new(); terms.len()];
    let densities = [0.9, 0.4, 0.05];
    for doc_id in 1..=num_docs {
        let mut words = vec!["grey"];
        for (tick, term) in terms.iter().enumerate() {
            if rng.random_bool(densities[tick]) {
                words.push(*term);
                postings[tick].push(doc_id);
            }
        }
        indexer.add_doc(&Doc::new().with_field("color", words.join(" "))).unwrap();
    }
    indexer.commit().unwrap();
    (folder, postings)
}

#[test]
fn test_term_matcher_over_posting_lists() {
    let mut rng = StdRng::seed_from_u64(0x7e4);
    let (folder, postings) = term_index(&mut rng, 400);
    let reader = PolyReader::open(folder, None, None).unwrap();
    assert_eq!(reader.seg_readers().len(), 1);
    let seg_reader = &reader.seg_readers()[0];
    let plist_reader = seg_reader.posting_list_reader().unwrap();

    for (tick, term) in ["red", "green", "blue"].into_iter().enumerate() {
        let plist = plist_reader.posting_list("color", term).unwrap().unwrap();
        let mut matcher = TermMatcher::new(plist, 1.0);
        assert_eq!(drain(&mut matcher), postings[tick], "drain {term}");

        for round in 0..20 {
            let plist = plist_reader.posting_list("color", term).unwrap().unwrap();
            let mut matcher = TermMatcher::new(plist, 1.0);
            let context = format!("{term}, round {round}");
            check_interleaved(&mut rng, &mut matcher, &postings[tick], &context);
        }
    }
    assert!(plist_reader.posting_list("color", "mauve").unwrap().is_none());
}

#[test]
fn test_and_or_coordination() {
    let sim = Similarity::new();

    let mut and = AndMatcher::new(vec![ListMatcher::boxed(&[7]), ListMatcher::boxed(&[7])], &sim);
    assert_eq!(and.next().unwrap(), 7);
    assert_eq!(and.score().unwrap(), 2.0, "full match keeps coord at 1.0");
    assert_eq!(and.next().unwrap(), 0);

    let mut and = AndMatcher::new(vec![ListMatcher::boxed(&[7]), ListMatcher::boxed(&[])], &sim);
    assert_eq!(and.next().unwrap(), 0);

    let mut or = OrMatcher::new(vec![ListMatcher::boxed(&[7]), ListMatcher::boxed(&[])], &sim);
    assert_eq!(or.next().unwrap(), 7);
    let partial = or.score().unwrap();
    assert!(partial > 0.0 && partial < 1.0, "half overlap is penalized: {partial}");

    let mut or = OrMatcher::new(vec![ListMatcher::boxed(&[7]), ListMatcher::boxed(&[7])], &sim);
    assert_eq!(or.next().unwrap(), 7);
    assert_eq!(or.score().unwrap(), 2.0);
}

#[test]
fn test_collect_skips_deleted_docs() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let doc_max = rng.random_range(1..500);
        let hits = random_doc_ids(&mut rng, doc_max, 0.5);
        let deleted = random_doc_ids(&mut rng, doc_max, 0.2);

        let mut deldocs = BitVector::new(doc_max as usize + 1);
        for &doc_id in &deleted {
            deldocs.set(doc_id as usize);
        }
        let mut deletions = BitVecMatcher::new(Arc::new(deldocs));
        let mut collector = BitCollector::new(doc_max as usize + 1);
        let mut matcher = ListMatcher::boxed(&hits);
        collect(matcher.as_mut(), &mut collector, Some(&mut deletions)).unwrap();

        let collected: Vec<i32> = collector.bit_vector().iter_ones().map(|tick| tick as i32).collect();
        let want: Vec<i32> = hits.iter().copied().filter(|id| !deleted.contains(id)).collect();
        assert_eq!(collected, want);
    }
}
