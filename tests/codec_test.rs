use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lucy_core::search::{RangeQuery, SortRule, SortSpec};
use lucy_core::store::{CompoundFileReader, CompoundFileWriter};
use lucy_core::{
    Doc, FieldType, FieldValue, Folder, IndexSearcher, Indexer, IndexerConfig, PolyReader,
    RamFolder, Schema,
};

const VOCABULARY: [&str; 12] = [
    "amber", "basalt", "cobalt", "dune", "ember", "fjord", "granite", "heath", "isle", "jade",
    "kelp", "loam",
];

/// term -> (doc id -> freq)
type Expected = BTreeMap<String, BTreeMap<i32, u32>>;

fn build_index(rng: &mut StdRng, num_docs: usize) -> (Arc<dyn Folder>, Expected, Vec<String>) {
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    let mut schema = Schema::new();
    schema.spec_field("text", FieldType::full_text("whitespace")).unwrap();
    schema.spec_field("note", FieldType::string().with_indexed(false)).unwrap();
    let mut indexer = Indexer::open(Some(schema), folder.clone(), None, IndexerConfig::create()).unwrap();

    let mut expected = Expected::new();
    let mut texts = Vec::new();
    for doc_id in 1..=num_docs as i32 {
        let num_words = rng.random_range(1..8);
        let words: Vec<&str> = (0..num_words)
            .map(|_| VOCABULARY[rng.random_range(0..VOCABULARY.len())])
            .collect();
        for word in &words {
            *expected.entry(word.to_string()).or_default().entry(doc_id).or_default() += 1;
        }
        let text = words.join(" ");
        indexer
            .add_doc(&Doc::new().with_field("text", text.as_str()).with_field("note", format!("n{doc_id}")))
            .unwrap();
        texts.push(text);
    }
    indexer.commit().unwrap();
    (folder, expected, texts)
}

#[test]
fn test_lexicon_round_trip() {
    let mut rng = StdRng::seed_from_u64(1);
    let (folder, expected, _) = build_index(&mut rng, 300);
    let reader = PolyReader::open(folder, None, None).unwrap();
    let seg_reader = &reader.seg_readers()[0];
    let lex_reader = seg_reader.lexicon_reader().expect("lexicon component");

    let mut lexicon = lex_reader.lexicon("text", None).unwrap().expect("text lexicon");
    assert_eq!(lexicon.size() as usize, expected.len());
    let mut seen = Vec::new();
    while lexicon.next().unwrap() {
        let term = lexicon.term().unwrap().to_string();
        assert_eq!(lexicon.doc_freq() as usize, expected[&term].len(), "doc freq of {term}");
        seen.push(term);
    }
    let want: Vec<String> = expected.keys().cloned().collect();
    assert_eq!(seen, want);
    assert!(lexicon.term().is_none(), "exhausted lexicon has no term");

    // Seeking lands on the first term at or after the target.
    lexicon.seek(Some("c")).unwrap();
    let first_c = want.iter().find(|term| term.as_str() >= "c").unwrap();
    assert_eq!(lexicon.term(), Some(first_c.as_str()));
    lexicon.seek(Some("jade")).unwrap();
    assert_eq!(lexicon.term(), Some("jade"));

    assert!(lex_reader.lexicon("note", None).unwrap().is_none(), "unindexed field has no lexicon");
}

#[test]
fn test_posting_round_trip() {
    let mut rng = StdRng::seed_from_u64(2);
    let (folder, expected, _) = build_index(&mut rng, 500);
    let reader = PolyReader::open(folder, None, None).unwrap();
    let plist_reader = reader.seg_readers()[0].posting_list_reader().expect("posting component");

    for (term, postings) in &expected {
        let mut plist = plist_reader.posting_list("text", term).unwrap().expect("posting list");
        assert_eq!(plist.doc_freq() as usize, postings.len());
        for (&doc_id, &freq) in postings {
            assert_eq!(plist.next().unwrap(), doc_id, "next doc for {term}");
            assert_eq!(plist.freq(), freq);
            assert_eq!(plist.positions().len(), freq as usize);
        }
        assert_eq!(plist.next().unwrap(), 0);
    }

    // Skipping with advance agrees with the expected postings.
    let (term, postings) = expected.iter().max_by_key(|(_, p)| p.len()).unwrap();
    let target = rng.random_range(1..=500);
    let mut plist = plist_reader.posting_list("text", term).unwrap().unwrap();
    let want = postings.keys().copied().find(|&id| id >= target).unwrap_or(0);
    assert_eq!(plist.advance(target).unwrap(), want);
    assert!(plist_reader.posting_list("text", "zzz").unwrap().is_none());
}

#[test]
fn test_doc_store_round_trip() {
    let mut rng = StdRng::seed_from_u64(3);
    let (folder, _, texts) = build_index(&mut rng, 120);
    let reader = PolyReader::open(folder, None, None).unwrap();
    for _ in 0..30 {
        let doc_id = rng.random_range(1..=texts.len() as i32);
        let doc = reader.fetch_doc(doc_id).unwrap();
        assert_eq!(doc.get("text"), Some(&FieldValue::from(texts[doc_id as usize - 1].as_str())));
        assert_eq!(doc.get("note"), Some(&FieldValue::from(format!("n{doc_id}"))));
    }
}

#[test]
fn test_compound_file_fidelity() {
    let mut rng = StdRng::seed_from_u64(4);
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    folder.mkdir("seg_1").unwrap();

    let mut files = BTreeMap::new();
    for i in 0..10 {
        let len = rng.random_range(0..2000);
        let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        let name = format!("component_{i}.dat");
        let mut out = folder.open_out(&format!("seg_1/{name}")).unwrap();
        out.write_bytes(&bytes).unwrap();
        out.close().unwrap();
        files.insert(name, bytes);
    }
    folder.write_json("seg_1/segmeta.json", &serde_json::json!({"count": 0})).unwrap();

    CompoundFileWriter::new(folder.as_ref(), "seg_1").consolidate().unwrap();
    let compound = CompoundFileReader::open(folder.as_ref(), "seg_1").unwrap();
    for (name, bytes) in &files {
        let path = format!("seg_1/{name}");
        assert!(!folder.exists(&path), "{path} was folded into the compound file");
        assert!(compound.contains(name));

        let mut instream = folder.open_in(&path).unwrap();
        assert_eq!(instream.length() as usize, bytes.len());
        assert_eq!(&instream.read_bytes(bytes.len()).unwrap(), bytes);
    }
    assert!(folder.exists("seg_1/segmeta.json"), "json files stay outside");
    assert!(CompoundFileWriter::new(folder.as_ref(), "seg_1").consolidate().is_err());
}

#[test]
fn test_sorted_and_range_search() {
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    let mut schema = Schema::new();
    schema.spec_field("name", FieldType::string()).unwrap();
    schema.spec_field("price", FieldType::int32().with_sortable(true)).unwrap();
    let mut indexer = Indexer::open(Some(schema), folder.clone(), None, IndexerConfig::create()).unwrap();
    for (name, price) in [("kettle", 30), ("lamp", 12), ("rug", 85), ("vase", 12), ("clock", 47)] {
        indexer
            .add_doc(&Doc::new().with_field("name", name).with_field("price", price))
            .unwrap();
    }
    indexer.commit().unwrap();

    let searcher = IndexSearcher::open(folder).unwrap();
    let range = RangeQuery::new("price", Some(FieldValue::from(12)), Some(FieldValue::from(47)), true, false)
        .unwrap();
    let sort = SortSpec::new(vec![SortRule::field("price")]);
    let hits = searcher.hits(&range, 0, 10, Some(sort)).unwrap();
    assert_eq!(hits.total_hits, 3);

    let names: Vec<FieldValue> = searcher
        .fetch_hits(&hits)
        .unwrap()
        .into_iter()
        .filter_map(|hit| hit.get("name").cloned())
        .collect();
    // Equal prices fall back to doc id order.
    let want: Vec<FieldValue> = ["lamp", "vase", "kettle"].into_iter().map(FieldValue::from).collect();
    assert_eq!(names, want);
}
