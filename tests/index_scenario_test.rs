use std::sync::Arc;

use tempfile::TempDir;

use lucy_core::index::file_names;
use lucy_core::search::{AndQuery, OrQuery, Query, TermQuery};
use lucy_core::{
    BackgroundMerger, Doc, FieldType, FieldValue, Folder, FsFolder, IndexSearcher, Indexer,
    IndexerConfig, PolyReader, RamFolder, Schema,
};

const LOREM: [(&str, &str); 4] = [
    (
        "Lorem ipsum",
        "Lorem ipsum dolor sit amet, consectetur adipisicing elit, sed do eiusmod tempor \
         incididunt ut labore et dolore magna aliqua.",
    ),
    (
        "Ut enim",
        "Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip \
         ex ea commodo consequat.",
    ),
    (
        "Duis aute",
        "Duis aute irure dolor in reprehenderit in voluptate velit essei cillum dolore eu \
         fugiat nulla pariatur.",
    ),
    (
        "Excepteur sint",
        "Excepteur sint occaecat cupidatat non proident, sunt in culpa qui officia deserunt \
         mollit anim id est laborum.",
    ),
];

fn lorem_schema() -> Schema {
    let mut schema = Schema::new();
    schema.spec_field("title", FieldType::full_text("standard")).unwrap();
    schema
        .spec_field("content", FieldType::full_text("standard").with_stored(false))
        .unwrap();
    schema
}

fn count(searcher: &IndexSearcher, query: &dyn Query) -> usize {
    searcher.hits(query, 0, 100, None).unwrap().total_hits
}

#[test]
fn test_lorem_ipsum_scenario() -> lucy_core::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let folder: Arc<dyn Folder> = Arc::new(FsFolder::new(temp_dir.path().join("index")));

    let mut indexer = Indexer::open(Some(lorem_schema()), folder.clone(), None, IndexerConfig::create())?;
    for (title, content) in LOREM {
        indexer.add_doc(&Doc::new().with_field("title", title).with_field("content", content))?;
    }
    indexer.commit()?;

    let searcher = IndexSearcher::open(folder.clone())?;
    let hits = searcher.hits(&TermQuery::new("content", "ullamco"), 0, 10, None)?;
    assert_eq!(hits.total_hits, 1);
    assert_eq!(hits.len(), 1);

    let hit_doc = searcher.fetch_doc(hits.match_docs[0].doc_id)?;
    assert_eq!(hit_doc.get("title"), Some(&FieldValue::from("Ut enim")));
    assert!(hit_doc.get("content").is_none(), "unstored field is not returned");

    assert_eq!(count(&searcher, &TermQuery::new("content", "dolore")), 2);
    assert_eq!(count(&searcher, &TermQuery::new("title", "lorem")), 1);
    Ok(())
}

#[test]
fn test_boolean_queries_against_index() -> lucy_core::Result<()> {
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    let mut indexer = Indexer::open(Some(lorem_schema()), folder.clone(), None, IndexerConfig::create())?;
    for (title, content) in LOREM {
        indexer.add_doc(&Doc::new().with_field("title", title).with_field("content", content))?;
    }
    indexer.commit()?;

    let searcher = IndexSearcher::open(folder)?;
    let both = AndQuery::new(vec![
        Box::new(TermQuery::new("content", "dolor")),
        Box::new(TermQuery::new("content", "dolore")),
    ]);
    assert_eq!(count(&searcher, &both), 2);

    let either = OrQuery::new(vec![
        Box::new(TermQuery::new("content", "ullamco")),
        Box::new(TermQuery::new("content", "laborum")),
    ]);
    assert_eq!(count(&searcher, &either), 2);

    let missing = AndQuery::new(vec![
        Box::new(TermQuery::new("content", "ullamco")),
        Box::new(TermQuery::new("content", "laborum")),
    ]);
    assert_eq!(count(&searcher, &missing), 0);
    Ok(())
}

#[test]
fn test_delete_then_merge_scenario() -> lucy_core::Result<()> {
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    let mut schema = Schema::new();
    schema.spec_field("name", FieldType::string())?;
    schema.spec_field("body", FieldType::full_text("standard"))?;

    // One segment per document.
    for name in ["alpha", "beta", "gamma"] {
        let mut indexer = Indexer::open(Some(schema.clone()), folder.clone(), None, IndexerConfig::create())?;
        indexer.add_doc(&Doc::new().with_field("name", name).with_field("body", "shared words"))?;
        indexer.commit()?;
    }
    let before = PolyReader::open(folder.clone(), None, None)?;
    let docs_before = before.doc_count();
    assert_eq!(docs_before, 3);

    let mut indexer = Indexer::open(None, folder.clone(), None, IndexerConfig::default())?;
    indexer.delete_by_term("name", "beta")?;
    indexer.optimize();
    indexer.commit()?;

    let after = PolyReader::open(folder.clone(), None, None)?;
    assert_eq!(after.seg_readers().len(), 1, "optimize merges everything");
    assert_eq!(after.doc_count(), docs_before - 1);
    assert_eq!(after.del_count(), 0, "merge drops deleted docs");

    let searcher = IndexSearcher::new(Arc::new(after));
    assert_eq!(count(&searcher, &TermQuery::new("name", "beta")), 0);
    assert_eq!(count(&searcher, &TermQuery::new("name", "gamma")), 1);
    assert_eq!(count(&searcher, &TermQuery::new("body", "shared")), 2);
    Ok(())
}

#[test]
fn test_snapshot_generations_increase() -> lucy_core::Result<()> {
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    let mut last_gen = 0;
    for i in 0..5 {
        let mut indexer = Indexer::open(Some(lorem_schema()), folder.clone(), None, IndexerConfig::create())?;
        indexer.add_doc(&Doc::new().with_field("title", format!("doc {i}")))?;
        indexer.commit()?;

        let latest = file_names::latest_snapshot(folder.as_ref())?.expect("committed snapshot");
        let generation = file_names::extract_gen(&latest);
        assert!(generation > last_gen, "{latest} should be newer than gen {last_gen}");
        last_gen = generation;
    }
    let reader = PolyReader::open(folder, None, None)?;
    assert_eq!(reader.doc_count(), 5);
    Ok(())
}

#[test]
fn test_add_index_from_filesystem() -> lucy_core::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let source: Arc<dyn Folder> = Arc::new(FsFolder::new(temp_dir.path().join("source")));
    let mut indexer = Indexer::open(Some(lorem_schema()), source.clone(), None, IndexerConfig::create())?;
    for (title, content) in &LOREM[..2] {
        indexer.add_doc(&Doc::new().with_field("title", *title).with_field("content", *content))?;
    }
    indexer.commit()?;

    let target: Arc<dyn Folder> = Arc::new(FsFolder::new(temp_dir.path().join("target")));
    let mut indexer = Indexer::open(Some(lorem_schema()), target.clone(), None, IndexerConfig::create())?;
    for (title, content) in &LOREM[2..] {
        indexer.add_doc(&Doc::new().with_field("title", *title).with_field("content", *content))?;
    }
    indexer.add_index(source)?;
    indexer.commit()?;

    let searcher = IndexSearcher::open(target)?;
    assert_eq!(searcher.doc_max(), 4);
    assert_eq!(count(&searcher, &TermQuery::new("content", "ullamco")), 1);
    assert_eq!(count(&searcher, &TermQuery::new("content", "laborum")), 1);
    Ok(())
}

#[test]
fn test_background_merge_on_filesystem() -> lucy_core::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let folder: Arc<dyn Folder> = Arc::new(FsFolder::new(temp_dir.path().join("index")));
    for (title, content) in LOREM {
        let mut indexer = Indexer::open(Some(lorem_schema()), folder.clone(), None, IndexerConfig::create())?;
        indexer.add_doc(&Doc::new().with_field("title", title).with_field("content", content))?;
        indexer.commit()?;
    }

    let mut merger = BackgroundMerger::open(folder.clone(), None)?;
    merger.optimize();
    merger.commit()?;

    let reader = PolyReader::open(folder.clone(), None, None)?;
    assert_eq!(reader.seg_readers().len(), 1);
    assert_eq!(reader.doc_count(), 4);

    let searcher = IndexSearcher::new(Arc::new(reader));
    assert_eq!(count(&searcher, &TermQuery::new("content", "ullamco")), 1);

    let snapshots: Vec<String> = folder
        .list("")?
        .into_iter()
        .filter(|entry| file_names::is_snapshot_file(entry))
        .collect();
    assert_eq!(snapshots.len(), 1, "superseded snapshots are purged: {snapshots:?}");
    Ok(())
}
