use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lucy_core::{Doc, FieldType, Folder, Indexer, IndexerConfig, PolyReader, RamFolder, Schema};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_terms(rng: &mut StdRng, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let len = rng.random_range(3..10);
            (0..len).map(|_| rng.random_range(b'a'..=b'z') as char).collect()
        })
        .collect()
}

fn build_reader(num_docs: usize, vocabulary: &[String], rng: &mut StdRng) -> PolyReader {
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    let mut schema = Schema::new();
    schema.spec_field("body", FieldType::full_text("whitespace")).unwrap();
    let mut indexer = Indexer::open(Some(schema), folder.clone(), None, IndexerConfig::create()).unwrap();
    for _ in 0..num_docs {
        let words: Vec<&str> = (0..20)
            .map(|_| vocabulary[rng.random_range(0..vocabulary.len())].as_str())
            .collect();
        indexer.add_doc(&Doc::new().with_field("body", words.join(" "))).unwrap();
    }
    indexer.commit().unwrap();
    PolyReader::open(folder, None, None).unwrap()
}

fn bench_lexicon_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("Lexicon Seek");
    let mut rng = StdRng::seed_from_u64(17);

    for vocab_size in [1_000, 10_000] {
        let vocabulary = generate_terms(&mut rng, vocab_size);
        let reader = build_reader(2_000, &vocabulary, &mut rng);
        let lex_reader = reader.seg_readers()[0].lexicon_reader().unwrap();
        let targets = generate_terms(&mut rng, 256);

        group.throughput(Throughput::Elements(targets.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(vocab_size), &targets, |b, targets| {
            b.iter(|| {
                let mut lexicon = lex_reader.lexicon("body", None).unwrap().unwrap();
                for target in targets {
                    lexicon.seek(Some(target.as_str())).unwrap();
                    black_box(lexicon.term());
                }
            })
        });
    }
    group.finish();
}

fn bench_posting_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Posting Decode");
    group.sample_size(20);
    let mut rng = StdRng::seed_from_u64(29);
    let vocabulary = generate_terms(&mut rng, 50);

    for num_docs in [1_000, 10_000] {
        let reader = build_reader(num_docs, &vocabulary, &mut rng);
        let plist_reader = reader.seg_readers()[0].posting_list_reader().unwrap();
        let term = vocabulary[0].clone();

        group.throughput(Throughput::Elements(num_docs as u64));
        group.bench_with_input(BenchmarkId::new("next", num_docs), &term, |b, term| {
            b.iter(|| {
                let mut plist = plist_reader.posting_list("body", term).unwrap().unwrap();
                let mut total = 0u64;
                while plist.next().unwrap() != 0 {
                    total += plist.freq() as u64;
                }
                black_box(total)
            })
        });
        group.bench_with_input(BenchmarkId::new("advance", num_docs), &term, |b, term| {
            b.iter(|| {
                let mut plist = plist_reader.posting_list("body", term).unwrap().unwrap();
                let mut target = 1;
                loop {
                    let doc_id = plist.advance(target).unwrap();
                    if doc_id == 0 {
                        break;
                    }
                    target = doc_id + 64;
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lexicon_seek, bench_posting_decode);
criterion_main!(benches);
