use criterion::{Criterion, criterion_group, criterion_main};
use portfolio_search::content::RawRecord;
use portfolio_search::embeddings::HashingEmbedder;
use portfolio_search::index::{SearchableRecord, VectorIndex};
use portfolio_search::search::rank;
use serde_json::Map;
use std::hint::black_box;

const TOPICS: [&str; 6] = [
    "distributed caches and eviction strategies",
    "async runtimes and executors",
    "weather dashboards with simple charts",
    "compilers, parsers and type checkers",
    "database indexing and query planning",
    "interactive canvas animations",
];

fn build_index(embedder: &HashingEmbedder, size: usize) -> VectorIndex {
    let mut index = VectorIndex::new();
    for i in 0..size {
        let record = RawRecord {
            source_id: if i % 2 == 0 { "blog" } else { "portfolio" }.to_string(),
            title: format!("Entry {i}"),
            secondary_text: vec![TOPICS[i % TOPICS.len()].to_string()],
            metadata: Map::new(),
        };
        let embedding = embedder.embed_text(&record.embedding_input());
        index
            .add(SearchableRecord::new(record, embedding))
            .expect("bench records share one dimension");
    }
    index
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let embedder = HashingEmbedder::new(384);
    let query = embedder.embed_text("caching eviction strategies");

    for size in [100, 1_000] {
        let index = build_index(&embedder, size);
        c.bench_function(&format!("rank_{size}"), |b| {
            b.iter(|| rank(black_box(&index), black_box(&query), black_box(10)))
        });
    }

    c.bench_function("embed_query", |b| {
        b.iter(|| embedder.embed_text(black_box("caching eviction strategies")))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
