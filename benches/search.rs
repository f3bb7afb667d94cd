use coach_rag::vector_db::{
    Collection, CollectionManager, IndexSpec, IngestionPipeline, InMemoryVectorStore, MetricType,
    SearchEngine, VectorStore,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

const DIMENSION: usize = 128;
const ROWS: usize = 5_000;

fn generate_test_vectors(count: usize, dimension: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| {
            (0..dimension)
                .map(|j| ((i as f32 * 0.1 + j as f32 * 0.01).sin() * 0.5 + 0.5) * 2.0 - 1.0)
                .collect()
        })
        .collect()
}

fn loaded_collection(name: &str, spec: IndexSpec, vectors: &[Vec<f32>]) -> (SearchEngine, Collection) {
    tokio_test::block_on(async {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let manager = CollectionManager::new(store.clone());
        let ingestion = IngestionPipeline::new(store.clone());

        let collection = manager.ensure_collection(name, DIMENSION).await.unwrap();
        ingestion.insert(&collection, vectors.to_vec()).await.unwrap();
        manager.build_index(&collection, &spec).await.unwrap();
        manager.load(&collection).await.unwrap();

        (SearchEngine::new(store).with_default_nprobe(10), collection)
    })
}

fn bench_search(c: &mut Criterion) {
    let vectors = generate_test_vectors(ROWS, DIMENSION);
    let query = vectors[ROWS / 2].clone();
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("search_top5");

    for (label, spec) in [
        ("flat_l2", IndexSpec::flat(MetricType::L2)),
        ("flat_ip", IndexSpec::flat(MetricType::Ip)),
        ("ivf_flat_ip", IndexSpec::ivf_flat(MetricType::Ip, 64)),
    ] {
        let (engine, collection) = loaded_collection(label, spec, &vectors);
        group.bench_function(label, |b| {
            b.to_async(&runtime).iter(|| async {
                black_box(
                    engine
                        .search(&collection, black_box(query.clone()), 5)
                        .await
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
