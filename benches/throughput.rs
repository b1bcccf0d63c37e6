use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion};
use boolmatch::{field, Criteria, Document, IndexGroup};

fn build_shared_group() -> (Arc<IndexGroup>, Document) {
    let group = IndexGroup::new("throughput");
    for i in 0..5_000_i64 {
        let criteria = Criteria::dnf(&format!("c{i}"))
            .clause(|c| {
                c.with(field("segment").eq(i % 100).with_weight(1.0))
                    .with(field("region").is_in(["eu", "us"]))
                    .with(!field("blocked").eq(true))
            })
            .build()
            .unwrap();
        group.add_criteria(criteria).unwrap();
    }
    let doc = Document::new().set("segment", 7_i64).set("region", "eu");
    (Arc::new(group), doc)
}

fn bench_throughput(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];

    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(5));

    let (index, doc) = build_shared_group();
    for &threads in &thread_counts {
        group.bench_function(format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let index = Arc::clone(&index);
                        let doc = doc.clone();
                        thread::spawn(move || {
                            let start = Instant::now();
                            for _ in 0..per_thread {
                                let _ = index.search(&doc);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .max()
                    .unwrap_or(Duration::ZERO)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_throughput);
criterion_main!(benches);
