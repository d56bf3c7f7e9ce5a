use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use taskpool::{TaskPoolConfig, ThreadPool};

fn enqueue_single_tasks(c: &mut Criterion) {
    let pool = ThreadPool::new(TaskPoolConfig::new().worker_count(4)).unwrap();
    let counter = Arc::new(AtomicI64::new(0));

    c.bench_function("enqueue_10k_single_tasks", |b| {
        b.iter(|| {
            for _ in 0..10_000 {
                let c = counter.clone();
                pool.enqueue(move || {
                    c.fetch_add(1, Ordering::Relaxed);
                });
            }
            pool.wait();
        });
    });
}

fn for_each_balanced_range(c: &mut Criterion) {
    let pool = ThreadPool::new(TaskPoolConfig::new().worker_count(4)).unwrap();
    let counter = Arc::new(AtomicI64::new(0));

    c.bench_function("for_each_100k_range", |b| {
        b.iter(|| {
            let c = counter.clone();
            pool.for_each(0, 100_000, move |i| {
                c.fetch_add(i, Ordering::Relaxed);
            });
            pool.wait();
        });
    });
}

criterion_group!(benches, enqueue_single_tasks, for_each_balanced_range);
criterion_main!(benches);
