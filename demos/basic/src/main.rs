//! Basic taskpool example
//!
//! Demonstrates enqueueing plain tasks and running a balanced `for_each`
//! over a range.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use taskpool::{TaskPoolConfig, ThreadPool};

fn main() {
    println!("=== taskpool basic example ===\n");

    let config = TaskPoolConfig::from_env().worker_count(4).name("basic-demo");
    let pool = ThreadPool::new(config).expect("failed to build thread pool");
    println!("workers: {}, capacity: {}\n", pool.worker_count(), pool.capacity());

    println!("enqueueing a few plain tasks...");
    for i in 0..5 {
        pool.enqueue(move |worker_index| {
            println!("[task {i}] running on worker {worker_index}");
        });
    }
    pool.wait();

    println!("\nsumming 0..10_000 with for_each...");
    let sum = Arc::new(AtomicI64::new(0));
    let s = sum.clone();
    pool.for_each(0, 10_000, move |i| {
        s.fetch_add(i, Ordering::Relaxed);
    });
    pool.wait();
    println!("sum = {}", sum.load(Ordering::Relaxed));

    println!("\ndone.");
}
