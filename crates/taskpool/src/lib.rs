//! # taskpool
//!
//! A fixed-size, allocation-free worker thread pool: bounded per-worker ring
//! queues, cross-queue work stealing, and a balanced `for_each` partitioner
//! for fan-out work.
//!
//! ## Quick start
//!
//! ```ignore
//! use taskpool::{TaskPoolConfig, ThreadPool};
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! let pool = ThreadPool::new(TaskPoolConfig::new().worker_count(4)).unwrap();
//!
//! let sum = Arc::new(AtomicI64::new(0));
//! let s = sum.clone();
//! pool.for_each(0, 1000, move |i| {
//!     s.fetch_add(i, Ordering::Relaxed);
//! });
//! pool.wait();
//! assert_eq!(sum.load(Ordering::Relaxed), (0..1000).sum());
//! ```
//!
//! `taskpool-core` and `taskpool-runtime` hold the actual implementation
//! (task-cell type erasure, the ring queue, the worker loop, the
//! dispatcher); this crate wraps [`taskpool_runtime::ThreadPool`] with the
//! ergonomic overloads described in its task contract — `enqueue` accepts
//! both a bare `FnOnce()` and a `FnOnce(usize)` that wants its worker index,
//! and `for_each`'s element closure may likewise ignore or take the batch
//! index.

pub use taskpool_core::error::{Result, TaskPoolError};
pub use taskpool_runtime::config::TaskPoolConfig;

/// Marks which call signature a task closure was written against, so
/// [`ThreadPool::enqueue`] can accept either without the caller naming the
/// difference. Mirrors the marker-trait overload pattern common in
/// callback-heavy frameworks (e.g. axum's `Handler`).
pub trait Task<Marker>: Send + 'static {
    fn run(self, worker_index: usize);
}

#[doc(hidden)]
pub struct NoWorkerIndex;
#[doc(hidden)]
pub struct WithWorkerIndex;

impl<F> Task<NoWorkerIndex> for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self, _worker_index: usize) {
        self()
    }
}

impl<F> Task<WithWorkerIndex> for F
where
    F: FnOnce(usize) + Send + 'static,
{
    fn run(self, worker_index: usize) {
        self(worker_index)
    }
}

/// Same overload trick for `for_each`'s per-element closure: `Fn(T)` or
/// `Fn(T, usize)` (batch index), caller's choice.
pub trait ElementFn<T, Marker>: Send + Sync + 'static {
    fn call(&self, item: T, batch_index: usize);
}

#[doc(hidden)]
pub struct ElemOnly;
#[doc(hidden)]
pub struct ElemWithBatch;

impl<T, F> ElementFn<T, ElemOnly> for F
where
    F: Fn(T) + Send + Sync + 'static,
{
    fn call(&self, item: T, _batch_index: usize) {
        self(item)
    }
}

impl<T, F> ElementFn<T, ElemWithBatch> for F
where
    F: Fn(T, usize) + Send + Sync + 'static,
{
    fn call(&self, item: T, batch_index: usize) {
        self(item, batch_index)
    }
}

/// A fixed-size, allocation-free worker thread pool.
///
/// Thin wrapper over [`taskpool_runtime::ThreadPool`] adding the ergonomic
/// `enqueue`/`for_each` overloads; see the crate docs for a usage example.
pub struct ThreadPool(taskpool_runtime::ThreadPool);

impl ThreadPool {
    /// Build a pool from a resolved [`TaskPoolConfig`].
    pub fn new(config: TaskPoolConfig) -> Result<Self> {
        Ok(ThreadPool(taskpool_runtime::ThreadPool::new(config)?))
    }

    /// Enqueue a task. Accepts either `FnOnce()` or `FnOnce(usize)` (the
    /// index of the worker that ends up running it).
    pub fn enqueue<F, M>(&self, f: F)
    where
        F: Task<M>,
    {
        self.0.enqueue(move |worker_index| f.run(worker_index));
    }

    /// Enqueue a task by reference rather than by value, for large
    /// callables that don't fit the 64-byte inline cell.
    ///
    /// # Safety
    ///
    /// See [`taskpool_runtime::ThreadPool::enqueue_ref`].
    pub unsafe fn enqueue_ref<T>(&self, callable: &T)
    where
        T: Fn(usize) + Sync,
    {
        unsafe { self.0.enqueue_ref(callable) }
    }

    /// Block until every previously enqueued task (including `for_each`
    /// batches) has completed.
    pub fn wait(&self) {
        self.0.wait();
    }

    pub fn worker_count(&self) -> usize {
        self.0.worker_count()
    }

    /// Total task-cell capacity across every worker's queue.
    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    /// Invoke `f` once for every integer in `[start, end)`, split into
    /// balanced batches across the pool's workers. `f` may take just the
    /// item or the item plus its batch index.
    pub fn for_each<F, M>(&self, start: i64, end: i64, f: F)
    where
        F: ElementFn<i64, M>,
    {
        self.0.for_each_range_indexed(start, end, move |item, batch| f.call(item, batch));
    }

    /// Invoke `f(&item)` once for every item the iterator yields, split
    /// into balanced batches across the pool's workers.
    pub fn for_each_iter<I, F>(&self, iter: I, f: F)
    where
        I: IntoIterator,
        I::Item: Send + Sync + 'static,
        F: Fn(&I::Item) + Send + Sync + 'static,
    {
        self.0.for_each_iter(iter, f);
    }

    /// Like [`Self::for_each_iter`], but `f` also receives the batch index.
    pub fn for_each_iter_indexed<I, F>(&self, iter: I, f: F)
    where
        I: IntoIterator,
        I::Item: Send + Sync + 'static,
        F: Fn(&I::Item, usize) + Send + Sync + 'static,
    {
        self.0.for_each_iter_indexed(iter, f);
    }
}
