//! Balanced-batch `for_each` dispatch over an integer range or an iterator.
//!
//! Splits the input into at most `worker_count` batches of roughly-equal
//! size (the first `job_count % batch_count` batches get one extra item),
//! submits one task per batch, and tries to land every batch on the same
//! queue back-to-back so the submitter pays for contended queue selection
//! once instead of once per batch.

use std::sync::Arc;

use taskpool_core::cell::TaskCell;

use crate::dispatcher::ThreadPool;

/// `(offset, len)` pairs covering `[0, job_count)` with at most
/// `worker_count` balanced batches.
fn balanced_batches(job_count: usize, worker_count: usize) -> Vec<(usize, usize)> {
    if job_count == 0 {
        return Vec::new();
    }
    let batch_count = job_count.min(worker_count.max(1));
    let constant = job_count / batch_count;
    let overflow = job_count % batch_count;

    let mut batches = Vec::with_capacity(batch_count);
    let mut offset = 0usize;
    for i in 0..batch_count {
        let len = constant + usize::from(i < overflow);
        batches.push((offset, len));
        offset += len;
    }
    batches
}

impl ThreadPool {
    /// Invoke `f(i)` once for every `i` in `[start, end)`. `start > end` is
    /// normalized by swapping (parallel semantics; iteration order is
    /// unspecified either way).
    pub fn for_each_range<F>(&self, start: i64, end: i64, f: F)
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.for_each_range_indexed(start, end, move |item, _batch| f(item));
    }

    /// Like [`Self::for_each_range`], but `f` also receives the batch index
    /// that produced `item` (stable within a single call, `< worker_count`).
    pub fn for_each_range_indexed<F>(&self, start: i64, end: i64, f: F)
    where
        F: Fn(i64, usize) + Send + Sync + 'static,
    {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        let job_count = (end - start) as usize;
        let task = Arc::new(f);
        self.dispatch_batches(job_count, move |batch_index, batch_start, batch_len| {
            let task = task.clone();
            move |_worker_index: usize| {
                for offset in 0..batch_len {
                    task(start + (batch_start + offset) as i64, batch_index);
                }
            }
        });
    }

    /// Invoke `f(item)` once for every item the iterator yields.
    ///
    /// Collects the iterator into a `Vec` up front (a single, one-time
    /// allocation outside the per-task hot path) so batches can be sliced
    /// by index the same way the integer-range overload is; this keeps the
    /// element-closure signature identical across both overloads.
    pub fn for_each_iter<I, F>(&self, iter: I, f: F)
    where
        I: IntoIterator,
        I::Item: Send + Sync + 'static,
        F: Fn(&I::Item) + Send + Sync + 'static,
    {
        self.for_each_iter_indexed(iter, move |item, _batch| f(item));
    }

    /// Like [`Self::for_each_iter`], but `f` also receives the batch index.
    pub fn for_each_iter_indexed<I, F>(&self, iter: I, f: F)
    where
        I: IntoIterator,
        I::Item: Send + Sync + 'static,
        F: Fn(&I::Item, usize) + Send + Sync + 'static,
    {
        let items: Arc<Vec<I::Item>> = Arc::new(iter.into_iter().collect());
        let job_count = items.len();
        let task = Arc::new(f);
        self.dispatch_batches(job_count, move |batch_index, batch_start, batch_len| {
            let task = task.clone();
            let items = items.clone();
            move |_worker_index: usize| {
                for offset in 0..batch_len {
                    task(&items[batch_start + offset], batch_index);
                }
            }
        });
    }

    /// Shared batching/dispatch core: partitions `job_count` items into
    /// balanced batches, builds one task per batch via `make_task`, and
    /// submits them — onto a single shared queue when one can be obtained
    /// without blocking, otherwise through the normal per-batch `lock`
    /// cycle.
    fn dispatch_batches<MakeTask, Task>(&self, job_count: usize, make_task: MakeTask)
    where
        MakeTask: Fn(usize, usize, usize) -> Task,
        Task: FnOnce(usize) + Send + 'static,
    {
        if job_count == 0 {
            return;
        }

        let batches = balanced_batches(job_count, self.worker_count());
        let inner = self.inner();

        // Try to obtain one queue with enough headroom for every batch, and
        // hold it across all of them so submission is locked once instead
        // of once per batch.
        if let Some(mut lock) = inner.find_queue(0) {
            if lock.capacity() - lock.len() >= batches.len() {
                for (batch_index, (batch_start, batch_len)) in batches.iter().copied().enumerate() {
                    let slot = lock.acquire();
                    unsafe { slot.write(TaskCell::new(make_task(batch_index, batch_start, batch_len))) };
                }
                lock.unlock();
                return;
            }
            lock.unlock();
        }

        for (batch_index, (batch_start, batch_len)) in batches.iter().copied().enumerate() {
            let mut lock = inner.lock();
            let slot = lock.acquire();
            unsafe { slot.write(TaskCell::new(make_task(batch_index, batch_start, batch_len))) };
            lock.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_batches_cover_range_exactly() {
        let batches = balanced_batches(10, 4);
        let total: usize = batches.iter().map(|(_, len)| *len).sum();
        assert_eq!(total, 10);
        assert_eq!(batches.len(), 4);
        // overflow (10 % 4 = 2) goes to the first two batches.
        assert_eq!(batches[0].1, 3);
        assert_eq!(batches[1].1, 3);
        assert_eq!(batches[2].1, 2);
        assert_eq!(batches[3].1, 2);
    }

    #[test]
    fn batch_count_never_exceeds_job_count() {
        let batches = balanced_batches(3, 16);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|(_, len)| *len == 1));
    }

    #[test]
    fn empty_range_has_no_batches() {
        assert!(balanced_batches(0, 4).is_empty());
    }
}
