//! Pool construction, the single backing allocation, and the contended
//! queue selector (`lock`).

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use taskpool_core::cell::{TaskCell, TASK_ALIGN};
use taskpool_core::error::{Result, TaskPoolError};
use taskpool_core::monitor::Monitor;
use taskpool_core::queue::{QueueLock, RingQueue};

use crate::config::TaskPoolConfig;
use crate::diag;
use crate::worker::{Worker, WorkerShared, SPIN_WAIT_ITERATIONS};
use crate::{tp_debug, tp_warn};

thread_local! {
    /// Set for the lifetime of a worker thread's loop; lets `wait()` catch
    /// the "called from a worker" misuse in debug builds (§7 says this is
    /// otherwise undefined behavior — caller responsibility).
    static ON_WORKER_THREAD: Cell<bool> = const { Cell::new(false) };
}

pub(crate) fn mark_current_thread_as_worker() {
    ON_WORKER_THREAD.with(|c| c.set(true));
}

fn on_worker_thread() -> bool {
    ON_WORKER_THREAD.with(|c| c.get())
}

/// Owns the single byte buffer backing every queue's task-cell arena.
/// Deallocated after every `RingQueue` that points into it has been
/// dropped (enforced by field order in `PoolInner`, not by this type).
struct Arena {
    ptr: *mut u8,
    layout: Layout,
}

// The buffer is only ever accessed through the queues built over it, which
// are themselves Send + Sync; the Arena handle itself just owns bytes.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Drop for Arena {
    fn drop(&mut self) {
        if self.layout.size() > 0 {
            unsafe { alloc::dealloc(self.ptr, self.layout) };
        }
    }
}

/// A fixed-size in-process worker thread pool with per-worker bounded ring
/// queues, cross-queue work stealing, and balanced `for_each` dispatch.
///
/// There is no "moved-from" state to guard against at runtime: a `ThreadPool`
/// is not `Clone`, so Rust's ownership rules already make it impossible to
/// call a method on one after it's been moved — the compile-time check the
/// original's `MUU_ASSERT(ptr)` calls stood in for.
pub struct ThreadPool {
    inner: PoolInner,
}

struct PoolInner {
    // Drop order matters: workers must be signaled to stop and joined
    // before the queues they point into are torn down, and the queues must
    // be torn down (draining remaining cells) before the arena backing
    // them is freed. Rust drops struct fields in declaration order, so
    // that order is encoded here rather than relied on implicitly.
    workers: Vec<Worker>,
    queues: Arc<[RingQueue]>,
    monitor: Arc<Monitor>,
    arena: Arena,

    next_queue: AtomicUsize,
    worker_count: usize,
    queue_capacity_per_worker: usize,
    debug_logging: bool,
}

impl ThreadPool {
    /// Build a pool from a resolved [`TaskPoolConfig`].
    pub fn new(config: TaskPoolConfig) -> Result<Self> {
        diag::set_debug_logging(config.debug_logging);

        let worker_count = config.resolved_worker_count();
        let per_worker = config.resolved_queue_capacity_per_worker(worker_count);
        let total_tasks = worker_count * per_worker;

        tp_debug!(
            "constructing pool: workers={worker_count} per_worker_capacity={per_worker} total_cells={total_tasks}"
        );

        let layout = Layout::from_size_align(total_tasks * TASK_ALIGN, TASK_ALIGN)
            .expect("pool arena size/alignment overflow");
        let ptr = if layout.size() == 0 {
            std::ptr::NonNull::<u8>::dangling().as_ptr()
        } else {
            let p = unsafe { alloc::alloc(layout) };
            if p.is_null() {
                // Allocator failure at construction is an unrecoverable
                // contract violation (§7); this aborts the process.
                alloc::handle_alloc_error(layout);
            }
            p
        };
        let arena = Arena { ptr, layout };

        let monitor = Arc::new(Monitor::new());

        let mut queues = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let base = unsafe { arena.ptr.add(i * per_worker * TASK_ALIGN) } as *mut TaskCell;
            queues.push(unsafe { RingQueue::new(base, per_worker, monitor.clone()) });
        }
        let queues: Arc<[RingQueue]> = queues.into();

        let shared = Arc::new(WorkerShared { queues: queues.clone(), monitor: monitor.clone() });

        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            match Worker::spawn(i, shared.clone(), config.name.clone()) {
                Ok(w) => workers.push(w),
                Err(e) => {
                    tp_warn!("failed to spawn worker {i}: {e}");
                    // Roll back already-spawned workers/queues in reverse
                    // order, then the arena, matching §4.E's
                    // partial-construction-failure contract.
                    drop(workers);
                    drop(queues);
                    drop(arena);
                    return Err(TaskPoolError::SpawnFailed(e));
                }
            }
        }

        Ok(ThreadPool {
            inner: PoolInner {
                workers,
                queues,
                monitor,
                arena,
                next_queue: AtomicUsize::new(0),
                worker_count,
                queue_capacity_per_worker: per_worker,
                debug_logging: config.debug_logging,
            },
        })
    }

    /// Enqueue a task that runs on whichever worker picks it up.
    pub fn enqueue<F>(&self, f: F)
    where
        F: FnOnce(usize) + Send + 'static,
    {
        let mut lock = self.inner.lock();
        let slot = lock.acquire();
        unsafe { slot.write(TaskCell::new(f)) };
        lock.unlock();
    }

    /// Enqueue a task by reference rather than by value, for large
    /// callables that don't fit the 64-byte inline cell.
    ///
    /// # Safety
    ///
    /// `callable` must remain valid until this task has been invoked or,
    /// for tasks still queued at pool teardown, discarded — i.e. until a
    /// subsequent `wait()` returns or this pool is dropped.
    pub unsafe fn enqueue_ref<T>(&self, callable: &T)
    where
        T: Fn(usize) + Sync,
    {
        let mut lock = self.inner.lock();
        let slot = lock.acquire();
        unsafe { slot.write(TaskCell::new_ref(callable)) };
        lock.unlock();
    }

    /// Block until every previously enqueued task has completed.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if called from one of this pool's own
    /// worker threads (it would deadlock); in release builds this is
    /// undefined behavior per the task contract, same as the original.
    pub fn wait(&self) {
        debug_assert!(!on_worker_thread(), "ThreadPool::wait() called from a worker thread would deadlock");
        self.inner.monitor.wait();
    }

    pub fn worker_count(&self) -> usize {
        self.inner.worker_count
    }

    /// Total task-cell capacity across every worker's queue.
    pub fn capacity(&self) -> usize {
        self.inner.worker_count * self.inner.queue_capacity_per_worker
    }

    pub(crate) fn inner(&self) -> &PoolInner {
        &self.inner
    }
}

impl PoolInner {
    /// Select and lock a single queue under contention (§4.E).
    pub(crate) fn lock(&self) -> QueueLock<'_> {
        let start = self.next_queue.fetch_add(1, Ordering::Relaxed);

        if let Some(q) = self.find_queue(start) {
            return q;
        }

        for _ in 0..100 {
            if let Some(q) = self.find_queue(start) {
                return q;
            }
        }
        for _ in 0..10 {
            std::thread::sleep(Duration::from_millis(10));
            if let Some(q) = self.find_queue(start) {
                return q;
            }
        }
        loop {
            std::thread::sleep(Duration::from_millis(100));
            if let Some(q) = self.find_queue(start) {
                return q;
            }
        }
    }

    /// Try once to find a non-full queue, scanning `N * K` candidates with
    /// a spin-loop hint between each (§4.D/§4.E share the same spin factor).
    pub(crate) fn find_queue(&self, start: usize) -> Option<QueueLock<'_>> {
        let n = self.queues.len();
        let tries = n * SPIN_WAIT_ITERATIONS;
        for i in 0..tries {
            std::hint::spin_loop();
            let idx = (start + i) % n;
            if let Some(lock) = self.queues[idx].try_lock() {
                if !lock.is_full() {
                    return Some(lock);
                }
                lock.unlock();
            }
        }
        None
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        if self.debug_logging {
            tp_debug!("tearing down pool: {} workers, {} queues", self.workers.len(), self.queues.len());
        }
        for q in self.queues.iter() {
            q.terminate();
        }
        // Dropping the Vec joins every worker (`Worker::drop`); queues are
        // already terminated so any worker blocked in `pop` wakes now
        // instead of waiting out its bounded timeout.
        self.workers.clear();
        // `queues` and `arena` drop next, in declaration order, draining
        // remaining cells and then freeing the backing buffer.
    }
}
