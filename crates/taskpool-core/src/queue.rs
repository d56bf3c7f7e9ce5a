//! Bounded, mutex-protected ring queue of task cells over a caller-provided
//! arena.
//!
//! Each worker owns exactly one [`RingQueue`]; producers (the submitter
//! thread, or `for_each`'s partitioner) pick a queue and drive it through
//! `try_lock` / `acquire` / `unlock`. Consumers (workers) drain it through
//! `try_pop` / `pop`. The task-cell arena backing every queue is a disjoint
//! slice of the pool's single allocation (see `taskpool-runtime`'s
//! dispatcher) so enqueueing never allocates; the `RingQueue` value itself
//! (its mutex, condvar and indices) is an ordinary heap value owned by the
//! pool, since nothing about avoiding allocation on the hot path requires
//! those to live in the same slab as the task cells they guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::cell::{TaskCell, TASK_ALIGN};
use crate::monitor::{Monitor, BOUNDED_WAIT};

struct Indices {
    front: usize,
    back: usize,
    /// Tasks `acquire`d since the lock was (re)taken; reset by `try_lock`/
    /// `lock`, consumed by `unlock` to decide the monitor increment and
    /// notify policy.
    enqueues: u64,
}

/// A producer's exclusive hold on a queue, returned by `lock`/`try_lock`.
///
/// Holding this across multiple `acquire` calls is how `for_each`
/// amortizes locking across a batch of submissions onto the same queue.
pub struct QueueLock<'q> {
    queue: &'q RingQueue,
    guard: Option<std::sync::MutexGuard<'q, Indices>>,
}

/// Bounded FIFO of 64-byte task cells backed by a caller-provided byte range.
pub struct RingQueue {
    arena: *mut TaskCell,
    capacity: usize,
    indices: Mutex<Indices>,
    cv: Condvar,
    terminated: AtomicBool,
    monitor: Arc<Monitor>,
}

// The queue only ever hands out `*mut TaskCell` access while `indices` is
// locked, so it's safe to share across threads despite the raw pointer.
unsafe impl Send for RingQueue {}
unsafe impl Sync for RingQueue {}

impl RingQueue {
    /// Build a queue over `capacity` contiguous, 64-byte-aligned task cells
    /// starting at `arena`.
    ///
    /// # Safety
    ///
    /// `arena` must point to at least `capacity * 64` bytes, aligned to 64,
    /// valid for the lifetime of this queue, and not aliased by any other
    /// queue.
    pub unsafe fn new(arena: *mut TaskCell, capacity: usize, monitor: Arc<Monitor>) -> Self {
        debug_assert_eq!((arena as usize) % TASK_ALIGN, 0);
        RingQueue {
            arena,
            capacity,
            indices: Mutex::new(Indices { front: 0, back: 0, enqueues: 0 }),
            cv: Condvar::new(),
            terminated: AtomicBool::new(false),
            monitor,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut TaskCell {
        unsafe { self.arena.add(index % self.capacity) }
    }

    /// Non-blocking acquire of the queue's mutex.
    pub fn try_lock(&self) -> Option<QueueLock<'_>> {
        let mut guard = self.indices.try_lock().ok()?;
        guard.enqueues = 0;
        Some(QueueLock { queue: self, guard: Some(guard) })
    }

    /// Blocking acquire of the queue's mutex, for the `for_each` fallback
    /// path and single-submission `enqueue`.
    pub fn lock(&self) -> QueueLock<'_> {
        let mut guard = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        guard.enqueues = 0;
        QueueLock { queue: self, guard: Some(guard) }
    }

    /// Try to pop the front task into `dest`. Non-blocking: fails if the
    /// queue is contended, empty, or terminated.
    pub fn try_pop(&self, dest: &mut TaskCell) -> bool {
        let Ok(mut guard) = self.indices.try_lock() else {
            return false;
        };
        self.pop_front_locked(&mut guard, dest)
    }

    /// Pop the front task into `dest`, blocking on the condition variable
    /// (with a bounded wait, §9) until the queue is non-empty or terminated.
    /// Returns `false` iff terminated with nothing left to pop.
    pub fn pop(&self, dest: &mut TaskCell) -> bool {
        let mut guard = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        while guard.back == guard.front && !self.terminated.load(Ordering::Acquire) {
            let (g, _timeout) = self.cv.wait_timeout(guard, BOUNDED_WAIT).unwrap_or_else(|e| e.into_inner());
            guard = g;
        }
        self.pop_front_locked(&mut guard, dest)
    }

    fn pop_front_locked(&self, guard: &mut Indices, dest: &mut TaskCell) -> bool {
        if guard.back == guard.front || self.terminated.load(Ordering::Acquire) {
            return false;
        }
        let front_cell = unsafe { &mut *self.slot(guard.front) };
        front_cell.move_into(dest);
        guard.front += 1;
        true
    }

    /// Set the terminated flag (once) and wake every blocked consumer.
    pub fn terminate(&self) {
        if self.terminated.compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed).is_ok() {
            self.cv.notify_all();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

impl Drop for RingQueue {
    /// Drain any remaining cells under the lock, running destructors only,
    /// and report the drop count to the monitor so a concurrent `wait()`
    /// can still observe completion.
    fn drop(&mut self) {
        let mut guard = self.indices.lock().unwrap_or_else(|e| e.into_inner());
        let remaining = (guard.back - guard.front) as u64;
        while guard.back != guard.front {
            let cell = unsafe { &mut *self.slot(guard.front) };
            cell.destroy();
            guard.front += 1;
        }
        drop(guard);
        self.monitor.decrement(remaining);
    }
}

impl<'q> QueueLock<'q> {
    /// Current number of queued-but-not-yet-popped cells.
    pub fn len(&self) -> usize {
        let g = self.guard.as_ref().unwrap();
        g.back - g.front
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.queue.capacity
    }

    /// Capacity of the queue this lock holds.
    pub fn capacity(&self) -> usize {
        self.queue.capacity
    }

    /// Reserve the next slot and return a pointer to it. The caller must
    /// construct a valid `TaskCell` at the returned address before the lock
    /// is released (via `unlock` or drop).
    ///
    /// Panics if the queue is full; callers must check `is_full` first.
    pub fn acquire(&mut self) -> *mut TaskCell {
        let g = self.guard.as_mut().unwrap();
        assert!(g.back - g.front < self.queue.capacity, "acquire on a full queue");
        let slot = self.queue.slot(g.back);
        g.back += 1;
        g.enqueues += 1;
        slot
    }

    /// Release the lock: publish the enqueued count to the monitor (before
    /// releasing the mutex, so an awakened consumer that observes
    /// `back > front` also observes fully constructed cells), then notify
    /// `one`/`all`/none depending on how many cells were acquired since the
    /// lock was taken.
    pub fn unlock(mut self) {
        self.unlock_inner();
    }

    fn unlock_inner(&mut self) {
        let Some(guard) = self.guard.take() else { return };
        let enq = guard.enqueues;
        self.queue.monitor.increment(enq);
        drop(guard);
        if enq == 1 {
            self.queue.cv.notify_one();
        } else if enq > 1 {
            self.queue.cv.notify_all();
        }
    }
}

impl<'q> Drop for QueueLock<'q> {
    fn drop(&mut self) {
        // Dropping without an explicit `unlock()` still has to publish
        // whatever was acquired, so the monitor never falls out of sync
        // with what's actually sitting in the ring (e.g. on an unwind).
        self.unlock_inner();
    }
}
