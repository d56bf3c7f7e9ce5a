//! Outstanding-task bookkeeping shared by every queue in a pool.
//!
//! `busy` is the number of task cells that have been published (by a
//! queue's `unlock`) but not yet completed (by a worker's `decrement` after
//! invoking or destroying them). `wait()` blocks until it reaches zero.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Bounded wait used by both the monitor and the ring queue's consumer side.
///
/// A deliberate belt-and-braces backstop against a missed wakeup; every
/// waiter re-checks its predicate after the timeout regardless, so
/// correctness never depends on this value, only liveness does.
pub const BOUNDED_WAIT: Duration = Duration::from_millis(250);

/// Tracks the number of task cells that are queued or executing.
pub struct Monitor {
    busy: Mutex<u64>,
    cv: Condvar,
}

impl Monitor {
    pub fn new() -> Self {
        Monitor { busy: Mutex::new(0), cv: Condvar::new() }
    }

    /// Record `n` newly-published tasks.
    pub fn increment(&self, n: u64) {
        if n == 0 {
            return;
        }
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        *busy += n;
    }

    /// Record `n` completed tasks (invoked or destroyed-without-invoking).
    ///
    /// Precondition: `n <= busy`. Notifies all waiters once `busy` reaches
    /// zero.
    pub fn decrement(&self, n: u64) {
        if n == 0 {
            return;
        }
        let mut notify = false;
        {
            let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
            debug_assert!(n <= *busy, "monitor decrement exceeds outstanding count");
            *busy = busy.saturating_sub(n);
            if *busy == 0 {
                notify = true;
            }
        }
        if notify {
            self.cv.notify_all();
        }
    }

    /// Block until there are no outstanding tasks anywhere in the pool.
    pub fn wait(&self) {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        while *busy != 0 {
            let (guard, _timeout) =
                self.cv.wait_timeout(busy, BOUNDED_WAIT).unwrap_or_else(|e| e.into_inner());
            busy = guard;
        }
    }

    /// Current outstanding-task count. For diagnostics and tests only.
    pub fn busy(&self) -> u64 {
        *self.busy.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_when_idle() {
        let m = Monitor::new();
        m.wait();
        m.wait();
    }

    #[test]
    fn wait_blocks_until_decremented() {
        let m = Arc::new(Monitor::new());
        m.increment(1);
        let m2 = m.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            m2.decrement(1);
        });
        m.wait();
        assert_eq!(m.busy(), 0);
        handle.join().unwrap();
    }

    #[test]
    #[should_panic]
    fn decrement_past_zero_is_a_bug() {
        let m = Monitor::new();
        m.decrement(1);
    }
}
