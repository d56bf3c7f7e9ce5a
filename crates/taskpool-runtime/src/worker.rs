//! Worker thread: pops from its own queue, steals from siblings, blocks
//! when nothing is available anywhere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use taskpool_core::cell::TaskCell;
use taskpool_core::monitor::Monitor;
use taskpool_core::queue::RingQueue;

use crate::tp_debug;

/// Spin iterations per sibling queue tried before falling back to a
/// blocking pop on the worker's own queue (§4.D).
pub const SPIN_WAIT_ITERATIONS: usize = 20;

/// Shared state a worker closure needs; queues and monitor outlive every
/// worker since they're all owned by the same pool.
pub struct WorkerShared {
    pub queues: Arc<[RingQueue]>,
    pub monitor: Arc<Monitor>,
}

/// An OS thread owned by the pool, paired with the flag used to tell it to
/// exit and the handle used to join it on pool teardown.
pub struct Worker {
    handle: Option<JoinHandle<()>>,
    terminated: Arc<AtomicBool>,
}

impl Worker {
    /// Spawn a worker thread that owns `queues[worker_index]` and may steal
    /// from any other entry in `queues`.
    pub fn spawn(worker_index: usize, shared: Arc<WorkerShared>, thread_name: Option<String>) -> std::io::Result<Self> {
        let terminated = Arc::new(AtomicBool::new(false));
        let terminated_for_thread = terminated.clone();

        let mut builder = std::thread::Builder::new();
        if let Some(name) = thread_name {
            builder = builder.name(format!("{name} [{worker_index}]"));
        }

        let handle = builder.spawn(move || worker_loop(worker_index, shared, terminated_for_thread))?;

        Ok(Worker { handle: Some(handle), terminated })
    }

    /// Signal this worker to exit after its current task (if any).
    ///
    /// The worker still needs its queue `terminate`d to actually wake up if
    /// it's blocked in `pop`; the dispatcher does both together during
    /// teardown.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.terminated.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(worker_index: usize, shared: Arc<WorkerShared>, terminated: Arc<AtomicBool>) {
    crate::dispatcher::mark_current_thread_as_worker();
    tp_debug!("worker {worker_index} started");

    let queue_count = shared.queues.len();
    let tries = queue_count * SPIN_WAIT_ITERATIONS;
    let mut scratch = TaskCell::scratch();

    while !terminated.load(Ordering::Acquire) {
        let mut found = false;

        for i in 0..tries {
            std::hint::spin_loop();
            let candidate = (worker_index + i) % queue_count;
            if shared.queues[candidate].try_pop(&mut scratch) {
                found = true;
                break;
            }
        }

        if !found {
            found = shared.queues[worker_index].pop(&mut scratch);
        }

        if found {
            scratch.invoke(worker_index);
            shared.monitor.decrement(1);
        }
    }

    tp_debug!("worker {worker_index} exiting");
}
