//! # taskpool-core
//!
//! Platform-agnostic building blocks for the `taskpool` worker thread pool.
//!
//! This crate contains no thread spawning or OS-specific code; everything
//! here is pure data structures and locking protocol. `taskpool-runtime`
//! owns the worker loop, the pool's arena allocation, and the `for_each`
//! partitioner built on top of these.
//!
//! ## Modules
//!
//! - [`cell`] — the 64-byte task cell and its move/invoke/destroy action.
//! - [`queue`] — the bounded ring queue of task cells.
//! - [`monitor`] — outstanding-task bookkeeping and `wait()`.
//! - [`env`] — environment-variable parsing helpers shared with `taskpool-runtime`.
//! - [`error`] — the small set of recoverable failure modes.

pub mod cell;
pub mod env;
pub mod error;
pub mod monitor;
pub mod queue;

pub use cell::{Action, TaskCell, TASK_ALIGN, TASK_PAYLOAD_SIZE};
pub use error::{Result, TaskPoolError};
pub use monitor::Monitor;
pub use queue::{QueueLock, RingQueue};
