//! Error types for the parts of the pool that can fail recoverably.
//!
//! Most of the failure modes in the spec are contract violations (a task
//! that throws, `wait()` called from a worker) or deliberately unrecoverable
//! (allocator failure aborts the process); this enum only covers the one
//! path a caller can reasonably want to handle: failing to spawn an OS
//! thread during construction.

use std::fmt;

#[derive(Debug)]
pub enum TaskPoolError {
    /// `std::thread::Builder::spawn` failed for one of the pool's workers.
    SpawnFailed(std::io::Error),
}

impl fmt::Display for TaskPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed(e) => write!(f, "failed to spawn worker thread: {e}"),
        }
    }
}

impl std::error::Error for TaskPoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SpawnFailed(e) => Some(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskPoolError>;
