//! Pool configuration.
//!
//! Builder-pattern construction with environment-variable overrides layered
//! on top of compile-time defaults.
//!
//! # Configuration priority (highest wins)
//!
//! 1. Explicit builder calls (`.worker_count(8)`, …)
//! 2. Environment variables (`TASKPOOL_WORKERS`, …)
//! 3. Library defaults
//!
//! # Example
//!
//! ```
//! use taskpool_runtime::config::TaskPoolConfig;
//!
//! let config = TaskPoolConfig::from_env().worker_count(8);
//! ```

use taskpool_core::env::{env_get, env_get_bool, env_get_str_opt};

/// Default per-pool task queue size when `task_queue_size` is left at 0 (§4.E).
pub const DEFAULT_TASK_QUEUE_SIZE: usize = 1024;

/// Hard ceiling on a single worker's queue capacity (§4.E).
pub const MAX_QUEUE_CAPACITY_PER_WORKER: usize = 4_194_304;

/// Ceiling on resolved worker count when `worker_count` is left at 0 (§4.E).
const MAX_AUTO_WORKERS: usize = 1024;
const AUTO_WORKERS_MULTIPLIER: usize = 64;

/// Pool configuration, with builder-pattern setters and environment-variable
/// overrides via [`TaskPoolConfig::from_env`].
#[derive(Debug, Clone)]
pub struct TaskPoolConfig {
    /// Number of worker threads. `0` resolves to hardware concurrency,
    /// clamped to `min(64 * concurrency, 1024)`.
    pub worker_count: usize,
    /// Total task queue capacity across all workers. `0` resolves to 1024.
    pub task_queue_size: usize,
    /// Optional pool name, used to format each worker's thread name as
    /// `"<name> [<worker-index>]"`.
    pub name: Option<String>,
    /// Enable `tp_debug!` diagnostic output.
    pub debug_logging: bool,
}

impl TaskPoolConfig {
    /// Library defaults with no environment overrides applied.
    pub fn new() -> Self {
        TaskPoolConfig { worker_count: 0, task_queue_size: 0, name: None, debug_logging: false }
    }

    /// Start from library defaults, then apply any `TASKPOOL_*`
    /// environment-variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.worker_count = env_get("TASKPOOL_WORKERS", config.worker_count);
        config.task_queue_size = env_get("TASKPOOL_QUEUE_SIZE", config.task_queue_size);
        config.name = env_get_str_opt("TASKPOOL_NAME").or(config.name);
        config.debug_logging = env_get_bool("TASKPOOL_DEBUG", config.debug_logging);
        config
    }

    pub fn worker_count(mut self, n: usize) -> Self {
        self.worker_count = n;
        self
    }

    pub fn task_queue_size(mut self, n: usize) -> Self {
        self.task_queue_size = n;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Resolve `worker_count == 0` to hardware concurrency, then clamp
    /// whichever value that yields (explicit or auto-detected) to
    /// `min(64 * concurrency, 1024)`, per §4.E.
    pub fn resolved_worker_count(&self) -> usize {
        let concurrency = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let effective_max_workers = (AUTO_WORKERS_MULTIPLIER * concurrency).min(MAX_AUTO_WORKERS);
        let requested = if self.worker_count != 0 { self.worker_count } else { concurrency };
        requested.min(effective_max_workers).max(1)
    }

    /// Resolve `task_queue_size == 0` to the default, then derive the
    /// per-worker capacity (`total_tasks = workers * ceil(size / workers)`,
    /// clamped to [`MAX_QUEUE_CAPACITY_PER_WORKER`]) and the total arena size.
    pub fn resolved_queue_capacity_per_worker(&self, worker_count: usize) -> usize {
        let size = if self.task_queue_size == 0 { DEFAULT_TASK_QUEUE_SIZE } else { self.task_queue_size };
        let per_worker = size.div_ceil(worker_count.max(1));
        per_worker.clamp(1, MAX_QUEUE_CAPACITY_PER_WORKER)
    }

    pub fn eprint_summary(&self) {
        eprintln!("taskpool configuration:");
        eprintln!("  worker_count (resolved): {}", self.resolved_worker_count());
        eprintln!(
            "  task_queue_size (resolved per worker): {}",
            self.resolved_queue_capacity_per_worker(self.resolved_worker_count())
        );
        eprintln!("  name: {:?}", self.name);
        eprintln!("  debug_logging: {}", self.debug_logging);
    }
}

impl Default for TaskPoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_worker_count_resolves_to_hardware_concurrency() {
        let config = TaskPoolConfig::new();
        assert!(config.resolved_worker_count() >= 1);
    }

    #[test]
    fn zero_queue_size_resolves_to_default() {
        let config = TaskPoolConfig::new();
        assert_eq!(config.resolved_queue_capacity_per_worker(4), DEFAULT_TASK_QUEUE_SIZE / 4);
    }

    #[test]
    fn per_worker_capacity_is_clamped() {
        let config = TaskPoolConfig::new().task_queue_size(usize::MAX / 2);
        assert_eq!(config.resolved_queue_capacity_per_worker(1), MAX_QUEUE_CAPACITY_PER_WORKER);
    }

    #[test]
    fn explicit_worker_count_is_also_clamped() {
        let config = TaskPoolConfig::new().worker_count(usize::MAX / 2);
        let concurrency = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let expected = (AUTO_WORKERS_MULTIPLIER * concurrency).min(MAX_AUTO_WORKERS);
        assert_eq!(config.resolved_worker_count(), expected);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = TaskPoolConfig::new().worker_count(4).task_queue_size(512).name("demo");
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.task_queue_size, 512);
        assert_eq!(config.name.as_deref(), Some("demo"));
    }
}
