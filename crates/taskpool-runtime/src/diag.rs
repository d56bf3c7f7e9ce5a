//! Debug-gated diagnostic printing.
//!
//! No logging crate is pulled in here, matching the rest of the pack: plain
//! `eprintln!` lines, gated behind a runtime flag so the hot path never pays
//! for a disabled format string. `TASKPOOL_DEBUG=1` (or
//! [`crate::config::TaskPoolConfig::debug_logging`]) turns them on.
//!
//! # Output format
//!
//! `[taskpool] <message>`

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

/// Enable or disable debug logging pool-wide. Called once from pool
/// construction with the resolved [`crate::config::TaskPoolConfig`].
pub fn set_debug_logging(enabled: bool) {
    DEBUG_LOGGING.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn debug_logging_enabled() -> bool {
    DEBUG_LOGGING.load(Ordering::Relaxed)
}

/// Print a debug line if debug logging is enabled.
#[macro_export]
macro_rules! tp_debug {
    ($($arg:tt)*) => {
        if $crate::diag::debug_logging_enabled() {
            eprintln!("[taskpool] {}", format_args!($($arg)*));
        }
    };
}

/// Print a warning line unconditionally; warnings are rare enough (thread
/// spawn failures, escalating backoff) that gating them behind the debug
/// flag would hide real operational signal.
#[macro_export]
macro_rules! tp_warn {
    ($($arg:tt)*) => {
        eprintln!("[taskpool] warning: {}", format_args!($($arg)*));
    };
}
