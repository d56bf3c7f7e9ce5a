//! Environment variable utilities.
//!
//! Generic `env_get<T>` function for parsing environment variables with
//! defaults, used by `taskpool-runtime`'s configuration to let
//! `TASKPOOL_*` variables override compile-time/builder defaults.

use std::str::FromStr;

/// Get environment variable parsed as type `T`, or return `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Get environment variable as boolean.
///
/// Accepts `"1"`, `"true"`, `"yes"`, `"on"` (case-insensitive) as true.
/// Everything else (including unset) returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as an optional string.
#[inline]
pub fn env_get_str_opt(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_when_unset() {
        let val: usize = env_get("__TASKPOOL_TEST_UNSET__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn bool_variants() {
        std::env::set_var("__TASKPOOL_TEST_BOOL__", "yes");
        assert!(env_get_bool("__TASKPOOL_TEST_BOOL__", false));
        std::env::set_var("__TASKPOOL_TEST_BOOL__", "0");
        assert!(!env_get_bool("__TASKPOOL_TEST_BOOL__", true));
        std::env::remove_var("__TASKPOOL_TEST_BOOL__");
    }

    #[test]
    fn parse_failure_falls_back_to_default() {
        std::env::set_var("__TASKPOOL_TEST_NUM__", "not_a_number");
        let val: usize = env_get("__TASKPOOL_TEST_NUM__", 7);
        assert_eq!(val, 7);
        std::env::remove_var("__TASKPOOL_TEST_NUM__");
    }
}
