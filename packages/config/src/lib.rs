// ABOUTME: Configuration resolution for Corral directory roots and tunables
// ABOUTME: Reads environment variables with validated fallbacks to defaults

pub mod constants;

use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Default root directory when `CORRAL_ROOT` is unset
pub const DEFAULT_ROOT: &str = "./corral-data";

/// Resolve the Corral root directory from the environment
pub fn root_dir() -> PathBuf {
    env::var(constants::CORRAL_ROOT)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_ROOT))
}

/// Resolve a directory from an env var, falling back to `<root>/<default_name>`
pub fn dir_or_default(var: &str, default_name: &str) -> PathBuf {
    env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| root_dir().join(default_name))
}

/// Read a numeric env var, warning and falling back on unparseable values
pub fn u64_or_default(var: &str, default: u64) -> u64 {
    match env::var(var) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring unparseable value for {}: {:?}", var, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Read a comma-separated list env var, trimming entries and dropping empties
pub fn list_or_default(var: &str, default: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_falls_back_on_garbage() {
        env::set_var("CORRAL_TEST_U64", "not-a-number");
        assert_eq!(u64_or_default("CORRAL_TEST_U64", 7), 7);
        env::set_var("CORRAL_TEST_U64", "42");
        assert_eq!(u64_or_default("CORRAL_TEST_U64", 7), 42);
        env::remove_var("CORRAL_TEST_U64");
    }

    #[test]
    fn list_trims_and_drops_empty_entries() {
        env::set_var("CORRAL_TEST_LIST", "a, b ,,c");
        assert_eq!(list_or_default("CORRAL_TEST_LIST", &[]), vec!["a", "b", "c"]);
        env::remove_var("CORRAL_TEST_LIST");
    }

    #[test]
    fn list_defaults_when_unset() {
        env::remove_var("CORRAL_TEST_LIST_UNSET");
        assert_eq!(
            list_or_default("CORRAL_TEST_LIST_UNSET", &["x:1"]),
            vec!["x:1"]
        );
    }
}
