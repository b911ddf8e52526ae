//! Shared configuration loader module
//!
//! This module provides a unified configuration loading system with environment variable
//! parsing, validation, and support for .env files. Services built on it use the
//! `ARTIST_REC_` prefix for environment variables.
//!
//! # Features
//!
//! - Environment variable parsing with typed values
//! - Comma-separated list parsing for multi-valued settings
//! - .env file support via dotenvy
//! - Configuration validation with clear error messages
//! - Configuration override hierarchy: defaults < .env < environment
//!
//! # Example
//!
//! ```no_run
//! use artist_rec_core::config::{load_dotenv, parse_env_var};
//!
//! # fn example() -> Result<(), artist_rec_core::RecommenderError> {
//! load_dotenv();
//! let iterations: usize = parse_env_var("ARTIST_REC_ITERATIONS", 5)?;
//! # Ok(())
//! # }
//! ```

use crate::error::RecommenderError;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    ///
    /// Missing optional values fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if a variable cannot be parsed.
    fn from_env() -> Result<Self, RecommenderError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if any validation check fails.
    fn validate(&self) -> Result<(), RecommenderError>;
}

/// Parse an environment variable, falling back to `default` when unset
///
/// # Errors
///
/// Returns an `InvalidConfiguration` error naming `key` if the value is set
/// but cannot be parsed into `T`.
pub fn parse_env_var<T>(key: &str, default: T) -> Result<T, RecommenderError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| {
                RecommenderError::invalid_config(format!("Failed to parse {}: {}", key, e), key)
            })
        })
        .unwrap_or(Ok(default))
}

/// Parse a comma-separated environment variable into a list
///
/// Empty segments are ignored, so `"2, 10,,20"` yields `[2, 10, 20]`.
pub fn parse_env_list<T>(key: &str, default: Vec<T>) -> Result<Vec<T>, RecommenderError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_list(&raw).map_err(|message| {
            RecommenderError::invalid_config(format!("Failed to parse {}: {}", key, message), key)
        }),
        Err(_) => Ok(default),
    }
}

fn parse_list<T>(raw: &str) -> Result<Vec<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(|e| format!("'{}': {}", s, e)))
        .collect()
}

/// Optional environment variable, `None` when unset
pub fn parse_env_opt<T>(key: &str) -> Result<Option<T>, RecommenderError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v.trim().parse::<T>().map(Some).map_err(|e| {
            RecommenderError::invalid_config(format!("Failed to parse {}: {}", key, e), key)
        }),
        Err(_) => Ok(None),
    }
}

/// Load .env file if present
///
/// Does not return an error if the .env file is not found.
///
/// # Example
///
/// ```no_run
/// use artist_rec_core::config::load_dotenv;
///
/// load_dotenv();
/// ```
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn set_test_env(key: &str, value: &str) {
        env::set_var(key, value);
    }

    fn clear_test_env(key: &str) {
        env::remove_var(key);
    }

    #[test]
    fn test_parse_env_var_default_when_unset() {
        clear_test_env("ARTIST_REC_TEST_UNSET");
        let value: u32 = parse_env_var("ARTIST_REC_TEST_UNSET", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_env_var_set() {
        set_test_env("ARTIST_REC_TEST_ITERS", " 12 ");
        let value: usize = parse_env_var("ARTIST_REC_TEST_ITERS", 5).unwrap();
        assert_eq!(value, 12);
        clear_test_env("ARTIST_REC_TEST_ITERS");
    }

    #[test]
    fn test_parse_env_var_invalid() {
        set_test_env("ARTIST_REC_TEST_BAD", "ten");
        let result: Result<usize, _> = parse_env_var("ARTIST_REC_TEST_BAD", 5);
        let err = result.unwrap_err();
        assert_eq!(err.config_key(), Some("ARTIST_REC_TEST_BAD"));
        clear_test_env("ARTIST_REC_TEST_BAD");
    }

    #[test]
    fn test_parse_list_skips_empty_segments() {
        let parsed: Vec<usize> = parse_list("2, 10,,20").unwrap();
        assert_eq!(parsed, vec![2, 10, 20]);
    }

    #[test]
    fn test_parse_list_reports_bad_segment() {
        let parsed: Result<Vec<f64>, _> = parse_list("40,x,20");
        assert!(parsed.unwrap_err().contains("'x'"));
    }

    #[test]
    fn test_parse_env_list() {
        set_test_env("ARTIST_REC_TEST_RANKS", "4,8");
        let ranks: Vec<usize> = parse_env_list("ARTIST_REC_TEST_RANKS", vec![1]).unwrap();
        assert_eq!(ranks, vec![4, 8]);
        clear_test_env("ARTIST_REC_TEST_RANKS");

        let ranks: Vec<usize> = parse_env_list("ARTIST_REC_TEST_RANKS", vec![1]).unwrap();
        assert_eq!(ranks, vec![1]);
    }

    #[test]
    fn test_parse_env_opt() {
        clear_test_env("ARTIST_REC_TEST_OPT");
        let none: Option<usize> = parse_env_opt("ARTIST_REC_TEST_OPT").unwrap();
        assert!(none.is_none());

        set_test_env("ARTIST_REC_TEST_OPT", "3");
        let some: Option<usize> = parse_env_opt("ARTIST_REC_TEST_OPT").unwrap();
        assert_eq!(some, Some(3));
        clear_test_env("ARTIST_REC_TEST_OPT");
    }
}
