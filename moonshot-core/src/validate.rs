//! Up-front validation of user input.
//!
//! Everything here runs before the first network request, so a bad date or a
//! missing key fails fast instead of after minutes of paging.

use crate::domain::DateRange;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration / validation errors. Never retried; the CLI exits with 1.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("--start ({start}) must be on or before --end ({end})")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("missing {0} environment variable")]
    MissingCredential(String),

    #[error("no tickers provided")]
    NoTickers,

    #[error("input CSV not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid config file {}: {reason}", .path.display())]
    ConfigFile { path: PathBuf, reason: String },

    #[error("invalid input: {0}")]
    Invalid(String),
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        value: value.to_string(),
    })
}

/// Parse both ends and check ordering.
pub fn parse_range(start: &str, end: &str) -> Result<DateRange, ConfigError> {
    DateRange::new(parse_date(start)?, parse_date(end)?)
}

/// Split a comma-separated ticker list: trimmed, upper-cased, blanks dropped.
pub fn parse_tickers(list: &str) -> Result<Vec<String>, ConfigError> {
    let tickers: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .collect();
    if tickers.is_empty() {
        return Err(ConfigError::NoTickers);
    }
    Ok(tickers)
}

/// First non-empty value among the named environment variables.
pub fn credential_from_env(names: &[&str]) -> Result<String, ConfigError> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .ok_or_else(|| {
            let label = match names.split_first() {
                Some((first, rest)) if !rest.is_empty() => {
                    format!("{first} (or {})", rest.join(", "))
                }
                Some((first, _)) => first.to_string(),
                None => "credential".to_string(),
            };
            ConfigError::MissingCredential(label)
        })
}

/// Fail unless `path` exists.
pub fn require_input(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigError::MissingInput(path.to_path_buf()))
    }
}
