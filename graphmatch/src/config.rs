//! Engine configuration.
//!
//! Limits that bound how much work a single query run may do, loaded from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `GRAPHMATCH_MAX_BRANCHES`: Maximum number of live candidate branches (default: unbounded)
//! - `GRAPHMATCH_MAX_BATCH_MATCHES`: Maximum number of statements one batched lookup may return (default: unbounded)
//!
//! # Invariants
//!
//! - A configured limit is always at least 1

use thiserror::Error;

/// Limits applied to every run of a `GraphMatch`.
///
/// The default configuration is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Abort when the live branch set grows past this size.
    pub max_branches: Option<usize>,
    /// Abort when a single batched lookup streams more statements than this.
    pub max_batch_matches: Option<usize>,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

impl EngineConfig {
    pub const MAX_BRANCHES_VAR: &'static str = "GRAPHMATCH_MAX_BRANCHES";
    pub const MAX_BATCH_MATCHES_VAR: &'static str = "GRAPHMATCH_MAX_BATCH_MATCHES";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but is not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            max_branches: load_limit(&lookup, Self::MAX_BRANCHES_VAR)?,
            max_batch_matches: load_limit(&lookup, Self::MAX_BATCH_MATCHES_VAR)?,
        })
    }
}

fn load_limit(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<usize>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            name: name.to_owned(),
            message: "must be at least 1".to_owned(),
        }),
        Ok(limit) => Ok(Some(limit)),
        Err(_) => Err(ConfigError::InvalidValue {
            name: name.to_owned(),
            message: format!("'{value}' is not a positive integer"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_is_unbounded() {
        let config = EngineConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_branches, None);
    }

    #[test]
    fn test_limits_parsed() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("GRAPHMATCH_MAX_BRANCHES", "1000"),
            ("GRAPHMATCH_MAX_BATCH_MATCHES", " 50 "),
        ]))
        .expect("config");
        assert_eq!(config.max_branches, Some(1000));
        assert_eq!(config.max_batch_matches, Some(50));
    }

    #[test]
    fn test_zero_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("GRAPHMATCH_MAX_BRANCHES", "0")]))
            .expect_err("zero is invalid");
        assert_eq!(
            err.to_string(),
            "invalid value for GRAPHMATCH_MAX_BRANCHES: must be at least 1"
        );
    }

    #[test]
    fn test_garbage_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("GRAPHMATCH_MAX_BATCH_MATCHES", "lots")]))
            .expect_err("not a number");
        assert!(matches!(err, ConfigError::InvalidValue { name, .. } if name == "GRAPHMATCH_MAX_BATCH_MATCHES"));
    }
}
