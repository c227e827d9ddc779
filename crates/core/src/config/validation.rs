//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_concurrency` is 0 or exceeds 32
    /// - `user_agent`, `cache_prefix` or `cache_version` is empty or contains whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - `scope` or `shell_path` does not start with `/`
    ///
    /// Returns `ConfigError::Missing` if `primary_manifest` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_concurrency == 0 {
            return Err(invalid("max_concurrency", "must be at least 1"));
        }
        if self.max_concurrency > 32 {
            return Err(invalid("max_concurrency", "must not exceed 32"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        for (field, value) in [("cache_prefix", &self.cache_prefix), ("cache_version", &self.cache_version)] {
            if value.is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must not contain whitespace"));
            }
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "must be an http or https URL"));
        }

        if !self.scope.starts_with('/') {
            return Err(invalid("scope", "must start with '/'"));
        }
        if !self.shell_path.starts_with('/') {
            return Err(invalid("shell_path", "must start with '/'"));
        }

        if self.primary_manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "primary_manifest".into(),
                hint: "list at least the page shell".into(),
            });
        }

        if self.demo_manifest.is_empty() {
            tracing::debug!("demo_manifest is empty; demo cache will only fill lazily");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        let config = AppConfig { max_concurrency: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_concurrency"));

        let config = AppConfig { max_concurrency: 33, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_concurrency"));
    }

    #[test]
    fn test_validate_cache_version() {
        let config = AppConfig { cache_version: String::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));

        let config = AppConfig { cache_version: "v 2".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_relative_paths() {
        let config = AppConfig { scope: "struct/".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "scope"));

        let config = AppConfig { shell_path: "index.html".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "shell_path"));
    }

    #[test]
    fn test_validate_empty_primary_manifest() {
        let config = AppConfig { primary_manifest: Vec::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_ms: 100, max_concurrency: 1, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { timeout_ms: 300_000, max_concurrency: 32, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
