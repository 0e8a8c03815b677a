//! Configuration validation rules.
//!
//! This module provides validation logic for `ProxyConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::ProxyConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn require_absolute_path(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with('/') { Ok(()) } else { Err(invalid(field, format!("'{value}' must start with '/'"))) }
}

impl ProxyConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - a cache name is empty, or both names are the same
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `api_prefix`, `offline_document`, `notification_open_path` or a
    ///   `precache` entry doesn't start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if self.static_cache.trim().is_empty() {
            return Err(invalid("static_cache", "must not be empty"));
        }
        if self.dynamic_cache.trim().is_empty() {
            return Err(invalid("dynamic_cache", "must not be empty"));
        }
        if self.static_cache == self.dynamic_cache {
            return Err(invalid("dynamic_cache", "must differ from static_cache"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        require_absolute_path("api_prefix", &self.api_prefix)?;
        require_absolute_path("offline_document", &self.offline_document)?;
        require_absolute_path("notification_open_path", &self.notification_open_path)?;
        for path in &self.precache {
            require_absolute_path("precache", path)?;
        }

        if !self.precache.contains(&self.offline_document) {
            tracing::warn!(
                offline_document = %self.offline_document,
                "offline document is not pre-cached; navigations will have no placeholder until it is fetched"
            );
        }

        Ok(())
    }
}
