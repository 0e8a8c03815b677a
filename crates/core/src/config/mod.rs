//! Proxy configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (COURS_OFFLINE_*)
//! 2. TOML config file (if COURS_OFFLINE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::VersionSet;

mod validation;

pub use validation::ConfigError;

/// Assets fetched into the static generation at install time.
pub const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/manifest.json",
    "/offline.html",
    "/_next/static/css/app/layout.css",
    "/_next/static/chunks/webpack.js",
    "/_next/static/chunks/main-app.js",
    "/_next/static/chunks/app/page.js",
    "/_next/static/chunks/app/layout.js",
];

/// Proxy configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (COURS_OFFLINE_*)
/// 2. TOML config file (if COURS_OFFLINE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Application root that relative paths are resolved against.
    ///
    /// Set via COURS_OFFLINE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite database holding every cache generation.
    ///
    /// Set via COURS_OFFLINE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network stack timeout in milliseconds. The strategies add none of their own.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Path prefix marking application data calls.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Name of the current static generation.
    #[serde(default = "default_static_cache")]
    pub static_cache: String,

    /// Name of the current dynamic generation.
    #[serde(default = "default_dynamic_cache")]
    pub dynamic_cache: String,

    /// Document served to navigations when network and cache both fail.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Pre-warm manifest, paths relative to the origin.
    ///
    /// Set via COURS_OFFLINE_PRECACHE as a TOML array, e.g. `["/", "/app.js"]`.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Activate right after install instead of waiting for SKIP_WAITING.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Also store successful responses to non-GET/HEAD requests.
    #[serde(default)]
    pub cache_unsafe_methods: bool,

    /// View opened when the `explore` notification action is clicked.
    #[serde(default = "default_notification_open_path")]
    pub notification_open_path: String,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./cours-offline-cache.sqlite")
}

fn default_user_agent() -> String {
    "cours-offline/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_static_cache() -> String {
    "cours-app-static-v1".into()
}

fn default_dynamic_cache() -> String {
    "cours-app-dynamic-v1".into()
}

fn default_offline_document() -> String {
    "/offline.html".into()
}

fn default_precache() -> Vec<String> {
    DEFAULT_PRECACHE.iter().map(|p| p.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_notification_open_path() -> String {
    "/".into()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            api_prefix: default_api_prefix(),
            static_cache: default_static_cache(),
            dynamic_cache: default_dynamic_cache(),
            offline_document: default_offline_document(),
            precache: default_precache(),
            skip_waiting_on_install: true,
            cache_unsafe_methods: false,
            notification_open_path: default_notification_open_path(),
        }
    }
}

impl ProxyConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The current version set {static, dynamic}.
    pub fn versions(&self) -> VersionSet {
        VersionSet::new(&self.static_cache, &self.dynamic_cache)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `COURS_OFFLINE_`
    /// 2. TOML file from `COURS_OFFLINE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("COURS_OFFLINE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("COURS_OFFLINE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.db_path, PathBuf::from("./cours-offline-cache.sqlite"));
        assert_eq!(config.user_agent, "cours-offline/0.1");
        assert_eq!(config.api_prefix, "/api/");
        assert_eq!(config.static_cache, "cours-app-static-v1");
        assert_eq!(config.dynamic_cache, "cours-app-dynamic-v1");
        assert_eq!(config.offline_document, "/offline.html");
        assert!(config.precache.contains(&"/offline.html".to_string()));
        assert_eq!(config.precache[0], "/");
        assert!(config.skip_waiting_on_install);
        assert!(!config.cache_unsafe_methods);
    }

    #[test]
    fn test_timeout_duration() {
        let config = ProxyConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_versions() {
        let config = ProxyConfig::default();
        let versions = config.versions();
        assert!(versions.contains("cours-app-static-v1"));
        assert!(versions.contains("cours-app-dynamic-v1"));
        assert!(!versions.contains("cours-app-v1"));
    }

    #[test]
    fn test_origin_url() {
        let config = ProxyConfig { origin: "https://cours.local".into(), ..Default::default() };
        assert_eq!(config.origin_url().unwrap().as_str(), "https://cours.local/");

        let config = ProxyConfig { origin: "ftp://cours.local".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { .. })));

        let config = ProxyConfig { origin: "/relative".into(), ..Default::default() };
        assert!(config.origin_url().is_err());
    }

    #[test]
    fn test_toml_layer() {
        let figment = Figment::from(Serialized::defaults(ProxyConfig::default())).merge(Toml::string(
            r#"
            origin = "https://cours.local"
            static_cache = "static-v2"
            precache = ["/", "/app.js"]
            "#,
        ));
        let config: ProxyConfig = figment.extract().unwrap();
        assert_eq!(config.origin, "https://cours.local");
        assert_eq!(config.static_cache, "static-v2");
        assert_eq!(config.dynamic_cache, "cours-app-dynamic-v1");
        assert_eq!(config.precache, vec!["/", "/app.js"]);
    }
}
