//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! List-valued fields take TOML array syntax in the environment, e.g.
//! `SHELLCACHE_EXCLUDED_HOSTS='["api.github.com"]'`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding the named caches.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin that relative manifest entries and request paths resolve against.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path the site is served under. Path rules match with and without it.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Prefix shared by every cache name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag embedded in the cache names.
    ///
    /// Changing it is the only way to invalidate everything cached so far.
    /// Set via SHELLCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on parallel manifest fetches.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Hosts that are never intercepted (live APIs, analytics beacons).
    #[serde(default = "default_excluded_hosts")]
    pub excluded_hosts: Vec<String>,

    /// Path prefixes served cache-first into the demo cache.
    #[serde(default = "default_demo_prefixes")]
    pub demo_prefixes: Vec<String>,

    /// Path prefixes treated as static assets.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// Path suffixes treated as static assets.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// URLs that must all be cached for a version to install.
    #[serde(default = "default_primary_manifest")]
    pub primary_manifest: Vec<String>,

    /// Optional media cached best-effort during install.
    #[serde(default = "default_demo_manifest")]
    pub demo_manifest: Vec<String>,

    /// The page shell served for navigations that miss the cache offline.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Activate a freshly installed version without waiting for SKIP_WAITING.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Register the configured version when the server starts.
    #[serde(default = "default_true")]
    pub install_on_start: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_origin() -> String {
    "https://httpdss.github.io".into()
}

fn default_scope() -> String {
    "/struct/".into()
}

fn default_cache_prefix() -> String {
    "struct-site".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_concurrency() -> usize {
    6
}

fn default_excluded_hosts() -> Vec<String> {
    vec!["api.github.com".into(), "www.googletagmanager.com".into(), "www.google-analytics.com".into()]
}

fn default_demo_prefixes() -> Vec<String> {
    vec!["/demos/".into()]
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/css/".into(), "/js/".into(), "/images/".into()]
}

fn default_static_extensions() -> Vec<String> {
    [".css", ".js", ".svg", ".png", ".jpg", ".gif"].into_iter().map(String::from).collect()
}

fn default_primary_manifest() -> Vec<String> {
    [
        "/struct/",
        "/struct/index.html",
        "/struct/css/main.css",
        "/struct/css/components.css",
        "/struct/css/animations.css",
        "/struct/css/advanced.css",
        "/struct/js/main.js",
        "/struct/js/advanced.js",
        "/struct/images/favicon.svg",
        "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&family=Fira+Code:wght@300;400;500&display=swap",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.7.2/css/all.min.css",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_demo_manifest() -> Vec<String> {
    [
        "/struct/demos/basic-usage.gif",
        "/struct/demos/yaml-config.gif",
        "/struct/demos/mappings-demo.gif",
        "/struct/demos/remote-content.gif",
        "/struct/demos/advanced-features.gif",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_shell_path() -> String {
    "/struct/index.html".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            scope: default_scope(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            excluded_hosts: default_excluded_hosts(),
            demo_prefixes: default_demo_prefixes(),
            static_prefixes: default_static_prefixes(),
            static_extensions: default_static_extensions(),
            primary_manifest: default_primary_manifest(),
            demo_manifest: default_demo_manifest(),
            shell_path: default_shell_path(),
            skip_waiting_on_install: true,
            install_on_start: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Name of the primary cache for `version`.
    pub fn primary_cache_name(&self, version: &str) -> String {
        format!("{}-{}", self.cache_prefix, version)
    }

    /// Name of the demo cache for `version`.
    pub fn demo_cache_name(&self, version: &str) -> String {
        format!("{}-{}-demos", self.cache_prefix, version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered figment `load` extracts from.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
