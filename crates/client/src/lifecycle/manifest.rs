//! Manifests and versioned cache names.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{AppConfig, Error};
use url::Url;

use crate::fetch::resolve;

/// The two cache names owned by one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheNames {
    pub version: String,
    pub primary: String,
    pub demo: String,
}

impl CacheNames {
    pub fn new(config: &AppConfig, version: &str) -> Self {
        Self {
            version: version.to_string(),
            primary: config.primary_cache_name(version),
            demo: config.demo_cache_name(version),
        }
    }

    /// Whether `name` is one of this version's caches.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.primary || name == self.demo
    }
}

/// URLs fetched at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// All must be cached for the install to succeed.
    pub primary: Vec<Url>,
    /// Cached best-effort.
    pub demo: Vec<Url>,
}

impl Manifest {
    /// Resolve the configured manifests against the origin.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            primary: resolve_all(&origin, &config.primary_manifest)?,
            demo: resolve_all(&origin, &config.demo_manifest)?,
        })
    }
}

fn resolve_all(origin: &Url, entries: &[String]) -> Result<Vec<Url>, Error> {
    let mut urls: Vec<Url> = Vec::with_capacity(entries.len());
    for entry in entries {
        let url = resolve(origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))?;
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    Ok(urls)
}
