//! One controller version and the install/activate/update operations it runs.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, CachedEntry, Error};
use url::Url;

use super::{CacheNames, Lifecycle, Manifest, Phase};
use crate::batch::{join_all, join_best_effort};
use crate::fetch::{Network, Request};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub version: String,
    /// Entries written to the primary cache.
    pub primary_cached: usize,
    /// Entries written to the demo cache.
    pub demo_cached: usize,
    /// Demo URLs that could not be cached.
    pub demo_failed: Vec<String>,
    /// RFC 3339 timestamp of completion.
    pub installed_at: String,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    pub version: String,
    /// Stale caches removed, in creation order.
    pub deleted_caches: Vec<String>,
    /// The new version serves every open client immediately.
    pub clients_claimed: bool,
}

/// Result of an on-demand primary manifest refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateReport {
    pub version: String,
    pub updated: usize,
}

async fn fetch_entry(network: &dyn Network, cache_name: &str, request: &Request) -> Result<CachedEntry, Error> {
    let response = network.fetch(request).await?;
    if !response.ok() {
        return Err(Error::HttpStatus { status: response.status.as_u16(), url: request.url.to_string() });
    }
    Ok(response.to_entry(cache_name, request))
}

/// Fetch every URL past HTTP caches and store them all, or store nothing.
///
/// # Errors
///
/// Returns the first fetch failure or non-2xx status; the cache is left as
/// it was.
pub async fn populate_primary(
    db: &CacheDb, network: Arc<dyn Network>, cache_name: &str, urls: &[Url], max_concurrency: usize,
) -> Result<usize, Error> {
    let tasks: Vec<_> = urls
        .iter()
        .map(|url| {
            let network = network.clone();
            let cache_name = cache_name.to_string();
            let request = Request::get(url.clone()).reload();
            async move { fetch_entry(network.as_ref(), &cache_name, &request).await }
        })
        .collect();

    let entries = join_all(tasks, max_concurrency).await?;
    db.put_entries(cache_name, entries).await
}

/// Fetch and store each URL independently.
///
/// Returns how many were cached and which URLs failed. Failures are logged
/// one by one and never abort the rest.
pub async fn populate_demo(
    db: &CacheDb, network: Arc<dyn Network>, cache_name: &str, urls: &[Url], max_concurrency: usize,
) -> (usize, Vec<String>) {
    if let Err(e) = db.open_cache(cache_name).await {
        tracing::warn!("failed to open demo cache {cache_name}: {e}");
    }

    let tasks: Vec<_> = urls
        .iter()
        .map(|url| {
            let network = network.clone();
            let db = db.clone();
            let cache_name = cache_name.to_string();
            let request = Request::get(url.clone()).reload();
            async move {
                let entry = fetch_entry(network.as_ref(), &cache_name, &request).await?;
                db.put_entry(&entry).await
            }
        })
        .collect();

    let results = join_best_effort(tasks, max_concurrency).await;

    let mut cached = 0;
    let mut failed = Vec::new();
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(()) => cached += 1,
            Err(e) => {
                tracing::warn!(url = %url, "failed to cache demo file: {e}");
                failed.push(url.to_string());
            }
        }
    }

    (cached, failed)
}

/// One version of the cache manager.
#[derive(Debug)]
pub struct Controller {
    names: CacheNames,
    manifest: Arc<Manifest>,
    lifecycle: Lifecycle,
    skip_waiting: bool,
    max_concurrency: usize,
}

impl Controller {
    pub fn new(names: CacheNames, manifest: Arc<Manifest>, max_concurrency: usize) -> Self {
        Self { names, manifest, lifecycle: Lifecycle::new(), skip_waiting: false, max_concurrency }
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    pub fn version(&self) -> &str {
        &self.names.version
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Ask to activate as soon as installed, without waiting.
    pub fn skip_waiting(&mut self) {
        self.skip_waiting = true;
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting
    }

    /// Mark this version as replaced.
    pub fn retire(&mut self) -> Result<(), Error> {
        self.lifecycle.retire()?;
        tracing::info!(version = %self.names.version, "controller retired");
        Ok(())
    }

    /// Populate both caches.
    ///
    /// The primary manifest is all-or-nothing; the demo manifest runs
    /// alongside it best-effort.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any primary URL fails; the version
    /// is then redundant and can never activate.
    pub async fn install(&mut self, db: &CacheDb, network: Arc<dyn Network>) -> Result<InstallReport, Error> {
        self.lifecycle.begin_install()?;
        tracing::info!(version = %self.names.version, "installing");

        let primary = populate_primary(
            db,
            network.clone(),
            &self.names.primary,
            &self.manifest.primary,
            self.max_concurrency,
        );
        let demo = populate_demo(db, network, &self.names.demo, &self.manifest.demo, self.max_concurrency);
        let (primary, (demo_cached, demo_failed)) = tokio::join!(primary, demo);

        match primary {
            Ok(primary_cached) => {
                self.lifecycle.finish_install(true)?;
                tracing::info!(
                    version = %self.names.version,
                    primary_cached,
                    demo_cached,
                    demo_failed = demo_failed.len(),
                    "installation complete"
                );
                Ok(InstallReport {
                    version: self.names.version.clone(),
                    primary_cached,
                    demo_cached,
                    demo_failed,
                    installed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                })
            }
            Err(e) => {
                self.lifecycle.finish_install(false)?;
                tracing::error!(version = %self.names.version, "installation failed: {e}");
                Err(Error::InstallFailed(format!("{}: {e}", self.names.primary)))
            }
        }
    }

    /// Delete every cache that is not this version's, then take control.
    pub async fn activate(&mut self, db: &CacheDb) -> Result<ActivateReport, Error> {
        self.lifecycle.begin_activate()?;
        tracing::info!(version = %self.names.version, "activating");

        match self.prune(db).await {
            Ok(deleted_caches) => {
                self.lifecycle.finish_activate()?;
                tracing::info!(version = %self.names.version, deleted = deleted_caches.len(), "activation complete");
                Ok(ActivateReport { version: self.names.version.clone(), deleted_caches, clients_claimed: true })
            }
            Err(e) => {
                self.lifecycle.abort_activate()?;
                tracing::error!(version = %self.names.version, "activation failed: {e}");
                Err(e)
            }
        }
    }

    async fn prune(&self, db: &CacheDb) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in db.cache_names().await? {
            if self.names.is_current(&name) {
                continue;
            }
            tracing::info!("deleting old cache {name}");
            if db.delete_cache(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Snapshot what a primary refresh needs, so it can run after the caller
    /// releases its hold on this controller.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotActive` unless this version is active.
    pub fn cache_update(&self) -> Result<CacheUpdate, Error> {
        if self.phase() != Phase::Active {
            return Err(Error::NotActive(format!("version {} is {}", self.names.version, self.phase())));
        }
        Ok(CacheUpdate {
            names: self.names.clone(),
            manifest: self.manifest.clone(),
            max_concurrency: self.max_concurrency,
        })
    }

    /// Re-fetch the primary manifest and overwrite its entries.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotActive` unless this version is active, or the
    /// populate error; existing entries stay in place on failure.
    pub async fn update_cache(&self, db: &CacheDb, network: Arc<dyn Network>) -> Result<UpdateReport, Error> {
        self.cache_update()?.run(db, network).await
    }
}

/// A pending refresh of one active version's primary cache.
#[derive(Debug, Clone)]
pub struct CacheUpdate {
    names: CacheNames,
    manifest: Arc<Manifest>,
    max_concurrency: usize,
}

impl CacheUpdate {
    pub async fn run(self, db: &CacheDb, network: Arc<dyn Network>) -> Result<UpdateReport, Error> {
        tracing::info!(version = %self.names.version, "updating cache");
        let updated =
            populate_primary(db, network, &self.names.primary, &self.manifest.primary, self.max_concurrency).await?;
        tracing::info!(version = %self.names.version, updated, "cache updated");

        Ok(UpdateReport { version: self.names.version, updated })
    }
}
