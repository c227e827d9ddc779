//! The registration: active and waiting controller versions behind one entry
//! point.
//!
//! A registration owns at most one active version, which serves requests,
//! and at most one waiting version, which installed successfully and is
//! waiting for `SKIP_WAITING`. Installs run without the slot lock held, so a
//! slow install never blocks request handling.
//!
//! Lifecycle operations (register, skip waiting, update) are serialized by a
//! separate guard. Request handling never takes it.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shellcache_core::{AppConfig, CacheDb, CacheInfo, Error};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::fetch::{Network, Request, resolve};
use crate::lifecycle::{ActivateReport, CacheNames, Controller, InstallReport, Manifest, Phase};
use crate::messages::{ControlMessage, MessageOutcome};
use crate::notify::{self, BACKGROUND_SYNC_TAG, ClickOutcome, Notification, PushPayload};
use crate::router::{Route, Router, Served, Source};

#[derive(Debug, Default)]
struct Slots {
    active: Option<Controller>,
    waiting: Option<Controller>,
}

/// Outcome of registering a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegisterReport {
    pub version: String,
    pub phase: Phase,
    /// Absent when the version was already registered.
    pub install: Option<InstallReport>,
    /// Absent while the version waits.
    pub activation: Option<ActivateReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VersionStatus {
    pub version: String,
    pub phase: Phase,
    pub primary_cache: String,
    pub demo_cache: String,
}

impl VersionStatus {
    fn of(controller: &Controller) -> Self {
        let names = controller.names();
        Self {
            version: names.version.clone(),
            phase: controller.phase(),
            primary_cache: names.primary.clone(),
            demo_cache: names.demo.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegistrationStatus {
    pub active: Option<VersionStatus>,
    pub waiting: Option<VersionStatus>,
    pub caches: Vec<CacheInfo>,
}

/// The offline cache manager.
pub struct Registration {
    db: CacheDb,
    network: Arc<dyn Network>,
    config: Arc<AppConfig>,
    manifest: Arc<Manifest>,
    router: Router,
    origin: Url,
    slots: RwLock<Slots>,
    /// Held for the whole of any operation that installs, activates or
    /// rewrites caches.
    transitions: Mutex<()>,
}

impl Registration {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, config: Arc<AppConfig>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = Arc::new(Manifest::from_config(&config)?);
        let router = Router::from_config(&config)?;
        Ok(Self {
            db,
            network,
            config,
            manifest,
            router,
            origin,
            slots: RwLock::new(Slots::default()),
            transitions: Mutex::new(()),
        })
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Resolve a possibly relative URL against the origin.
    pub fn resolve_url(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    /// Install a version and, unless it has to wait, activate it.
    ///
    /// `None` registers the configured version. Registering the version that
    /// is already active or waiting does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` when the primary manifest could not be
    /// cached. The previously active version keeps serving.
    pub async fn register(&self, version: Option<&str>) -> Result<RegisterReport, Error> {
        let version = version.unwrap_or(self.config.cache_version.as_str()).trim();
        if version.is_empty() || version.chars().any(char::is_whitespace) {
            return Err(Error::InvalidInput(format!("invalid version: {version:?}")));
        }

        let _transition = self.transitions.lock().await;
        {
            let slots = self.slots.read().await;
            let existing = slots.active.iter().chain(slots.waiting.iter()).find(|c| c.version() == version);
            if let Some(existing) = existing {
                tracing::debug!(version, "version already registered");
                return Ok(RegisterReport {
                    version: version.to_string(),
                    phase: existing.phase(),
                    install: None,
                    activation: None,
                });
            }
        }

        let names = CacheNames::new(&self.config, version);
        let mut controller = Controller::new(names, self.manifest.clone(), self.config.max_concurrency);
        let install = controller.install(&self.db, self.network.clone()).await?;
        if self.config.skip_waiting_on_install {
            controller.skip_waiting();
        }

        let mut slots = self.slots.write().await;
        if slots.active.is_some() && !controller.skip_waiting_requested() {
            tracing::info!(version, "installed, waiting to activate");
            if let Some(mut replaced) = slots.waiting.replace(controller) {
                replaced.retire()?;
            }
            return Ok(RegisterReport {
                version: version.to_string(),
                phase: Phase::Installed,
                install: Some(install),
                activation: None,
            });
        }

        let activation = self.promote(&mut slots, controller).await?;
        Ok(RegisterReport {
            version: version.to_string(),
            phase: Phase::Active,
            install: Some(install),
            activation: Some(activation),
        })
    }

    async fn promote(&self, slots: &mut Slots, mut controller: Controller) -> Result<ActivateReport, Error> {
        match controller.activate(&self.db).await {
            Ok(report) => {
                if let Some(mut previous) = slots.active.replace(controller) {
                    previous.retire()?;
                }
                Ok(report)
            }
            Err(e) => {
                slots.waiting = Some(controller);
                Err(e)
            }
        }
    }

    /// Activate the waiting version, if there is one.
    pub async fn skip_waiting(&self) -> Result<MessageOutcome, Error> {
        let _transition = self.transitions.lock().await;
        let mut slots = self.slots.write().await;
        let Some(mut controller) = slots.waiting.take() else {
            tracing::debug!("skip waiting with nothing waiting");
            return Ok(MessageOutcome::NothingWaiting);
        };
        controller.skip_waiting();
        let report = self.promote(&mut slots, controller).await?;
        Ok(MessageOutcome::Activated { report })
    }

    /// Re-populate the active version's primary cache. Never fails; a failed
    /// update is logged and reported.
    pub async fn update_cache(&self) -> MessageOutcome {
        let _transition = self.transitions.lock().await;
        let update = match self.slots.read().await.active.as_ref() {
            Some(controller) => controller.cache_update(),
            None => Err(Error::NotActive("no active version".into())),
        };
        let result = match update {
            Ok(update) => update.run(&self.db, self.network.clone()).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => MessageOutcome::Updated { report },
            Err(e) => {
                tracing::warn!("cache update failed: {e}");
                MessageOutcome::UpdateFailed { error: e.to_string() }
            }
        }
    }

    /// Dispatch a control message.
    pub async fn post_message(&self, data: &Value) -> Result<MessageOutcome, Error> {
        match ControlMessage::parse(data) {
            Some(ControlMessage::SkipWaiting) => self.skip_waiting().await,
            Some(ControlMessage::UpdateCache) => Ok(self.update_cache().await),
            Some(ControlMessage::Unknown) | None => {
                tracing::debug!(message = %data, "ignoring message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Serve a request through the active version, or straight from the
    /// network when nothing is active.
    pub async fn handle(&self, request: &Request) -> Result<Served, Error> {
        let names = self.slots.read().await.active.as_ref().map(|c| c.names().clone());
        match names {
            Some(names) => self.router.handle(&self.db, self.network.as_ref(), &names, request).await,
            None => {
                let response = self.network.fetch(request).await?;
                Ok(Served { route: Route::PassThrough, source: Source::Network, response })
            }
        }
    }

    /// Icon used for notifications.
    pub fn icon(&self) -> String {
        let scope = self.config.scope.trim_end_matches('/');
        format!("{scope}/images/favicon.svg")
    }

    pub fn push(&self, payload: PushPayload) -> Notification {
        tracing::info!(title = %payload.title, "push received");
        Notification::from_push(payload, &self.icon())
    }

    pub fn notification_click(&self, action: &str) -> ClickOutcome {
        tracing::debug!(action, "notification clicked");
        notify::notification_click(action)
    }

    /// Handle a sync event. Returns whether the tag was recognized.
    pub fn sync(&self, tag: &str) -> bool {
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!(tag, "ignoring sync");
            return false;
        }
        tracing::info!("background sync triggered");
        true
    }

    pub async fn status(&self) -> Result<RegistrationStatus, Error> {
        let (active, waiting) = {
            let slots = self.slots.read().await;
            (slots.active.as_ref().map(VersionStatus::of), slots.waiting.as_ref().map(VersionStatus::of))
        };
        let caches = self.db.list_caches().await?;
        Ok(RegistrationStatus { active, waiting, caches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockNetwork;
    use crate::fetch::{CacheMode, Destination, Response};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    const ORIGIN: &str = "https://site.test";

    fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    fn config() -> AppConfig {
        AppConfig {
            origin: ORIGIN.into(),
            primary_manifest: vec!["/struct/".into(), "/struct/index.html".into(), "/struct/css/main.css".into()],
            demo_manifest: ["basic-usage", "yaml-config", "mappings-demo", "remote-content", "advanced-features"]
                .iter()
                .map(|name| format!("/struct/demos/{name}.gif"))
                .collect(),
            ..AppConfig::default()
        }
    }

    fn site() -> Arc<MockNetwork> {
        let mut network = MockNetwork::new()
            .with_body(&url("/struct/"), "text/html", "<html>home</html>")
            .with_body(&url("/struct/index.html"), "text/html", "<html>shell</html>")
            .with_body(&url("/struct/css/main.css"), "text/css", "body{}");
        for name in ["basic-usage", "yaml-config", "mappings-demo", "remote-content", "advanced-features"] {
            network = network.with_body(&url(&format!("/struct/demos/{name}.gif")), "image/gif", "GIF89a");
        }
        Arc::new(network)
    }

    async fn registration(config: AppConfig, network: Arc<MockNetwork>) -> Registration {
        let db = CacheDb::open_in_memory().await.unwrap();
        Registration::new(db, network, Arc::new(config)).unwrap()
    }

    async fn sorted_cache_names(reg: &Registration) -> Vec<String> {
        let mut names = reg.db().cache_names().await.unwrap();
        names.sort_unstable();
        names
    }

    fn get(path: &str) -> Request {
        Request::get(Url::parse(&url(path)).unwrap())
    }

    /// Delays every reload fetch once `slow` is set.
    struct SlowReloads {
        inner: Arc<MockNetwork>,
        delay: Duration,
        slow: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Network for SlowReloads {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            if request.cache == CacheMode::Reload && self.slow.load(Ordering::SeqCst) {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.fetch(request).await
        }
    }

    #[tokio::test]
    async fn test_register_installs_and_activates() {
        let reg = registration(config(), site()).await;
        let report = reg.register(None).await.unwrap();

        assert_eq!(report.version, "v1");
        assert_eq!(report.phase, Phase::Active);
        assert_eq!(report.install.unwrap().primary_cached, 3);
        assert!(report.activation.unwrap().clients_claimed);

        let status = reg.status().await.unwrap();
        assert_eq!(status.active.unwrap().primary_cache, "struct-site-v1");
        assert!(status.waiting.is_none());
        let mut names: Vec<_> = status.caches.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["struct-site-v1", "struct-site-v1-demos"]);
    }

    #[tokio::test]
    async fn test_register_same_version_is_noop() {
        let network = site();
        let reg = registration(config(), network.clone()).await;
        reg.register(None).await.unwrap();
        let calls = network.call_count();

        let again = reg.register(Some("v1")).await.unwrap();
        assert!(again.install.is_none());
        assert_eq!(network.call_count(), calls);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_version() {
        let reg = registration(config(), site()).await;
        assert!(matches!(reg.register(Some("v 2")).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_version() {
        let network = site();
        let reg = registration(config(), network.clone()).await;
        reg.register(Some("v1")).await.unwrap();

        network.fail(&url("/struct/css/main.css"));
        let result = reg.register(Some("v2")).await;
        assert!(matches!(result, Err(Error::InstallFailed(_))));

        let status = reg.status().await.unwrap();
        assert_eq!(status.active.unwrap().version, "v1");
        assert!(status.waiting.is_none());
        assert!(reg.db().has_cache("struct-site-v1").await.unwrap());
        assert_eq!(reg.db().count_entries("struct-site-v2").await.unwrap(), 0);

        network.set_offline(true);
        let served = reg.handle(&get("/struct/css/main.css")).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.text(), "body{}");
    }

    #[tokio::test]
    async fn test_new_version_prunes_old_caches() {
        let reg = registration(config(), site()).await;
        reg.register(Some("v1")).await.unwrap();
        let report = reg.register(Some("v2")).await.unwrap();

        let mut deleted = report.activation.unwrap().deleted_caches;
        deleted.sort_unstable();
        assert_eq!(deleted, vec!["struct-site-v1", "struct-site-v1-demos"]);
        assert_eq!(sorted_cache_names(&reg).await, vec!["struct-site-v2", "struct-site-v2-demos"]);
    }

    #[tokio::test]
    async fn test_waiting_version_activates_on_skip_waiting() {
        let config = AppConfig { skip_waiting_on_install: false, ..config() };
        let reg = registration(config, site()).await;

        let first = reg.register(Some("v1")).await.unwrap();
        assert_eq!(first.phase, Phase::Active);

        let second = reg.register(Some("v2")).await.unwrap();
        assert_eq!(second.phase, Phase::Installed);
        assert!(second.activation.is_none());
        let status = reg.status().await.unwrap();
        assert_eq!(status.active.unwrap().version, "v1");
        assert_eq!(status.waiting.unwrap().version, "v2");

        let outcome = reg.post_message(&json!({"type": "SKIP_WAITING"})).await.unwrap();
        let MessageOutcome::Activated { report } = outcome else {
            panic!("expected activation, got {outcome:?}");
        };
        assert_eq!(report.version, "v2");
        assert_eq!(sorted_cache_names(&reg).await, vec!["struct-site-v2", "struct-site-v2-demos"]);

        let again = reg.post_message(&json!({"type": "SKIP_WAITING"})).await.unwrap();
        assert_eq!(again, MessageOutcome::NothingWaiting);
    }

    #[tokio::test]
    async fn test_update_cache_message() {
        let network = site();
        let reg = registration(config(), network.clone()).await;

        let before = reg.post_message(&json!({"type": "UPDATE_CACHE"})).await.unwrap();
        assert!(matches!(before, MessageOutcome::UpdateFailed { .. }));

        reg.register(None).await.unwrap();
        network.set_reply(&url("/struct/css/main.css"), StatusCode::OK, "text/css", "p{}");
        let outcome = reg.post_message(&json!({"type": "UPDATE_CACHE"})).await.unwrap();
        assert!(matches!(outcome, MessageOutcome::Updated { report } if report.updated == 3));

        network.set_offline(true);
        let served = reg.handle(&get("/struct/css/main.css")).await.unwrap();
        assert_eq!(served.response.text(), "p{}");

        let failed = reg.post_message(&json!({"type": "UPDATE_CACHE"})).await.unwrap();
        assert!(matches!(failed, MessageOutcome::UpdateFailed { .. }));
        let served = reg.handle(&get("/struct/css/main.css")).await.unwrap();
        assert_eq!(served.response.text(), "p{}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_registrations_keep_active_caches() {
        let reg = registration(config(), site()).await;
        reg.register(Some("v1")).await.unwrap();

        let (v2, v3) = tokio::join!(reg.register(Some("v2")), reg.register(Some("v3")));
        assert_eq!(v2.unwrap().phase, Phase::Active);
        assert_eq!(v3.unwrap().phase, Phase::Active);

        let active = reg.status().await.unwrap().active.unwrap();
        assert_eq!(reg.db().count_entries(&active.primary_cache).await.unwrap(), 3);
        assert_eq!(reg.db().count_entries(&active.demo_cache).await.unwrap(), 5);
        assert_eq!(sorted_cache_names(&reg).await, vec![active.primary_cache, active.demo_cache]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cache_hit_not_delayed_by_update() {
        let network =
            Arc::new(SlowReloads { inner: site(), delay: Duration::from_millis(200), slow: AtomicBool::new(false) });
        let config = AppConfig { skip_waiting_on_install: false, max_concurrency: 1, ..config() };
        let db = CacheDb::open_in_memory().await.unwrap();
        let reg = Arc::new(Registration::new(db, network.clone(), Arc::new(config)).unwrap());
        reg.register(Some("v1")).await.unwrap();
        reg.register(Some("v2")).await.unwrap();
        network.slow.store(true, Ordering::SeqCst);

        let update = tokio::spawn({
            let reg = reg.clone();
            async move { reg.update_cache().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let skip = tokio::spawn({
            let reg = reg.clone();
            async move { reg.skip_waiting().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        let served = reg.handle(&get("/struct/css/main.css")).await.unwrap();
        let elapsed = started.elapsed();
        assert_eq!(served.source, Source::Cache);
        assert!(elapsed < Duration::from_millis(150), "cache hit took {elapsed:?}");

        assert!(matches!(update.await.unwrap(), MessageOutcome::Updated { report } if report.version == "v1"));
        let skipped = skip.await.unwrap().unwrap();
        assert!(matches!(skipped, MessageOutcome::Activated { report } if report.version == "v2"));
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let reg = registration(config(), site()).await;
        assert_eq!(reg.post_message(&json!({"type": "PING"})).await.unwrap(), MessageOutcome::Ignored);
        assert_eq!(reg.post_message(&json!(null)).await.unwrap(), MessageOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_handle_without_active_version_passes_through() {
        let network = site();
        let reg = registration(config(), network.clone()).await;

        let served = reg.handle(&get("/struct/css/main.css")).await.unwrap();
        assert_eq!(served.route, Route::PassThrough);
        assert_eq!(served.source, Source::Network);
        assert!(reg.db().cache_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_scenarios() {
        let network = site();
        let reg = registration(config(), network.clone()).await;
        reg.register(None).await.unwrap();
        network.set_offline(true);

        let nav = Request::navigate(Url::parse(&url("/struct/guide/")).unwrap());
        let served = reg.handle(&nav).await.unwrap();
        assert_eq!(served.source, Source::Shell);
        assert_eq!(served.response.text(), "<html>shell</html>");

        let demo = reg.handle(&get("/struct/demos/basic-usage.gif")).await.unwrap();
        assert_eq!(demo.source, Source::Cache);

        let missing = reg.handle(&get("/demos/unknown.gif")).await.unwrap();
        assert_eq!(missing.source, Source::Placeholder);
        assert!(missing.response.text().contains("unknown.gif"));

        let image = get("/struct/photo").with_destination(Destination::Image);
        let served = reg.handle(&image).await.unwrap();
        assert_eq!(served.source, Source::Placeholder);
        assert!(served.response.text().contains("Image Offline"));
    }

    #[tokio::test]
    async fn test_resolve_url() {
        let reg = registration(config(), site()).await;
        assert_eq!(reg.resolve_url("/struct/").unwrap().as_str(), "https://site.test/struct/");
        assert!(reg.resolve_url("ftp://x/y").is_err());
    }

    #[tokio::test]
    async fn test_push_click_sync() {
        let reg = registration(config(), site()).await;

        let notification = reg.push(PushPayload { title: "Hello".into(), body: "World".into() });
        assert_eq!(notification.icon, "/struct/images/favicon.svg");
        assert_eq!(notification.actions.len(), 2);

        assert_eq!(reg.notification_click("view").open_window.as_deref(), Some("/"));
        assert!(reg.notification_click("dismiss").open_window.is_none());

        assert!(reg.sync("background-sync"));
        assert!(!reg.sync("other"));
    }
}
