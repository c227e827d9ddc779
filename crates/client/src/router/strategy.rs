//! Serving strategies and the offline catch-all.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, Error, compute_request_key};

use super::{Route, Router};
use crate::fallback;
use crate::fetch::{Destination, Network, Request, Response};
use crate::lifecycle::CacheNames;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Network,
    Cache,
    /// The cached page shell stood in for the requested page.
    Shell,
    /// A synthesized SVG.
    Placeholder,
    /// The terminal 503.
    Offline,
}

/// A response together with how it was produced.
#[derive(Debug, Clone)]
pub struct Served {
    pub route: Route,
    pub source: Source,
    pub response: Response,
}

impl Served {
    fn new(route: Route, source: Source, response: Response) -> Self {
        Self { route, source, response }
    }
}

async fn store(db: &CacheDb, cache_name: &str, request: &Request, response: &Response) {
    let entry = response.to_entry(cache_name, request);
    match db.put_entry(&entry).await {
        Ok(()) => tracing::debug!(cache = cache_name, url = %request.url, "stored"),
        Err(e) => tracing::warn!(cache = cache_name, url = %request.url, "failed to store response: {e}"),
    }
}

async fn cached(db: &CacheDb, request: &Request) -> Result<Option<Response>, Error> {
    match db.match_any(&request.key()).await? {
        Some(entry) => {
            tracing::debug!(url = %request.url, cache = %entry.cache_name, "cache hit");
            Response::from_entry(entry).map(Some)
        }
        None => {
            tracing::debug!(url = %request.url, "cache miss");
            Ok(None)
        }
    }
}

impl Router {
    /// Serve one intercepted request.
    ///
    /// # Errors
    ///
    /// Only two failures escape: a pass-through fetch that fails, and a
    /// navigation that fails with no cached shell (`Error::Offline`).
    /// Everything else is answered by the offline fallback.
    pub async fn handle(
        &self, db: &CacheDb, network: &dyn Network, names: &CacheNames, request: &Request,
    ) -> Result<Served, Error> {
        let route = self.classify(request);
        tracing::debug!(url = %request.url, route = %route, "routing");

        let outcome = match route {
            Route::PassThrough => {
                let response = network.fetch(request).await?;
                return Ok(Served::new(route, Source::Network, response));
            }
            Route::Navigation => match self.navigation(db, network, names, request).await {
                Ok(Some(served)) => Ok(served),
                Ok(None) => {
                    return Err(Error::Offline(format!("{}: no network and no cached page shell", request.url)));
                }
                Err(e) => Err(e),
            },
            Route::DemoAsset => demo_asset(db, network, names, request).await,
            Route::StaticAsset => static_asset(db, network, names, request).await,
            Route::NetworkFirst => network_first(db, network, request).await,
        };

        match outcome {
            Ok(served) => Ok(served),
            Err(e) => {
                tracing::error!(url = %request.url, route = %route, "serving failed, using offline fallback: {e}");
                Ok(self.offline_fallback(db, route, request).await)
            }
        }
    }

    /// Cached page shell, if any.
    pub async fn shell_response(&self, db: &CacheDb) -> Result<Option<Response>, Error> {
        let key = compute_request_key("GET", self.shell.as_str());
        match db.match_any(&key).await? {
            Some(entry) => Response::from_entry(entry).map(Some),
            None => Ok(None),
        }
    }

    async fn navigation(
        &self, db: &CacheDb, network: &dyn Network, names: &CacheNames, request: &Request,
    ) -> Result<Option<Served>, Error> {
        let route = Route::Navigation;
        match network.fetch(request).await {
            Ok(response) if response.ok() => {
                store(db, &names.primary, request, &response).await;
                return Ok(Some(Served::new(route, Source::Network, response)));
            }
            Ok(response) => tracing::debug!(url = %request.url, status = %response.status, "navigation not ok"),
            Err(e) => tracing::debug!(url = %request.url, "navigation fetch failed: {e}"),
        }

        if let Some(response) = cached(db, request).await? {
            return Ok(Some(Served::new(route, Source::Cache, response)));
        }

        Ok(self.shell_response(db).await?.map(|response| Served::new(route, Source::Shell, response)))
    }

    /// Last resort for a request whose strategy failed.
    async fn offline_fallback(&self, db: &CacheDb, route: Route, request: &Request) -> Served {
        if request.is_navigation() {
            match self.shell_response(db).await {
                Ok(Some(response)) => return Served::new(route, Source::Shell, response),
                Ok(None) => {}
                Err(e) => tracing::warn!("page shell lookup failed: {e}"),
            }
        }

        if request.destination == Destination::Image {
            return Served::new(route, Source::Placeholder, fallback::image_placeholder());
        }

        Served::new(route, Source::Offline, fallback::offline_response())
    }
}

async fn demo_asset(
    db: &CacheDb, network: &dyn Network, names: &CacheNames, request: &Request,
) -> Result<Served, Error> {
    let route = Route::DemoAsset;
    if let Some(response) = cached(db, request).await? {
        return Ok(Served::new(route, Source::Cache, response));
    }

    match network.fetch(request).await {
        Ok(response) if response.ok() => {
            store(db, &names.demo, request, &response).await;
            Ok(Served::new(route, Source::Network, response))
        }
        Ok(response) => {
            tracing::debug!(url = %request.url, status = %response.status, "demo file not found");
            Ok(Served::new(route, Source::Placeholder, fallback::demo_placeholder(&request.url)))
        }
        Err(e) => {
            tracing::debug!(url = %request.url, "demo fetch failed: {e}");
            Ok(Served::new(route, Source::Placeholder, fallback::demo_placeholder(&request.url)))
        }
    }
}

async fn static_asset(
    db: &CacheDb, network: &dyn Network, names: &CacheNames, request: &Request,
) -> Result<Served, Error> {
    let route = Route::StaticAsset;
    if let Some(response) = cached(db, request).await? {
        return Ok(Served::new(route, Source::Cache, response));
    }

    let response = network.fetch(request).await?;
    if !response.ok() {
        return Err(Error::HttpStatus { status: response.status.as_u16(), url: request.url.to_string() });
    }
    store(db, &names.primary, request, &response).await;
    Ok(Served::new(route, Source::Network, response))
}

async fn network_first(db: &CacheDb, network: &dyn Network, request: &Request) -> Result<Served, Error> {
    let route = Route::NetworkFirst;
    match network.fetch(request).await {
        Ok(response) => Ok(Served::new(route, Source::Network, response)),
        Err(e) => match cached(db, request).await? {
            Some(response) => Ok(Served::new(route, Source::Cache, response)),
            None => Err(e),
        },
    }
}
