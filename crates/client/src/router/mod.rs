//! Request classification.
//!
//! Every intercepted request is matched against an ordered rule list; the
//! first rule whose matcher accepts the request picks the strategy. The list
//! always ends in a catch-all network-first rule, so classification is total.
//!
//! Path matchers see two paths: the raw URL path and, when the URL lies under
//! the site scope, the same path with the scope removed. That way
//! `/struct/demos/x.gif` and `/demos/x.gif` both match a `/demos/` prefix.

mod strategy;

pub use strategy::{Served, Source};

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{AppConfig, Error};
use url::Url;

use crate::fetch::{Request, resolve};

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Not intercepted: straight to the network, no cache access.
    PassThrough,
    /// Network-first into the primary cache, then the page shell.
    Navigation,
    /// Cache-first into the demo cache, then a placeholder.
    DemoAsset,
    /// Cache-first into the primary cache.
    StaticAsset,
    /// Network-first, cache on transport failure.
    NetworkFirst,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::PassThrough => "pass_through",
            Route::Navigation => "navigation",
            Route::DemoAsset => "demo_asset",
            Route::StaticAsset => "static_asset",
            Route::NetworkFirst => "network_first",
        };
        f.write_str(name)
    }
}

/// A typed predicate over a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Any method other than GET.
    NonGet,
    /// URL host is one of these.
    HostIn(Vec<String>),
    /// Top-level document load.
    Navigate,
    /// Path starts with one of these.
    PathPrefix(Vec<String>),
    /// Path starts with one of the prefixes or ends with one of the suffixes.
    PathPattern { prefixes: Vec<String>, suffixes: Vec<String> },
    Always,
}

impl Matcher {
    fn matches(&self, request: &Request, paths: &[&str]) -> bool {
        match self {
            Matcher::NonGet => !request.is_get(),
            Matcher::HostIn(hosts) => request
                .url
                .host_str()
                .is_some_and(|host| hosts.iter().any(|h| h.eq_ignore_ascii_case(host))),
            Matcher::Navigate => request.is_navigation(),
            Matcher::PathPrefix(prefixes) => {
                paths.iter().any(|path| prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())))
            }
            Matcher::PathPattern { prefixes, suffixes } => paths.iter().any(|path| {
                prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
                    || suffixes.iter().any(|suffix| path.ends_with(suffix.as_str()))
            }),
            Matcher::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub matcher: Matcher,
    pub route: Route,
}

impl Rule {
    pub fn new(matcher: Matcher, route: Route) -> Self {
        Self { matcher, route }
    }
}

/// Ordered classifier plus the strategies behind each route.
#[derive(Debug, Clone)]
pub struct Router {
    rules: Vec<Rule>,
    /// Scope without its trailing slash; empty when the site is at the root.
    scope: String,
    shell: Url,
}

impl Router {
    /// Build a router from explicit rules. A catch-all network-first rule is
    /// appended.
    pub fn new(mut rules: Vec<Rule>, scope: &str, shell: Url) -> Self {
        rules.push(Rule::new(Matcher::Always, Route::NetworkFirst));
        Self { rules, scope: scope.trim_end_matches('/').to_string(), shell }
    }

    /// The standard rule set.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let shell = resolve(&origin, &config.shell_path)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.shell_path)))?;

        let rules = vec![
            Rule::new(Matcher::NonGet, Route::PassThrough),
            Rule::new(Matcher::HostIn(config.excluded_hosts.clone()), Route::PassThrough),
            Rule::new(Matcher::Navigate, Route::Navigation),
            Rule::new(Matcher::PathPrefix(config.demo_prefixes.clone()), Route::DemoAsset),
            Rule::new(
                Matcher::PathPattern {
                    prefixes: config.static_prefixes.clone(),
                    suffixes: config.static_extensions.clone(),
                },
                Route::StaticAsset,
            ),
        ];

        Ok(Self::new(rules, &config.scope, shell))
    }

    /// URL of the page shell.
    pub fn shell(&self) -> &Url {
        &self.shell
    }

    /// The raw path and, if under the scope, the scope-relative path.
    fn paths<'a>(&self, url: &'a Url) -> Vec<&'a str> {
        let path = url.path();
        let mut paths = vec![path];
        if !self.scope.is_empty()
            && let Some(rest) = path.strip_prefix(self.scope.as_str())
            && rest.starts_with('/')
        {
            paths.push(rest);
        }
        paths
    }

    /// First matching route.
    pub fn classify(&self, request: &Request) -> Route {
        let paths = self.paths(&request.url);
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(request, &paths))
            .map_or(Route::NetworkFirst, |rule| rule.route)
    }
}
