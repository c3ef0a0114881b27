//! Cached HTTP fetching of named plugin sources.
//!
//! Parser variants never build URLs or talk to the cache themselves. They declare a
//! [`SourceMap`] (logical name → URL template with one `{}` for the plugin id) and
//! call [`PluginFetcher::fetch`], which:
//!
//! 1. resolves the template and appends the optional query suffix,
//! 2. returns a fresh cache entry without touching the network,
//! 3. otherwise performs a GET with a bounded timeout and caches a 2xx body,
//! 4. falls back to a stale cache entry, or `None`, when the request fails.
//!
//! Failures are logged, never returned: a missing source is "no content".

use crate::cache::{CacheStore, Cached, cache_key};
use crate::config::Config;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Logical source names mapped to URL templates
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    templates: HashMap<String, String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. The template must contain exactly one `{}`.
    pub fn with(mut self, name: &str, template: impl Into<String>) -> Self {
        let template = template.into();
        debug_assert_eq!(
            template.matches("{}").count(),
            1,
            "source template {template:?} needs exactly one placeholder"
        );
        self.templates.insert(name.to_string(), template);
        self
    }

    pub fn template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Resolve `name` for `plugin`
    pub fn resolve(&self, name: &str, plugin: &str) -> Option<String> {
        self.template(name)
            .map(|template| template.replacen("{}", plugin, 1))
    }
}

/// HTTP client plus response cache, shared by every plugin
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl Fetcher {
    pub fn new(cache: Arc<dyn CacheStore>, config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("plugin-feed/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            cache,
            ttl: config.cache_ttl,
        })
    }

    /// Scope this fetcher to one plugin and its sources
    pub fn for_plugin<'a>(
        &'a self,
        plugin: &'a str,
        sources: &'a SourceMap,
    ) -> PluginFetcher<'a> {
        PluginFetcher {
            fetcher: self,
            plugin,
            sources,
        }
    }

    /// Fetch a fully resolved URL through the cache
    pub async fn fetch_url(&self, url: &str) -> Option<String> {
        let key = cache_key(url);
        let cached = self.cache.get(&key);

        if let Some(Cached { value, fresh: true }) = &cached {
            tracing::debug!("Cache hit for {}", url);
            return Some(value.clone());
        }

        match self.get(url).await {
            Ok(body) => {
                if let Err(err) = self.cache.set(&key, &body, self.ttl) {
                    tracing::warn!("Failed to cache {}: {}", url, err);
                }
                Some(body)
            }
            Err(err) => match cached {
                Some(stale) => {
                    tracing::warn!("Fetching {} failed ({}), using stale cache", url, err);
                    Some(stale.value)
                }
                None => {
                    tracing::warn!("Fetching {} failed: {}", url, err);
                    None
                }
            },
        }
    }

    async fn get(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// A [`Fetcher`] bound to one plugin id and its source templates
#[derive(Clone, Copy)]
pub struct PluginFetcher<'a> {
    fetcher: &'a Fetcher,
    plugin: &'a str,
    sources: &'a SourceMap,
}

impl PluginFetcher<'_> {
    pub fn plugin(&self) -> &str {
        self.plugin
    }

    /// URL of a source, without any appended query
    pub fn url(&self, source: &str) -> Option<String> {
        self.sources.resolve(source, self.plugin)
    }

    /// Fetch a named source. `append` is added verbatim to the resolved URL.
    pub async fn fetch(&self, source: &str, append: Option<&str>) -> Option<String> {
        let Some(mut url) = self.url(source) else {
            tracing::warn!("Unknown source {:?} for {}", source, self.plugin);
            return None;
        };
        if let Some(append) = append {
            url.push_str(append);
        }
        self.fetcher.fetch_url(&url).await
    }
}
