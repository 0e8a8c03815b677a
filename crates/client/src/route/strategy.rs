//! Caching strategies.
//!
//! Within one request the cache write always follows the successful network
//! read and is awaited before the response is handed back. The write runs in
//! its own task, so a caller that drops the request mid-way never aborts it.
//! Storage failures never fail a request: reads count as a miss and writes
//! are dropped. Only a transport failure triggers the cache and placeholder
//! fallbacks; any other network error is returned as-is.

use std::sync::Arc;

use cours_offline_core::{CacheStorage, Error, ProxyRequest, ProxyResponse, RequestIdentity, VersionSet};
use schemars::JsonSchema;
use serde::Serialize;
use url::Url;

use super::{RequestClass, Strategy, classify};
use crate::fetch::Network;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineFallback,
}

/// A response handed back to the application.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: ProxyResponse,
    pub source: ResponseSource,
    pub class: RequestClass,
}

/// Settings the router needs from the proxy configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub api_prefix: String,
    /// Absolute URL of the offline placeholder document.
    pub offline_document: Url,
    /// Store responses to methods other than GET.
    pub cache_unsafe_methods: bool,
}

/// Applies the strategy of each request class against the network and the
/// current generations.
pub struct Router {
    network: Arc<dyn Network>,
    storage: Arc<dyn CacheStorage>,
    config: RouterConfig,
}

impl Router {
    pub fn new(network: Arc<dyn Network>, storage: Arc<dyn CacheStorage>, config: RouterConfig) -> Self {
        Self { network, storage, config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn classify(&self, request: &ProxyRequest) -> RequestClass {
        classify(request, &self.config.api_prefix)
    }

    /// Serve `request` using the strategy of its class.
    pub async fn handle(&self, request: &ProxyRequest, versions: &VersionSet) -> Result<Served, Error> {
        let class = self.classify(request);
        let strategy = class.strategy();
        tracing::debug!(method = %request.method, url = %request.url, ?class, ?strategy, "routing request");

        let (response, source) = match strategy {
            Strategy::NetworkOnly => self.network_only(request).await?,
            Strategy::CacheFirst => self.cache_first(request, versions).await?,
            Strategy::NetworkFirstWithPlaceholder => self.network_first_with_placeholder(request, versions).await?,
            Strategy::NetworkFirst => self.network_first(request, versions).await?,
        };

        Ok(Served { response, source, class })
    }

    async fn network_only(&self, request: &ProxyRequest) -> Result<(ProxyResponse, ResponseSource), Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok((response, ResponseSource::Network)),
            Err(err) if !err.is_network_failure() => Err(err),
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "network failed, trying cache");
                match self.lookup(&RequestIdentity::of(request)).await {
                    Some(cached) => Ok((cached, ResponseSource::Cache)),
                    None => Err(err),
                }
            }
        }
    }

    async fn cache_first(
        &self, request: &ProxyRequest, versions: &VersionSet,
    ) -> Result<(ProxyResponse, ResponseSource), Error> {
        let identity = RequestIdentity::of(request);
        if let Some(cached) = self.lookup(&identity).await {
            tracing::debug!("cache hit for {}", request.url);
            return Ok((cached, ResponseSource::Cache));
        }

        tracing::debug!("cache miss for {}", request.url);
        let response = self.network.fetch(request).await?;
        self.store(request, &versions.dynamic_cache, identity, response.clone()).await;
        Ok((response, ResponseSource::Network))
    }

    async fn network_first_with_placeholder(
        &self, request: &ProxyRequest, versions: &VersionSet,
    ) -> Result<(ProxyResponse, ResponseSource), Error> {
        let identity = RequestIdentity::of(request);
        let err = match self.network.fetch(request).await {
            Ok(response) => {
                self.store(request, &versions.dynamic_cache, identity, response.clone()).await;
                return Ok((response, ResponseSource::Network));
            }
            Err(err) if !err.is_network_failure() => return Err(err),
            Err(err) => err,
        };

        tracing::warn!(url = %request.url, error = %err, "navigation offline");
        if let Some(cached) = self.lookup(&identity).await {
            return Ok((cached, ResponseSource::Cache));
        }

        let placeholder = RequestIdentity::new("GET", self.config.offline_document.as_str());
        match self.lookup(&placeholder).await {
            Some(offline) => Ok((offline, ResponseSource::OfflineFallback)),
            None => Err(Error::NoResponse(format!("{}: {}", request.url, err))),
        }
    }

    async fn network_first(
        &self, request: &ProxyRequest, versions: &VersionSet,
    ) -> Result<(ProxyResponse, ResponseSource), Error> {
        let identity = RequestIdentity::of(request);
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(request, &versions.dynamic_cache, identity, response.clone()).await;
                }
                Ok((response, ResponseSource::Network))
            }
            Err(err) if !err.is_network_failure() => Err(err),
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "network failed, trying cache");
                match self.lookup(&identity).await {
                    Some(cached) => Ok((cached, ResponseSource::Cache)),
                    None => Err(err),
                }
            }
        }
    }

    /// Look `identity` up in every generation. Storage failures count as a miss.
    async fn lookup(&self, identity: &RequestIdentity) -> Option<ProxyResponse> {
        match self.storage.match_any(identity).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(url = %identity.url, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write a copy of `response` into `generation`.
    async fn store(&self, request: &ProxyRequest, generation: &str, identity: RequestIdentity, response: ProxyResponse) {
        if !request.is_cacheable_method() && !self.config.cache_unsafe_methods {
            tracing::debug!(method = %request.method, url = %request.url, "not caching non-GET response");
            return;
        }

        let storage = Arc::clone(&self.storage);
        let generation = generation.to_string();
        let write = tokio::spawn(async move {
            if let Err(err) = storage.put(&generation, &identity, &response).await {
                tracing::warn!(url = %identity.url, generation = %generation, error = %err, "cache write dropped");
            }
        });

        if let Err(err) = write.await {
            tracing::warn!(error = %err, "cache write task failed");
        }
    }
}
