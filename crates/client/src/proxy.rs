//! The offline proxy as seen by the embedding application.
//!
//! [`OfflineProxy`] wires the cache storage, the network, the registration
//! and the control channel together. Every entry point is safe to call
//! concurrently from independent tasks.

use std::sync::Arc;

use cours_offline_core::{
    CacheStorage, ControlMessage, Destination, Error, Notification, ProxyConfig, ProxyRequest, VersionSet,
};
use schemars::JsonSchema;
use serde::Serialize;
use url::Url;

use crate::control::{ControlChannel, Notifier};
use crate::fetch::{Network, resolve};
use crate::lifecycle::{LifecycleState, Registration, Worker};
use crate::route::{ResponseSource, Router, RouterConfig, Served};

/// Snapshot of one proxy instance.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WorkerStatus {
    pub id: u64,
    pub state: LifecycleState,
    pub versions: VersionSet,
}

impl WorkerStatus {
    async fn of(worker: &Worker) -> Self {
        Self { id: worker.id(), state: worker.state().await, versions: worker.versions().clone() }
    }
}

/// Registration slots at a point in time.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ProxyStatus {
    pub origin: String,
    pub installing: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub active: Option<WorkerStatus>,
}

/// One cache generation and how many entries it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub entries: u64,
    /// Part of the active instance's version set.
    pub current: bool,
}

pub struct OfflineProxy {
    origin: Url,
    versions: VersionSet,
    manifest: Vec<Url>,
    skip_waiting_on_install: bool,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    registration: Arc<Registration>,
    router: Router,
    control: ControlChannel,
}

impl OfflineProxy {
    /// Build a proxy from `config`. Nothing is installed until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin, the offline document or a
    /// manifest entry cannot be resolved.
    pub fn new(
        config: &ProxyConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, notifier: Arc<dyn Notifier>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let join = |path: &str| resolve(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")));

        let manifest = config.precache.iter().map(|path| join(path)).collect::<Result<Vec<_>, _>>()?;
        let router = Router::new(
            Arc::clone(&network),
            Arc::clone(&storage),
            RouterConfig {
                api_prefix: config.api_prefix.clone(),
                offline_document: join(&config.offline_document)?,
                cache_unsafe_methods: config.cache_unsafe_methods,
            },
        );

        let registration = Arc::new(Registration::new(Arc::clone(&storage), Arc::clone(&network)));
        let control = ControlChannel::new(
            Arc::clone(&storage),
            Arc::clone(&registration),
            notifier,
            config.notification_open_path.clone(),
        );

        Ok(Self {
            origin,
            versions: config.versions(),
            manifest,
            skip_waiting_on_install: config.skip_waiting_on_install,
            storage,
            network,
            registration,
            router,
            control,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }

    /// Restore the previously active instance, then install one for the
    /// configured version set.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if pre-warming fails. A restored
    /// instance keeps serving in that case.
    pub async fn start(&self) -> Result<Arc<Worker>, Error> {
        if let Err(err) = self.registration.restore().await {
            tracing::warn!(error = %err, "could not restore previous registration");
        }

        let worker = Worker::new(self.versions.clone(), self.manifest.clone());
        self.registration.register(worker, self.skip_waiting_on_install).await
    }

    /// Build a request for `url`, which may be relative to the origin.
    pub fn request(&self, method: &str, url: &str, destination: Destination) -> Result<ProxyRequest, Error> {
        let url = resolve(&self.origin, url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(ProxyRequest::new(method, url).with_destination(destination))
    }

    /// Serve an intercepted request.
    ///
    /// Without an active instance the request goes straight to the network.
    pub async fn fetch(&self, request: &ProxyRequest) -> Result<Served, Error> {
        match self.registration.active().await {
            Some(worker) => self.router.handle(request, worker.versions()).await,
            None => {
                tracing::debug!(url = %request.url, "no active instance, passing through");
                let response = self.network.fetch(request).await?;
                Ok(Served { response, source: ResponseSource::Network, class: self.router.classify(request) })
            }
        }
    }

    pub async fn post_message(&self, message: &serde_json::Value) -> Option<ControlMessage> {
        self.control.on_message(message).await
    }

    pub async fn push(&self, data: &str) -> Option<Notification> {
        self.control.on_push(data).await
    }

    pub async fn notification_click(&self, title: &str, action: &str) -> Option<String> {
        self.control.on_notification_click(title, action).await
    }

    pub async fn sync(&self, tag: &str) -> bool {
        self.control.on_sync(tag).await
    }

    pub async fn status(&self) -> ProxyStatus {
        ProxyStatus {
            origin: self.origin.to_string(),
            installing: snapshot(self.registration.installing().await).await,
            waiting: snapshot(self.registration.waiting().await).await,
            active: snapshot(self.registration.active().await).await,
        }
    }

    /// Every generation in creation order with its entry count.
    pub async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        let active = self.registration.active().await;
        let mut generations = Vec::new();

        for name in self.storage.list_names().await? {
            let entries = self.storage.entry_count(&name).await?;
            let current = active.as_ref().is_some_and(|w| w.versions().contains(&name));
            generations.push(GenerationInfo { name, entries, current });
        }

        Ok(generations)
    }
}

async fn snapshot(worker: Option<Arc<Worker>>) -> Option<WorkerStatus> {
    let worker = worker?;
    Some(WorkerStatus::of(&worker).await)
}
