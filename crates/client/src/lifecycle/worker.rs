use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cours_offline_core::{CacheStorage, Error, ProxyRequest, RequestIdentity, VersionSet, open_store};
use tokio::sync::RwLock;
use url::Url;

use super::LifecycleState;
use crate::fetch::Network;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// One proxy instance: a version set, the manifest it pre-warms and its
/// lifecycle state.
#[derive(Debug)]
pub struct Worker {
    id: u64,
    versions: VersionSet,
    manifest: Vec<Url>,
    state: RwLock<LifecycleState>,
    skip_waiting: AtomicBool,
}

impl Worker {
    /// A new instance that still has to be installed.
    pub fn new(versions: VersionSet, manifest: Vec<Url>) -> Self {
        Self {
            id: NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed),
            versions,
            manifest,
            state: RwLock::new(LifecycleState::Installing),
            skip_waiting: AtomicBool::new(false),
        }
    }

    /// The instance that was active when the process last ran.
    pub(crate) fn restored(versions: VersionSet) -> Self {
        Self { state: RwLock::new(LifecycleState::Active), ..Self::new(versions, Vec::new()) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }

    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, state: LifecycleState) {
        let mut current = self.state.write().await;
        if *current != state {
            tracing::info!(worker = self.id, from = ?*current, to = ?state, "lifecycle transition");
            *current = state;
        }
    }

    pub(crate) fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub(crate) fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Pre-warm the static generation with every manifest entry.
    ///
    /// All entries are fetched before anything is written; one failed fetch
    /// (no response, or a non-success status) fails the whole install and
    /// leaves the instance `Redundant`.
    pub(crate) async fn install(&self, storage: &Arc<dyn CacheStorage>, network: &dyn Network) -> Result<(), Error> {
        self.set_state(LifecycleState::Installing).await;

        match self.prewarm(storage, network).await {
            Ok(count) => {
                tracing::info!(worker = self.id, generation = %self.versions.static_cache, count, "pre-warmed static assets");
                self.set_state(LifecycleState::Waiting).await;
                Ok(())
            }
            Err(err) => {
                tracing::error!(worker = self.id, error = %err, "install failed");
                self.set_state(LifecycleState::Redundant).await;
                Err(Error::InstallFailed(err.to_string()))
            }
        }
    }

    async fn prewarm(&self, storage: &Arc<dyn CacheStorage>, network: &dyn Network) -> Result<usize, Error> {
        let mut fetched = Vec::with_capacity(self.manifest.len());
        for url in &self.manifest {
            let request = ProxyRequest::get(url.clone());
            let response = network.fetch(&request).await?;
            if !response.is_success() {
                return Err(Error::NetworkFailure(format!("{url}: status {}", response.status)));
            }
            fetched.push((RequestIdentity::of(&request), response));
        }

        let store = open_store(storage, &self.versions.static_cache).await?;
        for (identity, response) in &fetched {
            store.put(identity, response).await?;
        }

        Ok(fetched.len())
    }

    /// Delete every generation outside this instance's version set.
    ///
    /// Returns the deleted names. Storage failures are logged and skipped.
    pub(crate) async fn activate(&self, storage: &Arc<dyn CacheStorage>) -> Vec<String> {
        self.set_state(LifecycleState::Activating).await;

        let names = match storage.list_names().await {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(worker = self.id, error = %err, "could not list cache generations");
                Vec::new()
            }
        };

        let mut deleted = Vec::new();
        for name in names.into_iter().filter(|name| !self.versions.contains(name)) {
            match storage.delete_store(&name).await {
                Ok(true) => {
                    tracing::info!(worker = self.id, generation = %name, "deleted stale cache generation");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(err) => tracing::warn!(worker = self.id, generation = %name, error = %err, "could not delete generation"),
            }
        }

        self.set_state(LifecycleState::Active).await;
        deleted
    }
}
