use std::sync::Arc;

use cours_offline_core::{CacheStorage, Error};
use tokio::sync::{Mutex, RwLock};

use super::{LifecycleState, Worker};
use crate::fetch::Network;

/// Installing, waiting and active slots for the proxy instances.
///
/// Activation is serialized; whichever instance completes it last owns the
/// `active` slot, and the instance it replaced becomes `Superseded`.
pub struct Registration {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    installing: RwLock<Option<Arc<Worker>>>,
    waiting: RwLock<Option<Arc<Worker>>>,
    active: RwLock<Option<Arc<Worker>>>,
    activation: Mutex<()>,
}

impl Registration {
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            storage,
            network,
            installing: RwLock::new(None),
            waiting: RwLock::new(None),
            active: RwLock::new(None),
            activation: Mutex::new(()),
        }
    }

    pub async fn installing(&self) -> Option<Arc<Worker>> {
        self.installing.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<Worker>> {
        self.waiting.read().await.clone()
    }

    pub async fn active(&self) -> Option<Arc<Worker>> {
        self.active.read().await.clone()
    }

    /// Bring back the instance that was active when the process last ran.
    ///
    /// Does nothing if an instance is already active or nothing was recorded.
    pub async fn restore(&self) -> Result<Option<Arc<Worker>>, Error> {
        let Some(versions) = self.storage.load_active_versions().await? else {
            return Ok(None);
        };

        let mut active = self.active.write().await;
        if active.is_some() {
            return Ok(None);
        }

        tracing::info!(static_cache = %versions.static_cache, dynamic_cache = %versions.dynamic_cache, "restored active instance");
        let worker = Arc::new(Worker::restored(versions));
        *active = Some(Arc::clone(&worker));
        Ok(Some(worker))
    }

    /// Install `worker`, then activate it right away when there is no active
    /// instance or when skipping the wait was requested.
    ///
    /// A failed install leaves every slot but `installing` untouched, so the
    /// current active instance keeps serving.
    pub async fn register(&self, worker: Worker, skip_waiting: bool) -> Result<Arc<Worker>, Error> {
        let worker = Arc::new(worker);
        if skip_waiting {
            worker.request_skip_waiting();
        }

        *self.installing.write().await = Some(Arc::clone(&worker));
        let installed = worker.install(&self.storage, self.network.as_ref()).await;

        let replaced =
            if installed.is_ok() { self.waiting.write().await.replace(Arc::clone(&worker)) } else { None };
        self.clear_installing(&worker).await;
        installed?;

        if let Some(replaced) = replaced {
            tracing::info!(worker = replaced.id(), "waiting instance replaced by a newer install");
            replaced.set_state(LifecycleState::Redundant).await;
        }

        if self.active().await.is_none() || worker.skip_waiting_requested() {
            self.activate(Arc::clone(&worker)).await;
        }

        Ok(worker)
    }

    /// Handle a skip-waiting request.
    ///
    /// Activates the waiting instance, or marks the installing one so it
    /// activates as soon as its install completes. Returns the instance that
    /// was activated, if any.
    pub async fn skip_waiting(&self) -> Option<Arc<Worker>> {
        if let Some(waiting) = self.waiting().await {
            self.activate(Arc::clone(&waiting)).await;
            return Some(waiting);
        }

        if let Some(installing) = self.installing().await {
            installing.request_skip_waiting();
        }
        None
    }

    /// Empty the installing slot if it still holds `worker`. Called only
    /// after `worker` reached `waiting`, so a skip-waiting request always
    /// finds it in one of the two slots.
    async fn clear_installing(&self, worker: &Arc<Worker>) {
        let mut installing = self.installing.write().await;
        if installing.as_ref().is_some_and(|w| Arc::ptr_eq(w, worker)) {
            *installing = None;
        }
    }

    async fn activate(&self, worker: Arc<Worker>) {
        let _guard = self.activation.lock().await;

        {
            let waiting = self.waiting.read().await;
            if !waiting.as_ref().is_some_and(|w| Arc::ptr_eq(w, &worker)) {
                tracing::debug!(worker = worker.id(), "instance is no longer waiting, skipping activation");
                return;
            }
        }

        worker.activate(&self.storage).await;

        {
            let mut waiting = self.waiting.write().await;
            if waiting.as_ref().is_some_and(|w| Arc::ptr_eq(w, &worker)) {
                *waiting = None;
            }
        }

        let previous = self.active.write().await.replace(Arc::clone(&worker));
        if let Some(previous) = previous {
            previous.set_state(LifecycleState::Superseded).await;
        }

        if let Err(err) = self.storage.save_active_versions(worker.versions()).await {
            tracing::warn!(worker = worker.id(), error = %err, "could not persist active version set");
        }

        tracing::info!(worker = worker.id(), "instance now controls requests");
    }
}
