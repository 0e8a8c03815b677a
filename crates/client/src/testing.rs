//! In-process doubles for the network, the storage and the notification surface.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cours_offline_core::{
    CacheDb, CacheStorage, Error, Notification, ProxyRequest, ProxyResponse, RequestIdentity, VersionSet,
};
use url::Url;

use crate::control::Notifier;
use crate::fetch::Network;

pub async fn memory_storage() -> Arc<dyn CacheStorage> {
    Arc::new(CacheDb::open_in_memory().await.unwrap())
}

/// Network answering from a fixed table. Unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, (u16, Bytes)>>,
    calls: Mutex<HashMap<String, usize>>,
    rejected: Mutex<HashSet<String>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &Url, status: u16, body: &'static str) {
        self.routes.lock().unwrap().insert(url.to_string(), (status, Bytes::from_static(body.as_bytes())));
    }

    /// Fail requests to `url` before they leave, like a malformed method would.
    pub fn reject(&self, url: &Url) {
        self.rejected.lock().unwrap().insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self, url: &Url) -> usize {
        self.calls.lock().unwrap().get(url.as_str()).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        *self.calls.lock().unwrap().entry(request.url.to_string()).or_default() += 1;

        if self.rejected.lock().unwrap().contains(request.url.as_str()) {
            return Err(Error::InvalidInput(format!("{}: rejected", request.url)));
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::NetworkFailure(format!("{}: offline", request.url)));
        }

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or((404, Bytes::from_static(b"not found")));
        Ok(ProxyResponse::new(request.url.as_str(), status, body))
    }
}

fn io_failure() -> Error {
    Error::CorruptEntry("simulated I/O failure".into())
}

/// Storage whose every operation fails.
pub struct FailingStorage;

#[async_trait]
impl CacheStorage for FailingStorage {
    async fn open_generation(&self, _name: &str) -> Result<(), Error> {
        Err(io_failure())
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        Err(io_failure())
    }

    async fn delete_store(&self, _name: &str) -> Result<bool, Error> {
        Err(io_failure())
    }

    async fn get(&self, _name: &str, _identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        Err(io_failure())
    }

    async fn put(&self, _name: &str, _identity: &RequestIdentity, _response: &ProxyResponse) -> Result<(), Error> {
        Err(io_failure())
    }

    async fn delete(&self, _name: &str, _identity: &RequestIdentity) -> Result<bool, Error> {
        Err(io_failure())
    }

    async fn match_any(&self, _identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        Err(io_failure())
    }

    async fn entry_count(&self, _name: &str) -> Result<u64, Error> {
        Err(io_failure())
    }

    async fn load_active_versions(&self) -> Result<Option<VersionSet>, Error> {
        Err(io_failure())
    }

    async fn save_active_versions(&self, _versions: &VersionSet) -> Result<(), Error> {
        Err(io_failure())
    }
}

/// Storage whose writes take `delay` before reaching `inner`.
pub struct SlowStorage {
    inner: Arc<dyn CacheStorage>,
    delay: Duration,
}

impl SlowStorage {
    pub fn new(inner: Arc<dyn CacheStorage>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl CacheStorage for SlowStorage {
    async fn open_generation(&self, name: &str) -> Result<(), Error> {
        self.inner.open_generation(name).await
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.inner.list_names().await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete_store(name).await
    }

    async fn get(&self, name: &str, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        self.inner.get(name, identity).await
    }

    async fn put(&self, name: &str, identity: &RequestIdentity, response: &ProxyResponse) -> Result<(), Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(name, identity, response).await
    }

    async fn delete(&self, name: &str, identity: &RequestIdentity) -> Result<bool, Error> {
        self.inner.delete(name, identity).await
    }

    async fn match_any(&self, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        self.inner.match_any(identity).await
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        self.inner.entry_count(name).await
    }

    async fn load_active_versions(&self) -> Result<Option<VersionSet>, Error> {
        self.inner.load_active_versions().await
    }

    async fn save_active_versions(&self, versions: &VersionSet) -> Result<(), Error> {
        self.inner.save_active_versions(versions).await
    }
}

/// Notification surface that remembers what it was asked to do.
#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Notification>>,
    pub closed: Mutex<Vec<String>>,
    pub opened: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn close(&self, title: &str) -> Result<(), Error> {
        self.closed.lock().unwrap().push(title.to_string());
        Ok(())
    }

    async fn open_window(&self, path: &str) -> Result<(), Error> {
        self.opened.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
