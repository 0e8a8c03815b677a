//! Named, versioned response stores.
//!
//! A cache generation is a named store mapping request identities to stored
//! responses. The [`CacheStorage`] trait is the storage contract the proxy is
//! written against; [`CacheDb`] implements it on SQLite with async access via
//! tokio-rusqlite:
//!
//! - Content-addressed identities using SHA-256
//! - Cascading generation deletes
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod identity;
pub mod migrations;

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::Error;
use crate::http::ProxyResponse;

pub use connection::CacheDb;
pub use generations::VersionSet;
pub use identity::{RequestIdentity, compute_cache_key};

/// Storage contract behind every cache generation.
///
/// Every operation may fail with a storage error. Callers on the request
/// path treat such failures as a miss (reads) or drop them (writes).
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the generation if it doesn't exist.
    async fn open_generation(&self, name: &str) -> Result<(), Error>;

    /// Generation names, oldest first.
    async fn list_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation with all its entries.
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;

    async fn get(&self, name: &str, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error>;

    async fn put(&self, name: &str, identity: &RequestIdentity, response: &ProxyResponse) -> Result<(), Error>;

    async fn delete(&self, name: &str, identity: &RequestIdentity) -> Result<bool, Error>;

    /// First stored response for `identity` across all generations.
    async fn match_any(&self, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error>;

    async fn entry_count(&self, name: &str) -> Result<u64, Error>;

    async fn load_active_versions(&self) -> Result<Option<VersionSet>, Error>;

    async fn save_active_versions(&self, versions: &VersionSet) -> Result<(), Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open_generation(&self, name: &str) -> Result<(), Error> {
        self.create_generation(name).await
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.generation_names().await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        self.delete_generation(name).await
    }

    async fn get(&self, name: &str, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        self.get_entry(name, identity).await
    }

    async fn put(&self, name: &str, identity: &RequestIdentity, response: &ProxyResponse) -> Result<(), Error> {
        self.put_entry(name, identity, response).await
    }

    async fn delete(&self, name: &str, identity: &RequestIdentity) -> Result<bool, Error> {
        self.delete_entry(name, identity).await
    }

    async fn match_any(&self, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        self.match_entry(identity).await
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        self.count_entries(name).await
    }

    async fn load_active_versions(&self) -> Result<Option<VersionSet>, Error> {
        self.active_versions().await
    }

    async fn save_active_versions(&self, versions: &VersionSet) -> Result<(), Error> {
        self.set_active_versions(versions).await
    }
}

/// Handle on one opened generation.
#[derive(Clone)]
pub struct Store {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Store {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        self.storage.get(&self.name, identity).await
    }

    pub async fn put(&self, identity: &RequestIdentity, response: &ProxyResponse) -> Result<(), Error> {
        self.storage.put(&self.name, identity, response).await
    }

    pub async fn delete(&self, identity: &RequestIdentity) -> Result<bool, Error> {
        self.storage.delete(&self.name, identity).await
    }

    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.storage.entry_count(&self.name).await
    }
}

/// Open (creating if needed) the generation called `name`.
pub async fn open_store(storage: &Arc<dyn CacheStorage>, name: &str) -> Result<Store, Error> {
    storage.open_generation(name).await?;
    Ok(Store { storage: Arc::clone(storage), name: name.to_string() })
}
