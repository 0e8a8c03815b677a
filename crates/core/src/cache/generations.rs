//! Cache generation bookkeeping and the persisted version set.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Names of the current static and dynamic generations.
///
/// Every other generation is stale and is removed on activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VersionSet {
    pub static_cache: String,
    pub dynamic_cache: String,
}

impl VersionSet {
    pub fn new(static_cache: impl Into<String>, dynamic_cache: impl Into<String>) -> Self {
        Self { static_cache: static_cache.into(), dynamic_cache: dynamic_cache.into() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.static_cache == name || self.dynamic_cache == name
    }

    /// Static first, then dynamic.
    pub fn names(&self) -> [&str; 2] {
        [&self.static_cache, &self.dynamic_cache]
    }
}

impl CacheDb {
    /// Create a generation if it doesn't exist yet.
    pub async fn create_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Generation names in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and, through the cascade, all of its entries.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a generation.
    pub async fn count_entries(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Version set of the last instance that completed activation.
    pub async fn active_versions(&self) -> Result<Option<VersionSet>, Error> {
        self.conn
            .call(|conn| -> Result<Option<VersionSet>, Error> {
                let versions = conn
                    .query_row("SELECT static_cache, dynamic_cache FROM registration WHERE id = 1", [], |row| {
                        Ok(VersionSet { static_cache: row.get(0)?, dynamic_cache: row.get(1)? })
                    })
                    .optional()?;
                Ok(versions)
            })
            .await
            .map_err(Error::from)
    }

    /// Record the version set of a freshly activated instance.
    pub async fn set_active_versions(&self, versions: &VersionSet) -> Result<(), Error> {
        let versions = versions.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO registration (id, static_cache, dynamic_cache, activated_at)
                    VALUES (1, ?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        static_cache = excluded.static_cache,
                        dynamic_cache = excluded.dynamic_cache,
                        activated_at = excluded.activated_at",
                    params![versions.static_cache, versions.dynamic_cache, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
