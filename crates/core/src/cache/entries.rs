//! Cache entry operations.
//!
//! An entry is one stored response per (generation, request identity).
//! Writing an identity that already exists replaces the stored response.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::identity::RequestIdentity;
use crate::Error;
use crate::http::ProxyResponse;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

fn response_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, u16, String, Vec<u8>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode(columns: (String, u16, String, Vec<u8>)) -> Result<ProxyResponse, Error> {
    let (url, status, headers_json, body) = columns;
    let headers: BTreeMap<String, String> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
    Ok(ProxyResponse { url, status, headers, body: body.into() })
}

impl CacheDb {
    /// Store a response under `identity` in `generation`.
    ///
    /// The generation is created first if it doesn't exist, so the dynamic
    /// generation comes into being on its first write.
    pub async fn put_entry(
        &self, generation: &str, identity: &RequestIdentity, response: &ProxyResponse,
    ) -> Result<(), Error> {
        let generation = generation.to_string();
        let identity = identity.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let final_url = response.url.clone();
        let status = response.status;
        let body = response.body.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        generation, key_hash, method, url, final_url,
                        status_code, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        final_url = excluded.final_url,
                        status_code = excluded.status_code,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        generation,
                        identity.key(),
                        identity.method,
                        identity.url,
                        final_url,
                        status,
                        headers_json,
                        body,
                        now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `identity` in a single generation.
    pub async fn get_entry(&self, generation: &str, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        let generation = generation.to_string();
        let key = identity.key().to_string();
        self.conn
            .call(move |conn| -> Result<Option<ProxyResponse>, Error> {
                let columns = conn
                    .query_row(
                        "SELECT final_url, status_code, headers_json, body
                        FROM entries WHERE generation = ?1 AND key_hash = ?2",
                        params![generation, key],
                        response_from_row,
                    )
                    .optional()?;
                columns.map(decode).transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `identity` across all generations, oldest generation first.
    pub async fn match_entry(&self, identity: &RequestIdentity) -> Result<Option<ProxyResponse>, Error> {
        let key = identity.key().to_string();
        self.conn
            .call(move |conn| -> Result<Option<ProxyResponse>, Error> {
                let columns = conn
                    .query_row(
                        "SELECT e.final_url, e.status_code, e.headers_json, e.body
                        FROM entries e
                        JOIN generations g ON g.name = e.generation
                        WHERE e.key_hash = ?1
                        ORDER BY g.rowid ASC
                        LIMIT 1",
                        params![key],
                        response_from_row,
                    )
                    .optional()?;
                columns.map(decode).transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Remove `identity` from a generation. Returns false if it wasn't stored.
    pub async fn delete_entry(&self, generation: &str, identity: &RequestIdentity) -> Result<bool, Error> {
        let generation = generation.to_string();
        let key = identity.key().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![generation, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
