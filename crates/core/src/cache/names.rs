//! Named cache bookkeeping.
//!
//! Caches are created lazily (opening an unknown name creates it) and kept in
//! creation order; `match_any` relies on that order.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A named cache with its entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

/// Create the cache row if it does not exist yet.
pub(crate) fn ensure_cache(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

impl CacheDb {
    /// Open (create if missing) a named cache.
    pub async fn open_cache(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_cache(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a cache with this name exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All cache names in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a cache and, through the foreign key cascade, all its entries.
    ///
    /// Returns false if no cache had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Every cache with its entry count, in creation order.
    pub async fn list_caches(&self) -> Result<Vec<CacheInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, c.created_at, COUNT(e.key_hash)
                     FROM caches c LEFT JOIN entries e ON e.cache_name = c.name
                     GROUP BY c.id ORDER BY c.id ASC",
                )?;
                let caches = stmt
                    .query_map([], |row| {
                        Ok(CacheInfo { name: row.get(0)?, created_at: row.get(1)?, entries: row.get::<_, i64>(2)? as u64 })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(caches)
            })
            .await
            .map_err(Error::from)
    }
}
