//! Cached entry CRUD operations.
//!
//! Entries are written whole and never patched: a second `put` for the same
//! request key replaces the stored response.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use super::names::ensure_cache;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A stored response together with the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub cache_name: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedEntry {
    /// Build an entry for `cache_name`, deriving the key and content type.
    pub fn new(
        cache_name: impl Into<String>, method: &str, url: &str, status_code: u16, headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        let content_type = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.clone());

        Self {
            cache_name: cache_name.into(),
            key_hash: compute_request_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status_code,
            content_type,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Metadata view without the body.
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            cache_name: self.cache_name.clone(),
            method: self.method.clone(),
            url: self.url.clone(),
            status_code: self.status_code,
            content_type: self.content_type.clone(),
            size: self.body.len() as u64,
            stored_at: self.stored_at.clone(),
        }
    }
}

/// Entry metadata, as listed by `list_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub cache_name: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub size: u64,
    pub stored_at: String,
}

const SELECT_ENTRY: &str = "SELECT
    e.cache_name, e.key_hash, e.method, e.url, e.status_code, e.content_type,
    e.headers_json, e.body, e.stored_at
FROM entries e";

fn upsert(conn: &rusqlite::Connection, entry: &CachedEntry) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    conn.execute(
        "INSERT INTO entries (
            cache_name, key_hash, method, url, status_code, content_type,
            headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(cache_name, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status_code = excluded.status_code,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            &entry.cache_name,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status_code,
            &entry.content_type,
            headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(CachedEntry, String)> {
    let entry = CachedEntry {
        cache_name: row.get(0)?,
        key_hash: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        status_code: row.get(4)?,
        content_type: row.get(5)?,
        headers: Vec::new(),
        body: row.get(7)?,
        stored_at: row.get(8)?,
    };
    Ok((entry, row.get(6)?))
}

fn decode(found: rusqlite::Result<(CachedEntry, String)>) -> Result<Option<CachedEntry>, Error> {
    match found {
        Ok((mut entry, headers_json)) => {
            entry.headers = serde_json::from_str(&headers_json)
                .map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;
            Ok(Some(entry))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl CacheDb {
    /// Insert or replace a single entry, creating its cache if needed.
    pub async fn put_entry(&self, entry: &CachedEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_cache(&tx, &entry.cache_name)?;
                upsert(&tx, &entry)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace many entries of one cache in a single transaction.
    ///
    /// Either every entry is stored or, on error, none is.
    pub async fn put_entries(&self, cache_name: &str, entries: Vec<CachedEntry>) -> Result<usize, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                ensure_cache(&tx, &cache_name)?;
                for entry in &entries {
                    if entry.cache_name != cache_name {
                        return Err(Error::InvalidInput(format!(
                            "entry for {} belongs to {}, not {cache_name}",
                            entry.url, entry.cache_name
                        )));
                    }
                    upsert(&tx, entry)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request key in one cache.
    pub async fn match_entry(&self, cache_name: &str, key_hash: &str) -> Result<Option<CachedEntry>, Error> {
        let cache_name = cache_name.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_ENTRY} WHERE e.cache_name = ?1 AND e.key_hash = ?2"))?;
                decode(stmt.query_row(params![cache_name, key_hash], read_entry))
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request key across every cache, oldest cache first.
    pub async fn match_any(&self, key_hash: &str) -> Result<Option<CachedEntry>, Error> {
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_ENTRY} JOIN caches c ON c.name = e.cache_name
                     WHERE e.key_hash = ?1 ORDER BY c.id ASC LIMIT 1"
                ))?;
                decode(stmt.query_row(params![key_hash], read_entry))
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a cache.
    pub async fn count_entries(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE cache_name = ?1",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry metadata for a cache, ordered by URL.
    pub async fn list_entries(&self, cache_name: &str) -> Result<Vec<EntrySummary>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_name, method, url, status_code, content_type, LENGTH(body), stored_at
                     FROM entries WHERE cache_name = ?1 ORDER BY url ASC",
                )?;
                let entries = stmt
                    .query_map(params![cache_name], |row| {
                        Ok(EntrySummary {
                            cache_name: row.get(0)?,
                            method: row.get(1)?,
                            url: row.get(2)?,
                            status_code: row.get(3)?,
                            content_type: row.get(4)?,
                            size: row.get::<_, i64>(5)? as u64,
                            stored_at: row.get(6)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(cache: &str, url: &str, body: &str) -> CachedEntry {
        CachedEntry::new(
            cache,
            "GET",
            url,
            200,
            vec![("content-type".to_string(), "text/css".to_string())],
            body.as_bytes().to_vec(),
        )
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry("struct-site-v1", "https://example.com/css/main.css", "body{}");

        db.put_entry(&entry).await.unwrap();

        let found = db.match_entry("struct-site-v1", &entry.key_hash).await.unwrap().unwrap();
        assert_eq!(found.body, b"body{}");
        assert_eq!(found.content_type.as_deref(), Some("text/css"));
        assert_eq!(found.headers, entry.headers);
        assert!(db.has_cache("struct-site-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = compute_request_key("GET", "https://example.com/");
        assert!(db.match_entry("struct-site-v1", &key).await.unwrap().is_none());
        assert!(db.match_any(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&make_entry("c", "https://example.com/a.css", "old")).await.unwrap();
        let newer = make_entry("c", "https://example.com/a.css", "new");
        db.put_entry(&newer).await.unwrap();

        assert_eq!(db.count_entries("c").await.unwrap(), 1);
        let found = db.match_entry("c", &newer.key_hash).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_cache() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_cache("first").await.unwrap();
        db.open_cache("second").await.unwrap();
        db.put_entry(&make_entry("second", "https://example.com/a.css", "two")).await.unwrap();
        let first = make_entry("first", "https://example.com/a.css", "one");
        db.put_entry(&first).await.unwrap();

        let found = db.match_any(&first.key_hash).await.unwrap().unwrap();
        assert_eq!(found.cache_name, "first");
    }

    #[tokio::test]
    async fn test_put_entries_rejects_foreign_entry_atomically() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries = vec![
            make_entry("c", "https://example.com/a.css", "a"),
            make_entry("other", "https://example.com/b.css", "b"),
        ];

        assert!(db.put_entries("c", entries).await.is_err());
        assert_eq!(db.count_entries("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cache_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry("c", "https://example.com/a.css", "a");
        db.put_entry(&entry).await.unwrap();

        db.delete_cache("c").await.unwrap();
        assert!(db.match_any(&entry.key_hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries = vec![
            make_entry("c", "https://example.com/b.css", "bb"),
            make_entry("c", "https://example.com/a.css", "a"),
        ];
        db.put_entries("c", entries).await.unwrap();

        let listed = db.list_entries("c").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].url, "https://example.com/a.css");
        assert_eq!(listed[1].size, 2);

        let caches = db.list_caches().await.unwrap();
        assert_eq!(caches[0].entries, 2);
    }
}
