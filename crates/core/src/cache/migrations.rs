//! Schema versions for the cache store.
//!
//! `_schema_versions` records every step applied to a database file. Opening
//! a store applies the steps it has not seen yet, each in its own
//! transaction, so a failed step leaves the previous schema intact.

use super::Error;
use tokio_rusqlite::{Connection, params};

struct Step {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[Step { version: 1, name: "caches", sql: include_str!("../../migrations/001_caches.sql") }];

/// Bring the schema up to the newest step.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the step whose SQL was rejected.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _schema_versions (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let applied: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _schema_versions", [], |row| row.get(0))?;

        for step in STEPS.iter().filter(|step| step.version > applied) {
            tracing::debug!(version = step.version, name = step.name, "applying schema step");
            let tx = conn.transaction()?;
            tx.execute_batch(step.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", step.version, step.name)))?;
            tx.execute(
                "INSERT INTO _schema_versions (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![step.version, step.name, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
