//! State database schema migrations.
//!
//! Applied versions are recorded in `_migrations`; each pending step runs in
//! its own transaction together with its bookkeeping row.

use crate::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered schema steps: (version, SQL).
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_version_state.sql"))];

/// Bring the schema up to the latest version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )?;

        let applied: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version, "applied state migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
