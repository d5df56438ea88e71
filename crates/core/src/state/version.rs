//! Advisory version state.
//!
//! Records the identity of the last reconciled manifest, plus the manifest
//! document itself so interception decisions survive a restart without
//! network. The identity only feeds the "new version detected" signal; it
//! never gates per-asset verification.

use super::connection::StateDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const KEY_MANIFEST_VERSION: &str = "last_manifest_version";
const KEY_MANIFEST_JSON: &str = "last_manifest_json";

/// Snapshot of the persisted version record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionState {
    pub last_manifest_version: Option<String>,
    pub updated_at: Option<String>,
}

impl StateDb {
    /// Read the persisted version record.
    pub async fn version_state(&self) -> Result<VersionState, Error> {
        self.conn
            .call(move |conn| -> Result<VersionState, Error> {
                let result = conn.query_row(
                    "SELECT value, updated_at FROM version_state WHERE key = ?1",
                    params![KEY_MANIFEST_VERSION],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                );

                match result {
                    Ok((version, updated_at)) => {
                        Ok(VersionState { last_manifest_version: Some(version), updated_at: Some(updated_at) })
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(VersionState::default()),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record the identity and canonical document of a reconciled manifest.
    ///
    /// Both values are written in one transaction.
    pub async fn record_manifest(&self, version: &str, manifest_json: &str) -> Result<(), Error> {
        let version = version.to_string();
        let manifest_json = manifest_json.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (key, value) in [(KEY_MANIFEST_VERSION, &version), (KEY_MANIFEST_JSON, &manifest_json)] {
                    tx.execute(
                        "INSERT INTO version_state (key, value, updated_at) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET
                            value = excluded.value,
                            updated_at = excluded.updated_at",
                        params![key, value, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The canonical document of the last reconciled manifest, if any.
    pub async fn last_manifest_json(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT value FROM version_state WHERE key = ?1",
                    params![KEY_MANIFEST_JSON],
                    |row| row.get(0),
                );

                match result {
                    Ok(json) => Ok(Some(json)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Forget everything recorded about previous manifests.
    pub async fn reset_version_state(&self) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM version_state", [])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
