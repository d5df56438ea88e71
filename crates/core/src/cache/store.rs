//! Path-keyed byte store on the local filesystem.
//!
//! Each asset lives in one flat file named by [`sanitize_key`]. Writes are
//! staged in a dot-prefixed temporary file in the same directory and renamed
//! into place, so a concurrent reader sees the entry absent, fully old, or
//! fully new.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::fs;

use super::key::{is_entry_name, sanitize_key};
use crate::Error;

/// Prefix for staged writes. Keys never start with `.`.
const TEMP_PREFIX: &str = ".tmp-";

/// Outcome of [`CacheStore::write_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOnce {
    /// The entry was absent and has been written.
    Written,
    /// An entry already existed and was trusted as-is.
    AlreadyPresent,
}

/// Local asset store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of the entry for `path`.
    pub fn entry_path(&self, path: &str) -> PathBuf {
        self.root.join(sanitize_key(path))
    }

    pub async fn exists(&self, path: &str) -> bool {
        fs::try_exists(self.entry_path(path)).await.unwrap_or(false)
    }

    /// Read the full entry for `path`.
    ///
    /// Returns `Error::NotFound` if no entry exists.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, Error> {
        match fs::read(self.entry_path(path)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::NotFound(path.to_string())),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Atomically replace the entry for `path` with `bytes`.
    pub async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), Error> {
        let root = self.root.clone();
        let dest = self.entry_path(path);
        let bytes = bytes.to_vec();

        tokio::task::spawn_blocking(move || publish(&root, &dest, &bytes))
            .await
            .map_err(|e| Error::Io(io::Error::other(e)))??;

        tracing::trace!(path, "cache entry written");
        Ok(())
    }

    /// Write `bytes` only if no entry exists for `path` (trust-on-write).
    pub async fn write_once(&self, path: &str, bytes: &[u8]) -> Result<WriteOnce, Error> {
        if self.exists(path).await {
            return Ok(WriteOnce::AlreadyPresent);
        }
        self.write(path, bytes).await?;
        Ok(WriteOnce::Written)
    }

    /// Remove the entry for `path`. Removing a missing entry is not an error.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        match fs::remove_file(self.entry_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Sum of stored entry lengths in bytes.
    pub async fn total_size(&self) -> Result<u64, Error> {
        let (size, _) = self.scan().await?;
        Ok(size)
    }

    /// Number of stored entries.
    pub async fn entry_count(&self) -> Result<usize, Error> {
        let (_, count) = self.scan().await?;
        Ok(count)
    }

    /// Remove every entry and any leftover staged writes.
    pub async fn clear(&self) -> Result<(), Error> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.root).await?;
                return Ok(());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            let removed = if file_type.is_dir() {
                fs::remove_dir_all(entry.path()).await
            } else {
                fs::remove_file(entry.path()).await
            };
            match removed {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }

    async fn scan(&self) -> Result<(u64, usize), Error> {
        let mut size = 0u64;
        let mut count = 0usize;
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((0, 0)),
            Err(e) => return Err(Error::Io(e)),
        };

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            if !is_entry_name(&name.to_string_lossy()) {
                continue;
            }
            // Entries can vanish between listing and stat under a concurrent delete.
            let Ok(meta) = entry.metadata().await else { continue };
            if meta.is_file() {
                size += meta.len();
                count += 1;
            }
        }
        Ok((size, count))
    }
}

fn publish(root: &Path, dest: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut staged = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(root)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(dest).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();

        store.write("static/assets/a.css", b"body{}").await.unwrap();

        assert!(store.exists("static/assets/a.css").await);
        assert_eq!(store.read("static/assets/a.css").await.unwrap(), b"body{}");
    }

    #[tokio::test]
    async fn test_read_missing() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();

        let result = store.read("missing.js").await;
        assert!(matches!(result, Err(Error::NotFound(p)) if p == "missing.js"));
        assert!(!store.exists("missing.js").await);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();

        store.write("a.js", b"old old old").await.unwrap();
        store.write("a.js", b"new").await.unwrap();

        assert_eq!(store.read("a.js").await.unwrap(), b"new");
        assert_eq!(store.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();

        store.write("a.js", b"x").await.unwrap();
        store.delete("a.js").await.unwrap();
        store.delete("a.js").await.unwrap();

        assert!(!store.exists("a.js").await);
    }

    #[tokio::test]
    async fn test_size_accounting_ignores_staged_files() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();

        store.write("a.js", b"12345").await.unwrap();
        store.write("b/c.css", b"123").await.unwrap();
        std::fs::write(dir.path().join(".tmp-leftover"), b"0123456789").unwrap();

        assert_eq!(store.total_size().await.unwrap(), 8);
        assert_eq!(store.entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();

        store.write("a.js", b"12345").await.unwrap();
        std::fs::write(dir.path().join(".tmp-leftover"), b"x").unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.total_size().await.unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_write_once_trusts_existing() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();

        assert_eq!(store.write_once("a.js", b"first").await.unwrap(), WriteOnce::Written);
        assert_eq!(store.write_once("a.js", b"second").await.unwrap(), WriteOnce::AlreadyPresent);
        assert_eq!(store.read("a.js").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_distinct_paths_do_not_collide() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();

        store.write("a/b", b"slash").await.unwrap();
        store.write("a_b", b"underscore").await.unwrap();

        assert_eq!(store.read("a/b").await.unwrap(), b"slash");
        assert_eq!(store.read("a_b").await.unwrap(), b"underscore");
    }

    #[tokio::test]
    async fn test_concurrent_readers_never_see_partial_writes() {
        let dir = tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();
        let small = vec![b'a'; 16];
        let large = vec![b'b'; 256 * 1024];
        store.write("p.js", &small).await.unwrap();

        let writer = {
            let store = store.clone();
            let (small, large) = (small.clone(), large.clone());
            tokio::spawn(async move {
                for i in 0..20 {
                    let body = if i % 2 == 0 { &large } else { &small };
                    store.write("p.js", body).await.unwrap();
                }
            })
        };

        for _ in 0..50 {
            let bytes = store.read("p.js").await.unwrap();
            assert!(bytes == small || bytes == large, "observed partial entry of {} bytes", bytes.len());
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
    }
}
