//! Durable scratch storage for captured rasters.
//!
//! Artifacts are written under a single scratch directory with
//! timestamp-derived names and returned as a path plus an inline base64 copy,
//! so callers that need the bytes immediately avoid a second read
//! round-trip. Accumulation is bounded by a TTL sweep driven from the server
//! eviction task.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use chrono::Utc;
use tracing::{debug, warn};

use crate::errors::{PipelineError, PipelineResult};

/// Handle to a persisted capture artifact.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    pub path: PathBuf,
    pub base64: String,
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the scratch directory if needed. Idempotent;
    /// called once at process start.
    pub fn open(dir: impl Into<PathBuf>) -> PipelineResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|err| {
            PipelineError::capture(format!(
                "failed to create artifact directory {}: {err}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write PNG bytes under a collision-resistant timestamp-derived name and
    /// return both the storage handle and an inline base64 copy.
    pub async fn persist(&self, png: &[u8]) -> PipelineResult<ArtifactHandle> {
        let name = format!("screenshot-{}.png", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let path = self.dir.join(name);

        tokio::fs::write(&path, png).await.map_err(|err| {
            PipelineError::capture(format!("failed to write {}: {err}", path.display()))
        })?;

        debug!(path = %path.display(), bytes = png.len(), "artifact persisted");

        Ok(ArtifactHandle {
            base64: Base64.encode(png),
            path,
        })
    }

    /// Remove artifacts whose modification time is older than `ttl`. Returns
    /// the number of files removed. Runs on the async eviction task, so all
    /// filesystem access goes through `tokio::fs`; unreadable entries are
    /// skipped with a warning rather than failing the sweep.
    pub async fn sweep(&self, ttl: Duration) -> usize {
        let Some(cutoff) = SystemTime::now().checked_sub(ttl) else {
            return 0;
        };
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%err, dir = %self.dir.display(), "artifact sweep could not read directory");
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let expired = match entry.metadata().await {
                Ok(meta) => meta
                    .modified()
                    .map(|modified| modified < cutoff)
                    .unwrap_or(false),
                Err(_) => false,
            };
            if expired {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(err) => warn!(%err, path = %path.display(), "failed to remove expired artifact"),
                }
            }
        }
        if removed > 0 {
            debug!(removed, "artifact sweep complete");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persist_writes_file_and_inline_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();

        let handle = store.persist(b"not-a-real-png").await.unwrap();
        assert!(handle.path.exists());
        assert_eq!(std::fs::read(&handle.path).unwrap(), b"not-a-real-png");
        assert_eq!(Base64.decode(&handle.base64).unwrap(), b"not-a-real-png");
    }

    #[tokio::test]
    async fn persisted_names_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();

        let first = store.persist(b"a").await.unwrap();
        let second = store.persist(b"b").await.unwrap();
        assert_ne!(first.path, second.path);
    }

    #[test]
    fn open_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("scratch");
        ArtifactStore::open(&dir).unwrap();
        ArtifactStore::open(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        store.persist(b"fresh").await.unwrap();

        // Nothing is older than an hour yet.
        assert_eq!(store.sweep(Duration::from_secs(3600)).await, 0);
        // A near-zero TTL expires everything written before the sweep.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.sweep(Duration::from_millis(1)).await, 1);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
