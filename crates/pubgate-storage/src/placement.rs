//! The file placement store.
//!
//! Owns physical placement under the workspace-scoped layout. Uploads are
//! streamed to a temporary path while being hashed, verified against the
//! declared digest, and only then renamed into the canonical location, so
//! readers observe either a complete verified file or nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use tracing::{debug, warn};

use pubgate_core::config::storage::StorageConfig;
use pubgate_core::digest::{Digest, Hasher};
use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::traits::storage::{ByteStream, StorageProvider};

use crate::layout;

/// An allocated upload slot: the canonical destination plus the temporary
/// path the bytes are staged at.
#[derive(Debug)]
pub struct WriteHandle {
    canonical: String,
    temp: String,
}

impl WriteHandle {
    /// The canonical path the committed file will be visible at.
    pub fn canonical_path(&self) -> &str {
        &self.canonical
    }
}

/// A successfully committed file.
#[derive(Debug, Clone)]
pub struct CommittedFile {
    /// Canonical path of the stored file.
    pub path: String,
    /// Verified content digest.
    pub digest: Digest,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Modification time of the stored file.
    pub mtime: DateTime<Utc>,
}

/// The only component allowed to create or delete release files on
/// durable storage.
#[derive(Debug, Clone)]
pub struct PlacementStore {
    provider: Arc<dyn StorageProvider>,
    max_upload_size_bytes: u64,
}

impl PlacementStore {
    /// Create a placement store on top of a storage provider with the
    /// default upload size limit.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self::with_config(provider, &StorageConfig::default())
    }

    /// Create a placement store with limits taken from configuration.
    pub fn with_config(provider: Arc<dyn StorageProvider>, config: &StorageConfig) -> Self {
        Self {
            provider,
            max_upload_size_bytes: config.max_upload_size_bytes,
        }
    }

    /// Allocate the canonical path for a release file and a temporary
    /// staging path.
    ///
    /// Fails with `PathConflict` if bytes already exist at the canonical
    /// path, unless `resume` is set: callers pass `resume = true` only
    /// after verifying the database placeholder is still pending, which
    /// covers a crash between a previous rename and the metadata stamp.
    pub async fn begin_upload(
        &self,
        workspace: &str,
        release: &pubgate_core::types::id::ReleaseId,
        name: &str,
        resume: bool,
    ) -> AppResult<WriteHandle> {
        let canonical = layout::release_path(workspace, release, name)?;

        if !resume && self.provider.exists(&canonical).await? {
            return Err(AppError::path_conflict(format!(
                "a file already exists at {canonical}"
            )));
        }

        Ok(WriteHandle {
            canonical,
            temp: layout::temp_path(),
        })
    }

    /// Stream bytes into the handle, verify them against the declared
    /// digest, and atomically move the file into place.
    ///
    /// Streams running past the configured maximum upload size are cut
    /// off and rejected with `Validation`. On any failure the temporary
    /// artifact is removed and nothing is visible at the canonical path.
    pub async fn commit(
        &self,
        handle: WriteHandle,
        stream: ByteStream,
        expected: &Digest,
    ) -> AppResult<CommittedFile> {
        let limit = self.max_upload_size_bytes;
        let hasher = Arc::new(Mutex::new(Hasher::new()));
        let received = Arc::new(AtomicU64::new(0));

        let tee = {
            let hasher = Arc::clone(&hasher);
            let received = Arc::clone(&received);
            stream.map(move |chunk| {
                let chunk = chunk?;
                let total =
                    received.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
                if total > limit {
                    return Err(std::io::Error::other("upload size limit exceeded"));
                }
                match hasher.lock() {
                    Ok(mut h) => {
                        h.update(&chunk);
                        Ok(chunk)
                    }
                    Err(_) => Err(std::io::Error::other("digest state poisoned")),
                }
            })
        };

        let size_bytes = match self.provider.write_stream(&handle.temp, Box::pin(tee)).await {
            Ok(size) => size,
            Err(e) => {
                self.discard_temp(&handle.temp).await;
                if received.load(Ordering::Relaxed) > limit {
                    return Err(AppError::validation(format!(
                        "upload exceeds the maximum size of {limit} bytes"
                    )));
                }
                return Err(e);
            }
        };

        let computed = match hasher.lock() {
            Ok(h) => h.finalize(),
            Err(_) => {
                self.discard_temp(&handle.temp).await;
                return Err(AppError::internal("digest state poisoned"));
            }
        };

        if computed != *expected {
            self.discard_temp(&handle.temp).await;
            return Err(AppError::integrity_mismatch(format!(
                "declared digest {expected} but received content hashing to {computed}"
            )));
        }

        if let Err(e) = self.provider.rename(&handle.temp, &handle.canonical).await {
            self.discard_temp(&handle.temp).await;
            return Err(e);
        }

        let mtime = self
            .provider
            .metadata(&handle.canonical)
            .await
            .ok()
            .and_then(|m| m.modified)
            .unwrap_or_else(Utc::now);

        debug!(
            path = %handle.canonical,
            size_bytes,
            "Committed verified file"
        );

        Ok(CommittedFile {
            path: handle.canonical,
            digest: computed,
            size_bytes,
            mtime,
        })
    }

    /// Best-effort removal of bytes for a soft-deleted file. Absence is
    /// not an error.
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        self.provider.delete(path).await
    }

    /// Open a committed file as a byte stream for serving.
    pub async fn open(&self, path: &str) -> AppResult<ByteStream> {
        self.provider.read(path).await
    }

    /// Read a committed file's bytes (audit and test use).
    pub async fn read_bytes(&self, path: &str) -> AppResult<bytes::Bytes> {
        self.provider.read_bytes(path).await
    }

    /// Whether bytes exist at the given path.
    pub async fn exists(&self, path: &str) -> AppResult<bool> {
        self.provider.exists(path).await
    }

    async fn discard_temp(&self, temp: &str) {
        if let Err(e) = self.provider.delete(temp).await {
            warn!(path = temp, error = %e, "Failed to remove temporary upload artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pubgate_core::digest::digest_bytes;
    use pubgate_core::error::ErrorKind;
    use pubgate_core::traits::storage::stream_from_bytes;
    use pubgate_core::types::id::ReleaseId;

    use crate::providers::LocalStorageProvider;

    async fn store() -> (tempfile::TempDir, PlacementStore) {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        (dir, PlacementStore::new(Arc::new(provider)))
    }

    fn release_id() -> ReleaseId {
        ReleaseId::from(digest_bytes(b"test release"))
    }

    #[tokio::test]
    async fn test_commit_verified_file() {
        let (_dir, store) = store().await;
        let release = release_id();
        let data = Bytes::from("analysis output");
        let digest = digest_bytes(&data);

        let handle = store
            .begin_upload("ws", &release, "out/table.csv", false)
            .await
            .unwrap();
        let canonical = handle.canonical_path().to_string();

        let committed = store
            .commit(handle, stream_from_bytes(data.clone()), &digest)
            .await
            .unwrap();

        assert_eq!(committed.path, canonical);
        assert_eq!(committed.digest, digest);
        assert_eq!(committed.size_bytes, data.len() as u64);
        assert_eq!(store.read_bytes(&canonical).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_digest_mismatch_leaves_nothing() {
        let (dir, store) = store().await;
        let release = release_id();
        let declared = digest_bytes(b"expected content");

        let handle = store
            .begin_upload("ws", &release, "out.csv", false)
            .await
            .unwrap();
        let canonical = handle.canonical_path().to_string();

        let err = store
            .commit(handle, stream_from_bytes(Bytes::from("corrupted")), &declared)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegrityMismatch);

        // Nothing at the canonical path, and no temp leftovers.
        assert!(!store.exists(&canonical).await.unwrap());
        let temp_dir = dir.path().join(layout::TEMP_PREFIX);
        if temp_dir.exists() {
            assert_eq!(std::fs::read_dir(&temp_dir).unwrap().count(), 0);
        }
    }

    #[tokio::test]
    async fn test_begin_upload_conflicts_on_existing_bytes() {
        let (_dir, store) = store().await;
        let release = release_id();
        let data = Bytes::from("v1");
        let digest = digest_bytes(&data);

        let handle = store
            .begin_upload("ws", &release, "dup.txt", false)
            .await
            .unwrap();
        store
            .commit(handle, stream_from_bytes(data), &digest)
            .await
            .unwrap();

        let err = store
            .begin_upload("ws", &release, "dup.txt", false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PathConflict);

        // A legitimate pending re-attempt may resume.
        assert!(store.begin_upload("ws", &release, "dup.txt", true).await.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        let config = StorageConfig {
            max_upload_size_bytes: 8,
            ..StorageConfig::default()
        };
        let store = PlacementStore::with_config(Arc::new(provider), &config);

        let release = release_id();
        let data = Bytes::from("well over eight bytes of output");
        let digest = digest_bytes(&data);

        let handle = store
            .begin_upload("ws", &release, "big.bin", false)
            .await
            .unwrap();
        let canonical = handle.canonical_path().to_string();

        let err = store
            .commit(handle, stream_from_bytes(data), &digest)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(!store.exists(&canonical).await.unwrap());
    }

    #[tokio::test]
    async fn test_traversal_rejected_at_begin() {
        let (_dir, store) = store().await;
        let release = release_id();
        assert!(
            store
                .begin_upload("ws", &release, "../../escape", false)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_delete_is_absent_tolerant() {
        let (_dir, store) = store().await;
        store.delete("ws/releases/nothing/here.txt").await.unwrap();
    }
}
