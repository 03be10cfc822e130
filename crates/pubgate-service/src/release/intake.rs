//! The release intake pipeline.
//!
//! One upload batch is a Release whose identity is the batch digest of
//! its declared file set, so retried submissions collapse onto one row.
//! Files land individually afterwards: each upload streams through the
//! placement store, is verified against the declared digest, and only
//! then has its placeholder stamped. Every step is retriable with the
//! same identifiers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::traits::notifier::Notifier;
use pubgate_core::traits::storage::ByteStream;
use pubgate_core::types::id::{FileId, ReleaseId};
use pubgate_core::{digest, events::ReleaseEvent};
use pubgate_database::traits::{ReleaseRepository, WorkspaceRepository};
use pubgate_entity::release::{CreateRelease, FileState, Release, ReleaseFile, UploadedMeta};
use pubgate_entity::workspace::Workspace;
use pubgate_storage::layout;
use pubgate_storage::placement::PlacementStore;

use crate::context::RequestContext;

/// Completeness view of one release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseStatus {
    /// The release itself.
    pub release: Release,
    /// Every declared file with its current state, in name order.
    pub files: Vec<ReleaseFile>,
    /// Whether every declared file's bytes have landed.
    pub complete: bool,
}

/// Orchestrates release creation and file uploads.
#[derive(Clone)]
pub struct ReleaseIntakeService {
    /// Release and file repository.
    releases: Arc<dyn ReleaseRepository>,
    /// Workspace repository (storage paths are workspace-name scoped).
    workspaces: Arc<dyn WorkspaceRepository>,
    /// The placement store owning physical bytes.
    placement: PlacementStore,
    /// Best-effort event sink.
    notifier: Arc<dyn Notifier>,
}

impl ReleaseIntakeService {
    /// Creates a new release intake service.
    pub fn new(
        releases: Arc<dyn ReleaseRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
        placement: PlacementStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            releases,
            workspaces,
            placement,
            notifier,
        }
    }

    async fn workspace(&self, id: &pubgate_core::types::id::WorkspaceId) -> AppResult<Workspace> {
        self.workspaces
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("workspace {id} not found")))
    }

    /// Creates a release with one placeholder file per declared name.
    ///
    /// Idempotent on content: a second call with the identical
    /// `(name, digest)` set resolves to the same release and reports
    /// `false` for the second element.
    pub async fn create_release(
        &self,
        ctx: &RequestContext,
        request: CreateRelease,
    ) -> AppResult<(Release, bool)> {
        if request.files.is_empty() {
            return Err(AppError::validation(
                "a release must declare at least one file",
            ));
        }
        for name in request.files.keys() {
            layout::validate_file_name(name)?;
        }

        let workspace = self.workspace(&request.workspace_id).await?;
        let release_id = ReleaseId::from(digest::batch_digest(&request.files));

        let release = Release {
            id: release_id.clone(),
            workspace_id: request.workspace_id,
            backend_id: request.backend_id,
            created_by: ctx.actor.clone(),
            created_at: ctx.request_time,
        };

        let mut placeholders = Vec::with_capacity(request.files.len());
        for (name, declared) in &request.files {
            placeholders.push(ReleaseFile {
                id: FileId::new(),
                release_id: release_id.clone(),
                workspace_id: request.workspace_id,
                name: name.clone(),
                storage_path: layout::release_path(&workspace.name, &release_id, name)?,
                digest: declared.clone(),
                created_by: ctx.actor.clone(),
                created_at: ctx.request_time,
                state: FileState::Pending,
            });
        }

        let (release, is_new) = self.releases.insert_or_get(&release, &placeholders).await?;

        if is_new {
            info!(
                release = %release.id,
                workspace = %release.workspace_id,
                files = placeholders.len(),
                "Created release"
            );
            self.notifier
                .release_event(&ReleaseEvent::Created {
                    release_id: release.id.clone(),
                    workspace_id: release.workspace_id,
                    file_count: placeholders.len(),
                    created_by: ctx.actor.clone(),
                })
                .await;
        } else {
            info!(release = %release.id, "Release already existed, returning it");
        }

        Ok((release, is_new))
    }

    /// Streams one declared file's bytes into place and stamps the
    /// placeholder.
    ///
    /// Fails with `NotFound` for an undeclared name, `FileAlreadyExists`
    /// for a file whose bytes are already committed, `Conflict` for a
    /// soft-deleted file, and `IntegrityMismatch` when the bytes do not
    /// hash to the declared digest. After a mismatch or I/O failure the
    /// placeholder stays pending and the upload may simply be retried.
    pub async fn upload_file(
        &self,
        ctx: &RequestContext,
        release_id: &ReleaseId,
        name: &str,
        stream: ByteStream,
    ) -> AppResult<ReleaseFile> {
        let file = self
            .releases
            .find_file(release_id, name)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "file {name:?} was not declared for release {release_id}"
                ))
            })?;

        match &file.state {
            FileState::Pending => {}
            FileState::Uploaded(_) => {
                return Err(AppError::file_already_exists(format!(
                    "file {name:?} of release {release_id} is already uploaded"
                )));
            }
            FileState::Deleted { .. } => {
                return Err(AppError::conflict(format!(
                    "file {name:?} of release {release_id} has been deleted"
                )));
            }
        }

        let workspace = self.workspace(&file.workspace_id).await?;

        // The placeholder is pending, so bytes found at the canonical path
        // can only be a crash between a previous rename and the metadata
        // stamp. Resuming re-verifies and overwrites them.
        let handle = self
            .placement
            .begin_upload(&workspace.name, release_id, name, true)
            .await?;
        let committed = self.placement.commit(handle, stream, &file.digest).await?;

        let meta = UploadedMeta {
            uploaded_at: ctx.request_time,
            size_bytes: committed.size_bytes as i64,
            mtime: committed.mtime,
        };
        let file = self.releases.mark_uploaded(&file.id, &meta).await?;

        info!(
            release = %release_id,
            name,
            size_bytes = committed.size_bytes,
            "Uploaded release file"
        );
        self.notifier
            .release_event(&ReleaseEvent::FileUploaded {
                file_id: file.id,
                release_id: release_id.clone(),
                workspace_id: file.workspace_id,
                name: name.to_string(),
                size_bytes: committed.size_bytes,
                uploaded_by: ctx.actor.clone(),
            })
            .await;

        Ok(file)
    }

    /// Opens a committed file for download as a byte stream.
    ///
    /// Only uploaded files are servable: a pending placeholder is
    /// `NotFound` to downstream readers, and a soft-deleted file is a
    /// `Conflict`.
    pub async fn open_file(
        &self,
        release_id: &ReleaseId,
        name: &str,
    ) -> AppResult<(ReleaseFile, ByteStream)> {
        let file = self
            .releases
            .find_file(release_id, name)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "file {name:?} was not declared for release {release_id}"
                ))
            })?;

        match &file.state {
            FileState::Uploaded(_) => {}
            FileState::Pending => {
                return Err(AppError::not_found(format!(
                    "file {name:?} of release {release_id} has no committed bytes"
                )));
            }
            FileState::Deleted { .. } => {
                return Err(AppError::conflict(format!(
                    "file {name:?} of release {release_id} has been deleted"
                )));
            }
        }

        let stream = self.placement.open(&file.storage_path).await?;
        Ok((file, stream))
    }

    /// Reports every declared file's state and whether the release is
    /// complete (all bytes landed; soft-deleted files still count, their
    /// bytes did land).
    pub async fn release_status(&self, release_id: &ReleaseId) -> AppResult<ReleaseStatus> {
        let release = self
            .releases
            .find_by_id(release_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("release {release_id} not found")))?;
        let files = self.releases.files_for_release(release_id).await?;
        let complete = files.iter().all(|f| f.uploaded_at().is_some());

        Ok(ReleaseStatus {
            release,
            files,
            complete,
        })
    }

    /// Soft-deletes an uploaded file: the state moves to deleted with the
    /// upload metadata retained for audit, then the bytes are removed
    /// best-effort.
    pub async fn delete_file(
        &self,
        ctx: &RequestContext,
        release_id: &ReleaseId,
        name: &str,
    ) -> AppResult<ReleaseFile> {
        let file = self
            .releases
            .find_file(release_id, name)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "file {name:?} was not declared for release {release_id}"
                ))
            })?;

        let file = self
            .releases
            .mark_deleted(&file.id, &ctx.actor, ctx.request_time)
            .await?;
        self.placement.delete(&file.storage_path).await?;

        info!(release = %release_id, name, deleted_by = %ctx.actor, "Deleted release file");
        self.notifier
            .release_event(&ReleaseEvent::FileDeleted {
                file_id: file.id,
                release_id: release_id.clone(),
                name: name.to_string(),
                deleted_by: ctx.actor.clone(),
            })
            .await;

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use bytes::Bytes;
    use chrono::Utc;
    use pubgate_core::digest::digest_bytes;
    use pubgate_core::error::ErrorKind;
    use pubgate_core::traits::storage::stream_from_bytes;
    use pubgate_core::types::id::{BackendId, WorkspaceId};
    use pubgate_database::memory::{MemoryReleaseRepository, MemoryWorkspaceRepository};
    use pubgate_storage::providers::LocalStorageProvider;

    use crate::notify::LogNotifier;

    struct Fixture {
        _dir: tempfile::TempDir,
        service: ReleaseIntakeService,
        workspace_id: WorkspaceId,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        let workspaces = Arc::new(MemoryWorkspaceRepository::new());

        let workspace = Workspace {
            id: WorkspaceId::new(),
            name: "team-alpha".to_string(),
            created_at: Utc::now(),
        };
        workspaces.create(&workspace).await.unwrap();

        let service = ReleaseIntakeService::new(
            Arc::new(MemoryReleaseRepository::new()),
            workspaces,
            PlacementStore::new(Arc::new(provider)),
            Arc::new(LogNotifier::new()),
        );
        Fixture {
            _dir: dir,
            service,
            workspace_id: workspace.id,
        }
    }

    fn declare(
        workspace_id: WorkspaceId,
        files: &[(&str, &[u8])],
    ) -> CreateRelease {
        let mut declared = BTreeMap::new();
        for (name, content) in files {
            declared.insert(name.to_string(), digest_bytes(content));
        }
        CreateRelease {
            workspace_id,
            backend_id: BackendId::new(),
            files: declared,
        }
    }

    #[tokio::test]
    async fn test_create_release_is_idempotent() {
        let fx = fixture().await;
        let ctx = RequestContext::new("runner");
        let request = declare(fx.workspace_id, &[("a.csv", b"1"), ("b.csv", b"2")]);

        let (first, is_new) = fx
            .service
            .create_release(&ctx, request.clone())
            .await
            .unwrap();
        assert!(is_new);

        let (second, is_new) = fx.service.create_release(&ctx, request).await.unwrap();
        assert!(!is_new);
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_create_release_rejects_empty_and_invalid_names() {
        let fx = fixture().await;
        let ctx = RequestContext::new("runner");

        let empty = declare(fx.workspace_id, &[]);
        let err = fx.service.create_release(&ctx, empty).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let traversal = declare(fx.workspace_id, &[("../escape", b"x")]);
        let err = fx.service.create_release(&ctx, traversal).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_upload_then_reupload_is_rejected() {
        let fx = fixture().await;
        let ctx = RequestContext::new("runner");
        let request = declare(fx.workspace_id, &[("out.csv", b"payload")]);
        let (release, _) = fx.service.create_release(&ctx, request).await.unwrap();

        let file = fx
            .service
            .upload_file(
                &ctx,
                &release.id,
                "out.csv",
                stream_from_bytes(Bytes::from_static(b"payload")),
            )
            .await
            .unwrap();
        assert!(file.is_uploaded());

        let err = fx
            .service
            .upload_file(
                &ctx,
                &release.id,
                "out.csv",
                stream_from_bytes(Bytes::from_static(b"payload")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileAlreadyExists);

        // The committed bytes are untouched.
        let bytes = fx
            .service
            .placement
            .read_bytes(&file.storage_path)
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn test_upload_of_undeclared_name_is_not_found() {
        let fx = fixture().await;
        let ctx = RequestContext::new("runner");
        let request = declare(fx.workspace_id, &[("a.csv", b"1")]);
        let (release, _) = fx.service.create_release(&ctx, request).await.unwrap();

        let err = fx
            .service
            .upload_file(
                &ctx,
                &release.id,
                "never-declared.csv",
                stream_from_bytes(Bytes::from_static(b"1")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_corrupted_upload_keeps_placeholder_pending() {
        let fx = fixture().await;
        let ctx = RequestContext::new("runner");
        let request = declare(fx.workspace_id, &[("out.csv", b"correct")]);
        let (release, _) = fx.service.create_release(&ctx, request).await.unwrap();

        let err = fx
            .service
            .upload_file(
                &ctx,
                &release.id,
                "out.csv",
                stream_from_bytes(Bytes::from_static(b"corrupted")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegrityMismatch);

        let status = fx.service.release_status(&release.id).await.unwrap();
        assert!(!status.complete);
        assert!(status.files[0].is_pending());

        // Retrying with the correct bytes completes the release.
        fx.service
            .upload_file(
                &ctx,
                &release.id,
                "out.csv",
                stream_from_bytes(Bytes::from_static(b"correct")),
            )
            .await
            .unwrap();
        let status = fx.service.release_status(&release.id).await.unwrap();
        assert!(status.complete);
    }

    #[tokio::test]
    async fn test_open_file_serves_only_committed_bytes() {
        use futures::StreamExt;

        let fx = fixture().await;
        let ctx = RequestContext::new("runner");
        let request = declare(fx.workspace_id, &[("out.csv", b"data")]);
        let (release, _) = fx.service.create_release(&ctx, request).await.unwrap();

        // Pending placeholder is not servable.
        let err = fx
            .service
            .open_file(&release.id, "out.csv")
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::NotFound);

        fx.service
            .upload_file(
                &ctx,
                &release.id,
                "out.csv",
                stream_from_bytes(Bytes::from_static(b"data")),
            )
            .await
            .unwrap();

        let (file, mut stream) = fx.service.open_file(&release.id, "out.csv").await.unwrap();
        assert!(file.is_uploaded());
        let mut served = Vec::new();
        while let Some(chunk) = stream.next().await {
            served.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(served, b"data");
    }

    #[tokio::test]
    async fn test_delete_file_removes_bytes_and_keeps_audit_metadata() {
        let fx = fixture().await;
        let ctx = RequestContext::new("runner");
        let request = declare(fx.workspace_id, &[("out.csv", b"data")]);
        let (release, _) = fx.service.create_release(&ctx, request).await.unwrap();
        fx.service
            .upload_file(
                &ctx,
                &release.id,
                "out.csv",
                stream_from_bytes(Bytes::from_static(b"data")),
            )
            .await
            .unwrap();

        let curator = RequestContext::new("curator");
        let file = fx
            .service
            .delete_file(&curator, &release.id, "out.csv")
            .await
            .unwrap();
        assert!(file.is_deleted());
        assert!(file.uploaded_meta().is_some());
        assert!(!fx.service.placement.exists(&file.storage_path).await.unwrap());

        // A release whose files all landed at some point is still complete.
        let status = fx.service.release_status(&release.id).await.unwrap();
        assert!(status.complete);
    }
}
