//! Release file entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pubgate_core::digest::Digest;
use pubgate_core::types::id::{FileId, ReleaseId, WorkspaceId};

/// Upload metadata recorded when a file's bytes are committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMeta {
    /// When the bytes were committed and verified.
    pub uploaded_at: DateTime<Utc>,
    /// Committed size in bytes.
    pub size_bytes: i64,
    /// Modification time of the stored file.
    pub mtime: DateTime<Utc>,
}

/// Lifecycle state of a release file.
///
/// Modeled as a tagged variant so that illegal combinations (uploaded
/// metadata on a pending placeholder, a deletion marker on a file that
/// never held bytes) are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileState {
    /// Declared but bytes not yet received; must not be served.
    Pending,
    /// Bytes committed and digest-verified.
    Uploaded(UploadedMeta),
    /// Soft-deleted: bytes removed, metadata retained for audit.
    Deleted {
        /// Upload metadata from before the deletion.
        uploaded: UploadedMeta,
        /// When the file was deleted.
        deleted_at: DateTime<Utc>,
        /// The actor who deleted the file.
        deleted_by: String,
    },
}

/// One named file inside a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseFile {
    /// Unique file identifier.
    pub id: FileId,
    /// The release this file belongs to.
    pub release_id: ReleaseId,
    /// The owning workspace (must always agree with the release's).
    pub workspace_id: WorkspaceId,
    /// Researcher-facing relative path, unique within the release.
    pub name: String,
    /// Canonical physical path inside the placement store.
    pub storage_path: String,
    /// Declared content digest, verified on upload.
    pub digest: Digest,
    /// The actor who declared the file.
    pub created_by: String,
    /// When the placeholder was created.
    pub created_at: DateTime<Utc>,
    /// Lifecycle state.
    pub state: FileState,
}

impl ReleaseFile {
    /// Whether the file is still a placeholder awaiting bytes.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, FileState::Pending)
    }

    /// Whether the file's bytes are committed and servable.
    pub fn is_uploaded(&self) -> bool {
        matches!(self.state, FileState::Uploaded(_))
    }

    /// Whether the file has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self.state, FileState::Deleted { .. })
    }

    /// Upload metadata, if the bytes ever landed (uploaded or deleted).
    pub fn uploaded_meta(&self) -> Option<&UploadedMeta> {
        match &self.state {
            FileState::Pending => None,
            FileState::Uploaded(meta) => Some(meta),
            FileState::Deleted { uploaded, .. } => Some(uploaded),
        }
    }

    /// Upload timestamp, if any.
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        self.uploaded_meta().map(|m| m.uploaded_at)
    }
}
