//! Release intake events.

use serde::{Deserialize, Serialize};

use crate::types::id::{FileId, ReleaseId, WorkspaceId};

/// Events related to release intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReleaseEvent {
    /// A new release was created with placeholder files.
    Created {
        /// The release identifier.
        release_id: ReleaseId,
        /// The owning workspace.
        workspace_id: WorkspaceId,
        /// Number of declared files.
        file_count: usize,
        /// The actor who created the release.
        created_by: String,
    },
    /// A release file's bytes were committed and verified.
    FileUploaded {
        /// The file identifier.
        file_id: FileId,
        /// The release the file belongs to.
        release_id: ReleaseId,
        /// The owning workspace.
        workspace_id: WorkspaceId,
        /// The researcher-facing file name.
        name: String,
        /// Committed size in bytes.
        size_bytes: u64,
        /// The actor who uploaded the file.
        uploaded_by: String,
    },
    /// A release file was soft-deleted.
    FileDeleted {
        /// The file identifier.
        file_id: FileId,
        /// The release the file belongs to.
        release_id: ReleaseId,
        /// The researcher-facing file name.
        name: String,
        /// The actor who deleted the file.
        deleted_by: String,
    },
}
