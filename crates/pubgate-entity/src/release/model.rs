//! Release entity model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pubgate_core::digest::Digest;
use pubgate_core::types::id::{BackendId, ReleaseId, WorkspaceId};

/// An immutable record of one upload batch from an execution backend.
///
/// The identifier is the batch digest of the declared file set, so a
/// retried submission with identical content resolves to the same row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Content-derived release identifier.
    pub id: ReleaseId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The backend that produced and uploaded the outputs.
    pub backend_id: BackendId,
    /// The actor who requested the release.
    pub created_by: String,
    /// When the release was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRelease {
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The originating backend.
    pub backend_id: BackendId,
    /// Declared file set: researcher-facing name to content digest.
    pub files: BTreeMap<String, Digest>,
}
