//! Workspace entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pubgate_core::types::id::WorkspaceId;

/// A workspace: the unit of ownership for releases, snapshots, and
/// publish requests, and the top-level directory of the on-disk layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique workspace identifier.
    pub id: WorkspaceId,
    /// Workspace name; first path segment of every stored file.
    pub name: String,
    /// When the workspace was created.
    pub created_at: DateTime<Utc>,
}
