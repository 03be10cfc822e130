//! Report entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pubgate_core::types::id::{FileId, ReportId, WorkspaceId};

/// A human-facing report backed by one release file.
///
/// The underlying file may be repointed (a resubmission after rejection
/// typically targets a newer release file); publish history tracks the
/// report id across those changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Unique report identifier.
    pub id: ReportId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The release file the report currently renders.
    pub file_id: FileId,
    /// Display title.
    pub title: String,
    /// The actor who created the report.
    pub created_by: String,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
}
