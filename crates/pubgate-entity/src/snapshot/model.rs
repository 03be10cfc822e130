//! Snapshot entity model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pubgate_core::types::id::{FileId, SnapshotId, WorkspaceId};

/// An immutable, de-duplicated bundle of release files representing the
/// publishable state of a workspace at a point in time.
///
/// Within one workspace no two snapshots share the same file set; the
/// assembler enforces this by construction (set-equality search before
/// creation), not by a column constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot identifier.
    pub id: SnapshotId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// The actor who assembled the snapshot.
    pub created_by: String,
    /// When the snapshot was created.
    pub created_at: DateTime<Utc>,
    /// Member files, sorted by id.
    pub file_ids: Vec<FileId>,
}

impl Snapshot {
    /// The member files as a set, for set-equality comparison.
    pub fn file_set(&self) -> BTreeSet<FileId> {
        self.file_ids.iter().copied().collect()
    }

    /// Whether the given file is a member of this snapshot.
    pub fn contains(&self, file_id: &FileId) -> bool {
        self.file_ids.contains(file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_set_ignores_order() {
        let a = FileId::new();
        let b = FileId::new();

        let snap1 = Snapshot {
            id: SnapshotId::new(),
            workspace_id: WorkspaceId::new(),
            created_by: "alice".to_string(),
            created_at: Utc::now(),
            file_ids: vec![a, b],
        };
        let snap2 = Snapshot {
            file_ids: vec![b, a],
            ..snap1.clone()
        };

        assert_eq!(snap1.file_set(), snap2.file_set());
        assert!(snap1.contains(&a));
        assert!(!snap1.contains(&FileId::new()));
    }
}
