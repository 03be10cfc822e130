//! Publish workflow events.

use serde::{Deserialize, Serialize};

use crate::types::id::{PublishRequestId, SnapshotId, WorkspaceId};

/// Events related to the publish approval workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PublishEvent {
    /// A new pending publish request was created.
    Requested {
        /// The request identifier.
        request_id: PublishRequestId,
        /// The target snapshot.
        snapshot_id: SnapshotId,
        /// The owning workspace.
        workspace_id: WorkspaceId,
        /// The actor who requested publication.
        created_by: String,
    },
    /// A pending publish request was approved.
    Approved {
        /// The request identifier.
        request_id: PublishRequestId,
        /// The target snapshot.
        snapshot_id: SnapshotId,
        /// The approver.
        decided_by: String,
    },
    /// A publish request was rejected (normal or retrospective).
    Rejected {
        /// The request identifier.
        request_id: PublishRequestId,
        /// The target snapshot.
        snapshot_id: SnapshotId,
        /// The rejector.
        decided_by: String,
    },
}
