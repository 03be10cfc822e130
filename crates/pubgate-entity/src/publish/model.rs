//! Publish request entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pubgate_core::types::id::{PublishRequestId, ReportId, SnapshotId, WorkspaceId};

/// The outcome of a decided publish request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// The snapshot may be exposed outside the workspace.
    Approved,
    /// Publication was declined.
    Rejected,
}

impl DecisionStatus {
    /// Stable string form, matching the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// A recorded decision. Decider and timestamp travel with the status so
/// the both-or-neither invariant holds structurally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The outcome.
    pub status: DecisionStatus,
    /// The actor who decided.
    pub decided_by: String,
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
}

/// One approval-workflow instance over a snapshot, optionally tied to a
/// report.
///
/// A request is created pending, transitions exactly once to approved or
/// rejected, and is never re-opened; a later decision requires a new
/// request. "Is published" is derived from the most recent request per
/// snapshot, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Unique request identifier.
    pub id: PublishRequestId,
    /// The snapshot this request would publish.
    pub snapshot_id: SnapshotId,
    /// The owning workspace.
    pub workspace_id: WorkspaceId,
    /// Optional report published alongside the snapshot.
    pub report_id: Option<ReportId>,
    /// The actor who requested publication.
    pub created_by: String,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// Monotonic sequence number; tie-break for "latest request" when two
    /// requests share a creation timestamp.
    pub seq: i64,
    /// The decision, if one has been made.
    pub decision: Option<Decision>,
    /// Last modification time (creation or decision).
    pub updated_at: DateTime<Utc>,
}

impl PublishRequest {
    /// Whether the request is still awaiting a decision.
    pub fn is_pending(&self) -> bool {
        self.decision.is_none()
    }

    /// Whether the request was approved.
    pub fn is_approved(&self) -> bool {
        matches!(
            self.decision,
            Some(Decision {
                status: DecisionStatus::Approved,
                ..
            })
        )
    }

    /// Whether the request was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self.decision,
            Some(Decision {
                status: DecisionStatus::Rejected,
                ..
            })
        )
    }
}
