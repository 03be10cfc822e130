use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{PublishRequestId, ReportId, SnapshotId};
use pubgate_entity::publish::{Decision, DecisionStatus, PublishRequest};

use crate::traits::PublishRequestRepository;

/// In-memory publish request repository.
///
/// Sequence numbers come from an atomic counter; the single-pending
/// invariant is enforced by scanning for an existing pending request
/// inside the write-lock scope of `insert_pending`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublishRequestRepository {
    requests: Arc<RwLock<HashMap<PublishRequestId, PublishRequest>>>,
    seq: Arc<AtomicI64>,
}

impl MemoryPublishRequestRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn latest(mut candidates: Vec<PublishRequest>) -> Option<PublishRequest> {
        candidates.sort_by_key(|r| (r.created_at, r.seq));
        candidates.pop()
    }
}

#[async_trait]
impl PublishRequestRepository for MemoryPublishRequestRepository {
    async fn insert_pending(&self, request: &PublishRequest) -> AppResult<(PublishRequest, bool)> {
        let mut requests = self.requests.write().await;

        if let Some(pending) = requests
            .values()
            .find(|r| r.snapshot_id == request.snapshot_id && r.is_pending())
        {
            return Ok((pending.clone(), false));
        }

        let mut stored = request.clone();
        stored.seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        stored.decision = None;
        requests.insert(stored.id, stored.clone());
        Ok((stored, true))
    }

    async fn find_by_id(&self, id: &PublishRequestId) -> AppResult<Option<PublishRequest>> {
        Ok(self.requests.read().await.get(id).cloned())
    }

    async fn find_by_snapshot(&self, snapshot: &SnapshotId) -> AppResult<Vec<PublishRequest>> {
        let requests = self.requests.read().await;
        let mut found: Vec<PublishRequest> = requests
            .values()
            .filter(|r| &r.snapshot_id == snapshot)
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.created_at, r.seq));
        Ok(found)
    }

    async fn latest_for_snapshot(
        &self,
        snapshot: &SnapshotId,
    ) -> AppResult<Option<PublishRequest>> {
        let requests = self.requests.read().await;
        Ok(Self::latest(
            requests
                .values()
                .filter(|r| &r.snapshot_id == snapshot)
                .cloned()
                .collect(),
        ))
    }

    async fn latest_for_report(&self, report: &ReportId) -> AppResult<Option<PublishRequest>> {
        let requests = self.requests.read().await;
        Ok(Self::latest(
            requests
                .values()
                .filter(|r| r.report_id.as_ref() == Some(report))
                .cloned()
                .collect(),
        ))
    }

    async fn decide(
        &self,
        id: &PublishRequestId,
        decision: &Decision,
        expected: Option<DecisionStatus>,
    ) -> AppResult<PublishRequest> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("request {id} not found")))?;

        let current = request.decision.as_ref().map(|d| d.status);
        if current != expected {
            return Err(AppError::invalid_state_transition(format!(
                "request {id} is {}, expected {}",
                current.map(|s| s.as_str()).unwrap_or("pending"),
                expected.map(|s| s.as_str()).unwrap_or("pending"),
            )));
        }

        request.decision = Some(decision.clone());
        request.updated_at = decision.decided_at;
        Ok(request.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pubgate_core::error::ErrorKind;
    use pubgate_core::types::id::WorkspaceId;

    fn request(snapshot_id: SnapshotId) -> PublishRequest {
        PublishRequest {
            id: PublishRequestId::new(),
            snapshot_id,
            workspace_id: WorkspaceId::new(),
            report_id: None,
            created_by: "alice".to_string(),
            created_at: Utc::now(),
            seq: 0,
            decision: None,
            updated_at: Utc::now(),
        }
    }

    fn approval() -> Decision {
        Decision {
            status: DecisionStatus::Approved,
            decided_by: "carol".to_string(),
            decided_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_single_pending_per_snapshot() {
        let repo = MemoryPublishRequestRepository::new();
        let snapshot_id = SnapshotId::new();

        let (first, created) = repo
            .insert_pending(&request(snapshot_id))
            .await
            .expect("insert");
        assert!(created);

        let (second, created) = repo
            .insert_pending(&request(snapshot_id))
            .await
            .expect("insert");
        assert!(!created);
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_new_pending_allowed_after_decision() {
        let repo = MemoryPublishRequestRepository::new();
        let snapshot_id = SnapshotId::new();

        let (first, _) = repo
            .insert_pending(&request(snapshot_id))
            .await
            .expect("insert");
        repo.decide(&first.id, &approval(), None).await.expect("decide");

        let (second, created) = repo
            .insert_pending(&request(snapshot_id))
            .await
            .expect("insert");
        assert!(created);
        assert_ne!(second.id, first.id);
        assert!(second.seq > first.seq);
    }

    #[tokio::test]
    async fn test_decide_is_compare_and_set() {
        let repo = MemoryPublishRequestRepository::new();
        let (req, _) = repo
            .insert_pending(&request(SnapshotId::new()))
            .await
            .expect("insert");

        repo.decide(&req.id, &approval(), None).await.expect("approve");

        // A second pending-expected decision must fail.
        let err = repo
            .decide(&req.id, &approval(), None)
            .await
            .expect_err("already decided");
        assert_eq!(err.kind, ErrorKind::InvalidStateTransition);

        // Retrospective rejection expects the current approved state.
        let rejection = Decision {
            status: DecisionStatus::Rejected,
            decided_by: "carol".to_string(),
            decided_at: Utc::now(),
        };
        let updated = repo
            .decide(&req.id, &rejection, Some(DecisionStatus::Approved))
            .await
            .expect("retrospective reject");
        assert!(updated.is_rejected());
    }

    #[tokio::test]
    async fn test_latest_prefers_seq_on_ties() {
        let repo = MemoryPublishRequestRepository::new();
        let snapshot_id = SnapshotId::new();
        let at = Utc::now();

        let mut first = request(snapshot_id);
        first.created_at = at;
        let (first, _) = repo.insert_pending(&first).await.expect("insert");
        repo.decide(&first.id, &approval(), None).await.expect("decide");

        let mut second = request(snapshot_id);
        second.created_at = at;
        let (second, _) = repo.insert_pending(&second).await.expect("insert");

        let latest = repo
            .latest_for_snapshot(&snapshot_id)
            .await
            .expect("latest")
            .expect("some");
        assert_eq!(latest.id, second.id);
    }
}
