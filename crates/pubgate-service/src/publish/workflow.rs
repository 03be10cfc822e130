//! The publish request state machine.
//!
//! Per snapshot the states run `none -> pending -> approved | rejected`.
//! A decided request is never re-opened; a later resubmission is a new
//! request, so the history is an append-only sequence. "Is published" is
//! derived from the most recent request (ordered by creation time with
//! the repository-assigned sequence number as tie-break), never stored.
//!
//! Correcting a wrongly approved publish is a distinct administrative
//! action: retrospective rejection flips the most recent approved
//! request to rejected in place, which is the one exception to the
//! decide-once rule and is gated accordingly.

use std::sync::Arc;

use tracing::info;

use pubgate_core::error::AppError;
use pubgate_core::events::PublishEvent;
use pubgate_core::result::AppResult;
use pubgate_core::traits::notifier::Notifier;
use pubgate_core::types::id::{FileId, PublishRequestId, ReportId, SnapshotId};
use pubgate_database::traits::{PublishRequestRepository, ReportRepository};
use pubgate_entity::publish::{Decision, DecisionStatus, PublishRequest};

use crate::context::RequestContext;
use crate::snapshot::SnapshotService;

/// Drives the approval workflow.
#[derive(Clone)]
pub struct PublishService {
    /// Snapshot resolution for file-set entry points.
    assembler: SnapshotService,
    /// Request persistence and history.
    requests: Arc<dyn PublishRequestRepository>,
    /// Report lookups for linked-report requests.
    reports: Arc<dyn ReportRepository>,
    /// Best-effort event sink.
    notifier: Arc<dyn Notifier>,
}

impl PublishService {
    /// Creates a new publish service.
    pub fn new(
        assembler: SnapshotService,
        requests: Arc<dyn PublishRequestRepository>,
        reports: Arc<dyn ReportRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            assembler,
            requests,
            reports,
            notifier,
        }
    }

    /// Requests publication of the given file set, resolving or creating
    /// the snapshot first.
    ///
    /// Idempotent: when the snapshot already has a pending request, that
    /// request is returned unchanged. A linked report must render a file
    /// that is a member of the snapshot (`ReportSnapshotMismatch`).
    pub async fn create_from_files(
        &self,
        ctx: &RequestContext,
        file_ids: &[FileId],
        report_id: Option<ReportId>,
    ) -> AppResult<PublishRequest> {
        let (snapshot, _) = self.assembler.create_snapshot(ctx, file_ids).await?;

        if let Some(report_id) = &report_id {
            let report = self
                .reports
                .find_by_id(report_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("report {report_id} not found")))?;
            if !snapshot.contains(&report.file_id) {
                return Err(AppError::report_snapshot_mismatch(format!(
                    "report {report_id} renders file {} which is not a member of snapshot {}",
                    report.file_id, snapshot.id
                )));
            }
        }

        let request = PublishRequest {
            id: PublishRequestId::new(),
            snapshot_id: snapshot.id,
            workspace_id: snapshot.workspace_id,
            report_id,
            created_by: ctx.actor.clone(),
            created_at: ctx.request_time,
            seq: 0, // assigned by the repository
            decision: None,
            updated_at: ctx.request_time,
        };
        let (request, created) = self.requests.insert_pending(&request).await?;

        if created {
            info!(
                request = %request.id,
                snapshot = %request.snapshot_id,
                "Created pending publish request"
            );
            self.notifier
                .publish_event(&PublishEvent::Requested {
                    request_id: request.id,
                    snapshot_id: request.snapshot_id,
                    workspace_id: request.workspace_id,
                    created_by: ctx.actor.clone(),
                })
                .await;
        } else {
            info!(
                request = %request.id,
                snapshot = %request.snapshot_id,
                "Returning existing pending publish request"
            );
        }

        Ok(request)
    }

    /// Requests publication of a report via its current underlying file.
    ///
    /// After a rejection the report may have been repointed at a newer
    /// file; this entry point resolves whatever the report renders now,
    /// so a resubmission lands on a fresh snapshot while the rejected
    /// history stays untouched.
    pub async fn create_from_report(
        &self,
        ctx: &RequestContext,
        report_id: &ReportId,
    ) -> AppResult<PublishRequest> {
        let report = self
            .reports
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("report {report_id} not found")))?;

        self.create_from_files(ctx, &[report.file_id], Some(*report_id))
            .await
    }

    /// Approves a pending request. The only write that makes a snapshot
    /// published.
    pub async fn approve(
        &self,
        ctx: &RequestContext,
        request_id: &PublishRequestId,
    ) -> AppResult<PublishRequest> {
        let decision = Decision {
            status: DecisionStatus::Approved,
            decided_by: ctx.actor.clone(),
            decided_at: ctx.request_time,
        };
        let request = self.requests.decide(request_id, &decision, None).await?;

        info!(request = %request.id, decided_by = %ctx.actor, "Approved publish request");
        self.notifier
            .publish_event(&PublishEvent::Approved {
                request_id: request.id,
                snapshot_id: request.snapshot_id,
                decided_by: ctx.actor.clone(),
            })
            .await;
        Ok(request)
    }

    /// Rejects a pending request.
    pub async fn reject(
        &self,
        ctx: &RequestContext,
        request_id: &PublishRequestId,
    ) -> AppResult<PublishRequest> {
        let decision = Decision {
            status: DecisionStatus::Rejected,
            decided_by: ctx.actor.clone(),
            decided_at: ctx.request_time,
        };
        let request = self.requests.decide(request_id, &decision, None).await?;

        info!(request = %request.id, decided_by = %ctx.actor, "Rejected publish request");
        self.notifier
            .publish_event(&PublishEvent::Rejected {
                request_id: request.id,
                snapshot_id: request.snapshot_id,
                decided_by: ctx.actor.clone(),
            })
            .await;
        Ok(request)
    }

    /// Administrative correction of a wrongly approved publish.
    ///
    /// Legal only on the most recent request of its snapshot, and only
    /// while that request is currently approved; anything else fails with
    /// `InvalidStateTransition`.
    pub async fn retrospective_reject(
        &self,
        ctx: &RequestContext,
        request_id: &PublishRequestId,
    ) -> AppResult<PublishRequest> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("request {request_id} not found")))?;

        let latest = self
            .requests
            .latest_for_snapshot(&request.snapshot_id)
            .await?
            .ok_or_else(|| {
                AppError::internal(format!(
                    "snapshot {} has a request but no latest request",
                    request.snapshot_id
                ))
            })?;
        if latest.id != request.id {
            return Err(AppError::invalid_state_transition(format!(
                "request {request_id} is not the most recent request for snapshot {}",
                request.snapshot_id
            )));
        }

        let decision = Decision {
            status: DecisionStatus::Rejected,
            decided_by: ctx.actor.clone(),
            decided_at: ctx.request_time,
        };
        let request = self
            .requests
            .decide(request_id, &decision, Some(DecisionStatus::Approved))
            .await?;

        info!(
            request = %request.id,
            decided_by = %ctx.actor,
            "Retrospectively rejected publish request"
        );
        self.notifier
            .publish_event(&PublishEvent::Rejected {
                request_id: request.id,
                snapshot_id: request.snapshot_id,
                decided_by: ctx.actor.clone(),
            })
            .await;
        Ok(request)
    }

    /// Whether the snapshot is currently published: its most recent
    /// request is approved.
    pub async fn is_snapshot_published(&self, snapshot_id: &SnapshotId) -> AppResult<bool> {
        Ok(self
            .requests
            .latest_for_snapshot(snapshot_id)
            .await?
            .is_some_and(|r| r.is_approved()))
    }

    /// Whether the report is currently published: the most recent request
    /// linked to it is approved.
    pub async fn is_report_published(&self, report_id: &ReportId) -> AppResult<bool> {
        Ok(self
            .requests
            .latest_for_report(report_id)
            .await?
            .is_some_and(|r| r.is_approved()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use pubgate_core::digest::digest_bytes;
    use pubgate_core::error::ErrorKind;
    use pubgate_core::types::id::{BackendId, ReleaseId, WorkspaceId};
    use pubgate_database::memory::{
        MemoryPublishRequestRepository, MemoryReleaseRepository, MemoryReportRepository,
        MemorySnapshotRepository,
    };
    use pubgate_database::traits::ReleaseRepository;
    use pubgate_entity::release::{FileState, Release, ReleaseFile, UploadedMeta};
    use pubgate_entity::report::Report;

    use crate::notify::LogNotifier;

    struct Fixture {
        releases: Arc<MemoryReleaseRepository>,
        reports: Arc<MemoryReportRepository>,
        service: PublishService,
        workspace_id: WorkspaceId,
    }

    fn fixture() -> Fixture {
        let releases = Arc::new(MemoryReleaseRepository::new());
        let snapshots = Arc::new(MemorySnapshotRepository::new());
        let requests = Arc::new(MemoryPublishRequestRepository::new());
        let reports = Arc::new(MemoryReportRepository::new());

        let assembler = SnapshotService::new(releases.clone(), snapshots, requests.clone());
        let service = PublishService::new(
            assembler,
            requests,
            reports.clone(),
            Arc::new(LogNotifier::new()),
        );
        Fixture {
            releases,
            reports,
            service,
            workspace_id: WorkspaceId::new(),
        }
    }

    async fn uploaded_files(fx: &Fixture, names: &[&str]) -> Vec<FileId> {
        let release_id = ReleaseId::from(digest_bytes(names.join(",").as_bytes()));
        let release = Release {
            id: release_id.clone(),
            workspace_id: fx.workspace_id,
            backend_id: BackendId::new(),
            created_by: "runner".to_string(),
            created_at: Utc::now(),
        };
        let files: Vec<ReleaseFile> = names
            .iter()
            .map(|name| ReleaseFile {
                id: FileId::new(),
                release_id: release_id.clone(),
                workspace_id: fx.workspace_id,
                name: name.to_string(),
                storage_path: format!("ws/releases/{release_id}/{name}"),
                digest: digest_bytes(name.as_bytes()),
                created_by: "runner".to_string(),
                created_at: Utc::now(),
                state: FileState::Uploaded(UploadedMeta {
                    uploaded_at: Utc::now(),
                    size_bytes: 1,
                    mtime: Utc::now(),
                }),
            })
            .collect();
        fx.releases.insert_or_get(&release, &files).await.unwrap();
        files.iter().map(|f| f.id).collect()
    }

    #[tokio::test]
    async fn test_duplicate_request_returns_existing_pending() {
        let fx = fixture();
        let ctx = RequestContext::new("alice");
        let ids = uploaded_files(&fx, &["a.csv"]).await;

        let first = fx
            .service
            .create_from_files(&ctx, &ids, None)
            .await
            .unwrap();
        let second = fx
            .service
            .create_from_files(&ctx, &ids, None)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.is_pending());
    }

    #[tokio::test]
    async fn test_approve_publishes_and_retrospective_reject_unpublishes() {
        let fx = fixture();
        let ctx = RequestContext::new("alice");
        let ids = uploaded_files(&fx, &["a.csv"]).await;

        let request = fx
            .service
            .create_from_files(&ctx, &ids, None)
            .await
            .unwrap();
        let snapshot_id = request.snapshot_id;
        assert!(!fx.service.is_snapshot_published(&snapshot_id).await.unwrap());

        let approver = RequestContext::new("carol");
        fx.service.approve(&approver, &request.id).await.unwrap();
        assert!(fx.service.is_snapshot_published(&snapshot_id).await.unwrap());

        fx.service
            .retrospective_reject(&approver, &request.id)
            .await
            .unwrap();
        assert!(!fx.service.is_snapshot_published(&snapshot_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_decide_twice_is_invalid() {
        let fx = fixture();
        let ctx = RequestContext::new("alice");
        let ids = uploaded_files(&fx, &["a.csv"]).await;
        let request = fx
            .service
            .create_from_files(&ctx, &ids, None)
            .await
            .unwrap();

        fx.service.reject(&ctx, &request.id).await.unwrap();
        let err = fx.service.approve(&ctx, &request.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidStateTransition);

        // Retrospective rejection only applies to an approved request.
        let err = fx
            .service
            .retrospective_reject(&ctx, &request.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidStateTransition);
    }

    #[tokio::test]
    async fn test_rejection_then_resubmission_supports_new_approval() {
        let fx = fixture();
        let ctx = RequestContext::new("alice");
        let ids = uploaded_files(&fx, &["a.csv"]).await;

        let first = fx
            .service
            .create_from_files(&ctx, &ids, None)
            .await
            .unwrap();
        fx.service.reject(&ctx, &first.id).await.unwrap();
        let snapshot_id = first.snapshot_id;
        assert!(!fx.service.is_snapshot_published(&snapshot_id).await.unwrap());

        // Resubmission with the same set reuses the snapshot and opens a
        // fresh request.
        let second = fx
            .service
            .create_from_files(&ctx, &ids, None)
            .await
            .unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.snapshot_id, snapshot_id);

        fx.service.approve(&ctx, &second.id).await.unwrap();
        assert!(fx.service.is_snapshot_published(&snapshot_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_report_must_be_a_snapshot_member() {
        let fx = fixture();
        let ctx = RequestContext::new("alice");
        let ids = uploaded_files(&fx, &["a.csv"]).await;
        let other = uploaded_files(&fx, &["unrelated.csv"]).await;

        let report = Report {
            id: pubgate_core::types::id::ReportId::new(),
            workspace_id: fx.workspace_id,
            file_id: other[0],
            title: "Summary".to_string(),
            created_by: "alice".to_string(),
            created_at: Utc::now(),
        };
        fx.reports.create(&report).await.unwrap();

        let err = fx
            .service
            .create_from_files(&ctx, &ids, Some(report.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReportSnapshotMismatch);
    }

    #[tokio::test]
    async fn test_report_resubmission_on_new_file() {
        let fx = fixture();
        let alice = RequestContext::new("alice");
        let carol = RequestContext::new("carol");

        let v1 = uploaded_files(&fx, &["report-v1.html"]).await;
        let report = Report {
            id: pubgate_core::types::id::ReportId::new(),
            workspace_id: fx.workspace_id,
            file_id: v1[0],
            title: "Variant summary".to_string(),
            created_by: "alice".to_string(),
            created_at: Utc::now(),
        };
        fx.reports.create(&report).await.unwrap();

        let first = fx
            .service
            .create_from_report(&alice, &report.id)
            .await
            .unwrap();
        fx.service.reject(&carol, &first.id).await.unwrap();

        // The report moves to a corrected file and is resubmitted.
        let v2 = uploaded_files(&fx, &["report-v2.html"]).await;
        fx.reports.update_file(&report.id, &v2[0]).await.unwrap();

        let second = fx
            .service
            .create_from_report(&alice, &report.id)
            .await
            .unwrap();
        assert_ne!(second.snapshot_id, first.snapshot_id);

        fx.service.approve(&carol, &second.id).await.unwrap();
        assert!(fx.service.is_report_published(&report.id).await.unwrap());

        // The old rejected request is untouched history.
        let old = fx
            .service
            .requests
            .find_by_id(&first.id)
            .await
            .unwrap()
            .unwrap();
        assert!(old.is_rejected());
    }
}
