//! Repository traits for the PubGate aggregates.
//!
//! These are deliberately not generic CRUD interfaces. The operations
//! that matter here are the atomic primitives the intake pipeline and
//! approval workflow rest on: insert-or-get keyed on content identity,
//! create-or-fetch of the single pending request, and compare-and-set
//! decision writes. Every implementation must make those atomic with
//! respect to concurrent callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pubgate_core::result::AppResult;
use pubgate_core::types::id::{
    FileId, PublishRequestId, ReleaseId, ReportId, SnapshotId, WorkspaceId,
};
use pubgate_entity::publish::{Decision, DecisionStatus, PublishRequest};
use pubgate_entity::release::{Release, ReleaseFile, UploadedMeta};
use pubgate_entity::report::Report;
use pubgate_entity::snapshot::Snapshot;
use pubgate_entity::workspace::Workspace;

/// Workspace lookup and creation.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync + 'static {
    /// Persist a new workspace.
    async fn create(&self, workspace: &Workspace) -> AppResult<Workspace>;

    /// Find a workspace by id.
    async fn find_by_id(&self, id: &WorkspaceId) -> AppResult<Option<Workspace>>;

    /// Find a workspace by name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Workspace>>;
}

/// Releases and their files.
#[async_trait]
pub trait ReleaseRepository: Send + Sync + 'static {
    /// Insert a release with its placeholder files, or fetch the existing
    /// release with the same content-derived id.
    ///
    /// Atomic: of two concurrent callers with identical content, exactly
    /// one observes `true` (newly created); the other gets the winner's
    /// row with `false`. The release and all placeholders become visible
    /// together or not at all.
    async fn insert_or_get(
        &self,
        release: &Release,
        files: &[ReleaseFile],
    ) -> AppResult<(Release, bool)>;

    /// Find a release by id.
    async fn find_by_id(&self, id: &ReleaseId) -> AppResult<Option<Release>>;

    /// All files of a release, in name order.
    async fn files_for_release(&self, id: &ReleaseId) -> AppResult<Vec<ReleaseFile>>;

    /// Find one file of a release by its declared name.
    async fn find_file(&self, release: &ReleaseId, name: &str) -> AppResult<Option<ReleaseFile>>;

    /// Find a release file by id.
    async fn find_file_by_id(&self, id: &FileId) -> AppResult<Option<ReleaseFile>>;

    /// Find several release files by id. Ids with no matching row are
    /// simply absent from the result.
    async fn find_files(&self, ids: &[FileId]) -> AppResult<Vec<ReleaseFile>>;

    /// Stamp upload metadata on a pending placeholder.
    ///
    /// Compare-and-set: fails with `FileAlreadyExists` if the file is no
    /// longer pending, so a duplicate racing retry cannot double-commit.
    async fn mark_uploaded(&self, id: &FileId, meta: &UploadedMeta) -> AppResult<ReleaseFile>;

    /// Soft-delete an uploaded file, retaining its upload metadata.
    async fn mark_deleted(
        &self,
        id: &FileId,
        deleted_by: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<ReleaseFile>;
}

/// Snapshots and their member sets.
#[async_trait]
pub trait SnapshotRepository: Send + Sync + 'static {
    /// Persist a new snapshot with its member files.
    async fn create(&self, snapshot: &Snapshot) -> AppResult<Snapshot>;

    /// Find a snapshot by id, members included.
    async fn find_by_id(&self, id: &SnapshotId) -> AppResult<Option<Snapshot>>;

    /// All snapshots of a workspace, members included.
    async fn find_by_workspace(&self, workspace: &WorkspaceId) -> AppResult<Vec<Snapshot>>;

    /// Remove a member file from a snapshot (draft-only; the service layer
    /// enforces the draft check).
    async fn remove_file(&self, snapshot: &SnapshotId, file: &FileId) -> AppResult<Snapshot>;
}

/// Publish requests: the approval history.
#[async_trait]
pub trait PublishRequestRepository: Send + Sync + 'static {
    /// Insert a new pending request, or fetch the existing pending request
    /// for the same snapshot.
    ///
    /// Atomic create-or-fetch: at most one pending request per snapshot
    /// can ever exist, even under concurrent callers. The stored request
    /// (with its assigned sequence number) is returned together with
    /// whether it was newly created.
    async fn insert_pending(&self, request: &PublishRequest) -> AppResult<(PublishRequest, bool)>;

    /// Find a request by id.
    async fn find_by_id(&self, id: &PublishRequestId) -> AppResult<Option<PublishRequest>>;

    /// Full request history for a snapshot, oldest first.
    async fn find_by_snapshot(&self, snapshot: &SnapshotId) -> AppResult<Vec<PublishRequest>>;

    /// The most recent request for a snapshot, by `(created_at, seq)`.
    async fn latest_for_snapshot(&self, snapshot: &SnapshotId)
    -> AppResult<Option<PublishRequest>>;

    /// The most recent request linked to a report, by `(created_at, seq)`.
    async fn latest_for_report(&self, report: &ReportId) -> AppResult<Option<PublishRequest>>;

    /// Record a decision.
    ///
    /// Compare-and-set: with `expected = None` the request must currently
    /// be pending (the normal approve/reject path); with
    /// `expected = Some(status)` it must currently hold that decision
    /// (the retrospective-rejection path). Fails with
    /// `InvalidStateTransition` otherwise.
    async fn decide(
        &self,
        id: &PublishRequestId,
        decision: &Decision,
        expected: Option<DecisionStatus>,
    ) -> AppResult<PublishRequest>;
}

/// Reports.
#[async_trait]
pub trait ReportRepository: Send + Sync + 'static {
    /// Persist a new report.
    async fn create(&self, report: &Report) -> AppResult<Report>;

    /// Find a report by id.
    async fn find_by_id(&self, id: &ReportId) -> AppResult<Option<Report>>;

    /// Repoint a report at a different underlying release file.
    async fn update_file(&self, id: &ReportId, file: &FileId) -> AppResult<Report>;
}
