//! The snapshot assembler.
//!
//! A snapshot captures the publishable state of a workspace as a set of
//! release files. Identical sets collapse onto one snapshot: before
//! creating, the assembler compares the requested set against every
//! existing snapshot of the workspace. Set equality is checked in memory
//! since snapshots are small and workspace-scoped; a canonical content
//! hash index would be the next step if workspaces accumulate very large
//! snapshot counts.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{FileId, SnapshotId};
use pubgate_database::traits::{PublishRequestRepository, ReleaseRepository, SnapshotRepository};
use pubgate_entity::snapshot::Snapshot;

use crate::context::RequestContext;

/// Assembles and de-duplicates snapshots.
#[derive(Clone)]
pub struct SnapshotService {
    /// Release file lookups.
    releases: Arc<dyn ReleaseRepository>,
    /// Snapshot persistence.
    snapshots: Arc<dyn SnapshotRepository>,
    /// Request history, for the draft-only guard on member removal.
    requests: Arc<dyn PublishRequestRepository>,
}

impl SnapshotService {
    /// Creates a new snapshot service.
    pub fn new(
        releases: Arc<dyn ReleaseRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        requests: Arc<dyn PublishRequestRepository>,
    ) -> Self {
        Self {
            releases,
            snapshots,
            requests,
        }
    }

    /// Resolves the given file ids into a snapshot, reusing an existing
    /// snapshot with the identical member set.
    ///
    /// Soft-deleted files are dropped from the input. Fails with
    /// `NotFound` for an unknown id, `Validation` when nothing remains,
    /// `AmbiguousWorkspace` when the files span workspaces, and
    /// `DuplicateSnapshot` when more than one existing snapshot already
    /// matches the set (a data-integrity violation that must surface, not
    /// be silently resolved).
    pub async fn create_snapshot(
        &self,
        ctx: &RequestContext,
        file_ids: &[FileId],
    ) -> AppResult<(Snapshot, bool)> {
        let requested: BTreeSet<FileId> = file_ids.iter().copied().collect();
        let files = self
            .releases
            .find_files(&requested.iter().copied().collect::<Vec<_>>())
            .await?;

        let found: BTreeSet<FileId> = files.iter().map(|f| f.id).collect();
        if let Some(missing) = requested.difference(&found).next() {
            return Err(AppError::not_found(format!("file {missing} not found")));
        }

        let members: Vec<&_> = files.iter().filter(|f| !f.is_deleted()).collect();
        if members.is_empty() {
            return Err(AppError::validation(
                "a snapshot must contain at least one non-deleted file",
            ));
        }

        let workspace_id = members[0].workspace_id;
        if members.iter().any(|f| f.workspace_id != workspace_id) {
            return Err(AppError::ambiguous_workspace(
                "snapshot files span more than one workspace",
            ));
        }

        let member_set: BTreeSet<FileId> = members.iter().map(|f| f.id).collect();
        let existing = self.snapshots.find_by_workspace(&workspace_id).await?;
        let mut matches = existing.into_iter().filter(|s| s.file_set() == member_set);

        if let Some(snapshot) = matches.next() {
            if matches.next().is_some() {
                return Err(AppError::duplicate_snapshot(format!(
                    "workspace {workspace_id} holds more than one snapshot with this file set"
                )));
            }
            info!(snapshot = %snapshot.id, "Reusing existing snapshot for identical file set");
            return Ok((snapshot, false));
        }

        let snapshot = Snapshot {
            id: SnapshotId::new(),
            workspace_id,
            created_by: ctx.actor.clone(),
            created_at: ctx.request_time,
            file_ids: member_set.into_iter().collect(),
        };
        let snapshot = self.snapshots.create(&snapshot).await?;
        info!(
            snapshot = %snapshot.id,
            workspace = %workspace_id,
            files = snapshot.file_ids.len(),
            "Created snapshot"
        );
        Ok((snapshot, true))
    }

    /// Removes a member file from a snapshot that is still in draft.
    ///
    /// Once the snapshot's latest request is approved the snapshot is
    /// published and its membership is frozen; removal then fails with
    /// `InvalidStateTransition`.
    pub async fn remove_file(
        &self,
        _ctx: &RequestContext,
        snapshot_id: &SnapshotId,
        file_id: &FileId,
    ) -> AppResult<Snapshot> {
        let latest = self.requests.latest_for_snapshot(snapshot_id).await?;
        if latest.as_ref().is_some_and(|r| r.is_approved()) {
            return Err(AppError::invalid_state_transition(format!(
                "snapshot {snapshot_id} is published and its members cannot be removed"
            )));
        }

        let snapshot = self.snapshots.remove_file(snapshot_id, file_id).await?;
        info!(snapshot = %snapshot_id, file = %file_id, "Removed snapshot member");
        Ok(snapshot)
    }
}
