//! Publish request repository implementation.
//!
//! The single-pending invariant is anchored on a partial unique index
//! over `(snapshot_id) WHERE decision IS NULL`, so the create-or-fetch
//! path stays race-free without advisory locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pubgate_core::error::{AppError, ErrorKind};
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{PublishRequestId, ReportId, SnapshotId, WorkspaceId};
use pubgate_entity::publish::{Decision, DecisionStatus, PublishRequest};

use crate::traits::PublishRequestRepository;

/// PostgreSQL-backed publish request repository.
#[derive(Debug, Clone)]
pub struct PgPublishRequestRepository {
    pool: PgPool,
}

impl PgPublishRequestRepository {
    /// Create a new publish request repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &PublishRequestId) -> AppResult<Option<PublishRequest>> {
        let row = sqlx::query_as::<_, PublishRequestRow>(
            "SELECT * FROM publish_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find request", e))?;
        row.map(PublishRequest::try_from).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct PublishRequestRow {
    id: PublishRequestId,
    snapshot_id: SnapshotId,
    workspace_id: WorkspaceId,
    report_id: Option<ReportId>,
    created_by: String,
    created_at: DateTime<Utc>,
    seq: i64,
    decision: Option<String>,
    decided_by: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PublishRequestRow> for PublishRequest {
    type Error = AppError;

    fn try_from(row: PublishRequestRow) -> Result<Self, Self::Error> {
        let decision = match (row.decision, row.decided_by, row.decided_at) {
            (None, None, None) => None,
            (Some(status), Some(decided_by), Some(decided_at)) => {
                let status = match status.as_str() {
                    "approved" => DecisionStatus::Approved,
                    "rejected" => DecisionStatus::Rejected,
                    other => {
                        return Err(AppError::internal(format!(
                            "request {} has unknown decision {other:?}",
                            row.id
                        )));
                    }
                };
                Some(Decision {
                    status,
                    decided_by,
                    decided_at,
                })
            }
            _ => {
                return Err(AppError::internal(format!(
                    "request {} has a partial decision record",
                    row.id
                )));
            }
        };

        Ok(PublishRequest {
            id: row.id,
            snapshot_id: row.snapshot_id,
            workspace_id: row.workspace_id,
            report_id: row.report_id,
            created_by: row.created_by,
            created_at: row.created_at,
            seq: row.seq,
            decision,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PublishRequestRepository for PgPublishRequestRepository {
    async fn insert_pending(&self, request: &PublishRequest) -> AppResult<(PublishRequest, bool)> {
        let inserted = sqlx::query_as::<_, PublishRequestRow>(
            "INSERT INTO publish_requests \
             (id, snapshot_id, workspace_id, report_id, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (snapshot_id) WHERE decision IS NULL DO NOTHING \
             RETURNING *",
        )
        .bind(request.id)
        .bind(request.snapshot_id)
        .bind(request.workspace_id)
        .bind(request.report_id)
        .bind(&request.created_by)
        .bind(request.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert request", e))?;

        if let Some(row) = inserted {
            return Ok((PublishRequest::try_from(row)?, true));
        }

        // Conflict with the partial unique index: a pending request for
        // this snapshot already exists. Return it.
        let pending = sqlx::query_as::<_, PublishRequestRow>(
            "SELECT * FROM publish_requests \
             WHERE snapshot_id = $1 AND decision IS NULL",
        )
        .bind(request.snapshot_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to fetch pending request", e)
        })?;

        match pending {
            Some(row) => Ok((PublishRequest::try_from(row)?, false)),
            // The pending request was decided between our insert and the
            // select. Treat it as a conflict the caller can retry.
            None => Err(AppError::conflict(format!(
                "pending request for snapshot {} was decided concurrently",
                request.snapshot_id
            ))),
        }
    }

    async fn find_by_id(&self, id: &PublishRequestId) -> AppResult<Option<PublishRequest>> {
        self.fetch(id).await
    }

    async fn find_by_snapshot(&self, snapshot: &SnapshotId) -> AppResult<Vec<PublishRequest>> {
        let rows = sqlx::query_as::<_, PublishRequestRow>(
            "SELECT * FROM publish_requests \
             WHERE snapshot_id = $1 \
             ORDER BY created_at ASC, seq ASC",
        )
        .bind(snapshot)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list snapshot requests", e)
        })?;

        rows.into_iter().map(PublishRequest::try_from).collect()
    }

    async fn latest_for_snapshot(
        &self,
        snapshot: &SnapshotId,
    ) -> AppResult<Option<PublishRequest>> {
        let row = sqlx::query_as::<_, PublishRequestRow>(
            "SELECT * FROM publish_requests \
             WHERE snapshot_id = $1 \
             ORDER BY created_at DESC, seq DESC \
             LIMIT 1",
        )
        .bind(snapshot)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to fetch latest request", e)
        })?;
        row.map(PublishRequest::try_from).transpose()
    }

    async fn latest_for_report(&self, report: &ReportId) -> AppResult<Option<PublishRequest>> {
        let row = sqlx::query_as::<_, PublishRequestRow>(
            "SELECT * FROM publish_requests \
             WHERE report_id = $1 \
             ORDER BY created_at DESC, seq DESC \
             LIMIT 1",
        )
        .bind(report)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to fetch latest request", e)
        })?;
        row.map(PublishRequest::try_from).transpose()
    }

    async fn decide(
        &self,
        id: &PublishRequestId,
        decision: &Decision,
        expected: Option<DecisionStatus>,
    ) -> AppResult<PublishRequest> {
        let row = match expected {
            None => {
                sqlx::query_as::<_, PublishRequestRow>(
                    "UPDATE publish_requests \
                     SET decision = $2, decided_by = $3, decided_at = $4, updated_at = $4 \
                     WHERE id = $1 AND decision IS NULL \
                     RETURNING *",
                )
                .bind(id)
                .bind(decision.status.as_str())
                .bind(&decision.decided_by)
                .bind(decision.decided_at)
                .fetch_optional(&self.pool)
                .await
            }
            Some(current) => {
                sqlx::query_as::<_, PublishRequestRow>(
                    "UPDATE publish_requests \
                     SET decision = $2, decided_by = $3, decided_at = $4, updated_at = $4 \
                     WHERE id = $1 AND decision = $5 \
                     RETURNING *",
                )
                .bind(id)
                .bind(decision.status.as_str())
                .bind(&decision.decided_by)
                .bind(decision.decided_at)
                .bind(current.as_str())
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record decision", e))?;

        match row {
            Some(row) => PublishRequest::try_from(row),
            None => match self.fetch(id).await? {
                Some(req) => Err(AppError::invalid_state_transition(format!(
                    "request {id} is {}, expected {}",
                    req.decision
                        .as_ref()
                        .map(|d| d.status.as_str())
                        .unwrap_or("pending"),
                    expected.map(|s| s.as_str()).unwrap_or("pending"),
                ))),
                None => Err(AppError::not_found(format!("request {id} not found"))),
            },
        }
    }
}
