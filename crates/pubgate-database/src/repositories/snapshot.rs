//! Snapshot repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pubgate_core::error::{AppError, ErrorKind};
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{FileId, SnapshotId, WorkspaceId};
use pubgate_entity::snapshot::Snapshot;

use crate::traits::SnapshotRepository;

/// PostgreSQL-backed snapshot repository.
#[derive(Debug, Clone)]
pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    /// Create a new snapshot repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn member_ids(&self, id: &SnapshotId) -> AppResult<Vec<FileId>> {
        sqlx::query_scalar::<_, FileId>(
            "SELECT file_id FROM snapshot_files WHERE snapshot_id = $1 ORDER BY file_id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list snapshot members", e)
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: SnapshotId,
    workspace_id: WorkspaceId,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl SnapshotRow {
    fn into_snapshot(self, file_ids: Vec<FileId>) -> Snapshot {
        Snapshot {
            id: self.id,
            workspace_id: self.workspace_id,
            created_by: self.created_by,
            created_at: self.created_at,
            file_ids,
        }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn create(&self, snapshot: &Snapshot) -> AppResult<Snapshot> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query(
            "INSERT INTO snapshots (id, workspace_id, created_by, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(snapshot.id)
        .bind(snapshot.workspace_id)
        .bind(&snapshot.created_by)
        .bind(snapshot.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert snapshot", e))?;

        for file_id in &snapshot.file_ids {
            sqlx::query("INSERT INTO snapshot_files (snapshot_id, file_id) VALUES ($1, $2)")
                .bind(snapshot.id)
                .bind(file_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to insert snapshot member",
                        e,
                    )
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit snapshot", e)
        })?;

        Ok(snapshot.clone())
    }

    async fn find_by_id(&self, id: &SnapshotId) -> AppResult<Option<Snapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>("SELECT * FROM snapshots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find snapshot", e)
            })?;

        match row {
            Some(row) => {
                let members = self.member_ids(id).await?;
                Ok(Some(row.into_snapshot(members)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_workspace(&self, workspace: &WorkspaceId) -> AppResult<Vec<Snapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT * FROM snapshots WHERE workspace_id = $1 ORDER BY created_at ASC",
        )
        .bind(workspace)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list snapshots", e))?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in rows {
            let members = self.member_ids(&row.id).await?;
            snapshots.push(row.into_snapshot(members));
        }
        Ok(snapshots)
    }

    async fn remove_file(&self, snapshot: &SnapshotId, file: &FileId) -> AppResult<Snapshot> {
        let removed = sqlx::query(
            "DELETE FROM snapshot_files WHERE snapshot_id = $1 AND file_id = $2",
        )
        .bind(snapshot)
        .bind(file)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to remove snapshot member", e)
        })?
        .rows_affected();

        if removed == 0 {
            return Err(AppError::not_found(format!(
                "file {file} is not a member of snapshot {snapshot}"
            )));
        }

        self.find_by_id(snapshot)
            .await?
            .ok_or_else(|| AppError::not_found(format!("snapshot {snapshot} not found")))
    }
}
