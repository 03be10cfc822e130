//! Release and release-file repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pubgate_core::digest::Digest;
use pubgate_core::error::{AppError, ErrorKind};
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{BackendId, FileId, ReleaseId, WorkspaceId};
use pubgate_entity::release::{FileState, Release, ReleaseFile, UploadedMeta};

use crate::traits::ReleaseRepository;

/// PostgreSQL-backed release repository.
#[derive(Debug, Clone)]
pub struct PgReleaseRepository {
    pool: PgPool,
}

impl PgReleaseRepository {
    /// Create a new release repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_file(&self, id: &FileId) -> AppResult<Option<ReleaseFile>> {
        let row = sqlx::query_as::<_, ReleaseFileRow>("SELECT * FROM release_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))?;
        row.map(ReleaseFile::try_from).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    id: ReleaseId,
    workspace_id: WorkspaceId,
    backend_id: BackendId,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<ReleaseRow> for Release {
    fn from(row: ReleaseRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            backend_id: row.backend_id,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReleaseFileRow {
    id: FileId,
    release_id: ReleaseId,
    workspace_id: WorkspaceId,
    name: String,
    storage_path: String,
    digest: Digest,
    created_by: String,
    created_at: DateTime<Utc>,
    state: String,
    uploaded_at: Option<DateTime<Utc>>,
    size_bytes: Option<i64>,
    mtime: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<String>,
}

impl TryFrom<ReleaseFileRow> for ReleaseFile {
    type Error = AppError;

    fn try_from(row: ReleaseFileRow) -> Result<Self, Self::Error> {
        let uploaded = || -> Result<UploadedMeta, AppError> {
            match (row.uploaded_at, row.size_bytes, row.mtime) {
                (Some(uploaded_at), Some(size_bytes), Some(mtime)) => Ok(UploadedMeta {
                    uploaded_at,
                    size_bytes,
                    mtime,
                }),
                _ => Err(AppError::internal(format!(
                    "release file {} is {} but missing upload metadata",
                    row.id, row.state
                ))),
            }
        };

        let state = match row.state.as_str() {
            "pending" => FileState::Pending,
            "uploaded" => FileState::Uploaded(uploaded()?),
            "deleted" => match (row.deleted_at, row.deleted_by.clone()) {
                (Some(deleted_at), Some(deleted_by)) => FileState::Deleted {
                    uploaded: uploaded()?,
                    deleted_at,
                    deleted_by,
                },
                _ => {
                    return Err(AppError::internal(format!(
                        "release file {} is deleted but missing deletion markers",
                        row.id
                    )));
                }
            },
            other => {
                return Err(AppError::internal(format!(
                    "release file {} has unknown state {other:?}",
                    row.id
                )));
            }
        };

        Ok(ReleaseFile {
            id: row.id,
            release_id: row.release_id,
            workspace_id: row.workspace_id,
            name: row.name,
            storage_path: row.storage_path,
            digest: row.digest,
            created_by: row.created_by,
            created_at: row.created_at,
            state,
        })
    }
}

#[async_trait]
impl ReleaseRepository for PgReleaseRepository {
    async fn insert_or_get(
        &self,
        release: &Release,
        files: &[ReleaseFile],
    ) -> AppResult<(Release, bool)> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let inserted = sqlx::query(
            "INSERT INTO releases (id, workspace_id, backend_id, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&release.id)
        .bind(release.workspace_id)
        .bind(release.backend_id)
        .bind(&release.created_by)
        .bind(release.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert release", e))?
        .rows_affected();

        if inserted == 0 {
            // Lost the insert race (or an idempotent retry): the winner's
            // row is the release.
            drop(tx);
            let existing = self
                .find_by_id(&release.id)
                .await?
                .ok_or_else(|| AppError::database("Release vanished during insert-or-get"))?;
            return Ok((existing, false));
        }

        for file in files {
            sqlx::query(
                "INSERT INTO release_files \
                 (id, release_id, workspace_id, name, storage_path, digest, \
                  created_by, created_at, state) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')",
            )
            .bind(file.id)
            .bind(&file.release_id)
            .bind(file.workspace_id)
            .bind(&file.name)
            .bind(&file.storage_path)
            .bind(&file.digest)
            .bind(&file.created_by)
            .bind(file.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert placeholder file", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit release", e)
        })?;

        Ok((release.clone(), true))
    }

    async fn find_by_id(&self, id: &ReleaseId) -> AppResult<Option<Release>> {
        sqlx::query_as::<_, ReleaseRow>("SELECT * FROM releases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Into::into))
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find release", e))
    }

    async fn files_for_release(&self, id: &ReleaseId) -> AppResult<Vec<ReleaseFile>> {
        let rows = sqlx::query_as::<_, ReleaseFileRow>(
            "SELECT * FROM release_files WHERE release_id = $1 ORDER BY name ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))?;

        rows.into_iter().map(ReleaseFile::try_from).collect()
    }

    async fn find_file(&self, release: &ReleaseId, name: &str) -> AppResult<Option<ReleaseFile>> {
        let row = sqlx::query_as::<_, ReleaseFileRow>(
            "SELECT * FROM release_files WHERE release_id = $1 AND name = $2",
        )
        .bind(release)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find file by name", e)
        })?;
        row.map(ReleaseFile::try_from).transpose()
    }

    async fn find_file_by_id(&self, id: &FileId) -> AppResult<Option<ReleaseFile>> {
        self.fetch_file(id).await
    }

    async fn find_files(&self, ids: &[FileId]) -> AppResult<Vec<ReleaseFile>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        let rows = sqlx::query_as::<_, ReleaseFileRow>(
            "SELECT * FROM release_files WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find files", e))?;

        rows.into_iter().map(ReleaseFile::try_from).collect()
    }

    async fn mark_uploaded(&self, id: &FileId, meta: &UploadedMeta) -> AppResult<ReleaseFile> {
        let row = sqlx::query_as::<_, ReleaseFileRow>(
            "UPDATE release_files \
             SET state = 'uploaded', uploaded_at = $2, size_bytes = $3, mtime = $4 \
             WHERE id = $1 AND state = 'pending' \
             RETURNING *",
        )
        .bind(id)
        .bind(meta.uploaded_at)
        .bind(meta.size_bytes)
        .bind(meta.mtime)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark uploaded", e))?;

        match row {
            Some(row) => ReleaseFile::try_from(row),
            None => match self.fetch_file(id).await? {
                Some(_) => Err(AppError::file_already_exists(format!(
                    "file {id} is no longer pending"
                ))),
                None => Err(AppError::not_found(format!("file {id} not found"))),
            },
        }
    }

    async fn mark_deleted(
        &self,
        id: &FileId,
        deleted_by: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<ReleaseFile> {
        let row = sqlx::query_as::<_, ReleaseFileRow>(
            "UPDATE release_files \
             SET state = 'deleted', deleted_at = $2, deleted_by = $3 \
             WHERE id = $1 AND state = 'uploaded' \
             RETURNING *",
        )
        .bind(id)
        .bind(deleted_at)
        .bind(deleted_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark deleted", e))?;

        match row {
            Some(row) => ReleaseFile::try_from(row),
            None => match self.fetch_file(id).await? {
                Some(file) if file.is_deleted() => Err(AppError::conflict(format!(
                    "file {id} is already deleted"
                ))),
                Some(_) => Err(AppError::conflict(format!(
                    "file {id} was never uploaded and cannot be deleted"
                ))),
                None => Err(AppError::not_found(format!("file {id} not found"))),
            },
        }
    }
}
