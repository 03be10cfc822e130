//! Report repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pubgate_core::error::{AppError, ErrorKind};
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{FileId, ReportId, WorkspaceId};
use pubgate_entity::report::Report;

use crate::traits::ReportRepository;

/// PostgreSQL-backed report repository.
#[derive(Debug, Clone)]
pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    /// Create a new report repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: ReportId,
    workspace_id: WorkspaceId,
    file_id: FileId,
    title: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            file_id: row.file_id,
            title: row.title,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn create(&self, report: &Report) -> AppResult<Report> {
        sqlx::query_as::<_, ReportRow>(
            "INSERT INTO reports (id, workspace_id, file_id, title, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING *",
        )
        .bind(report.id)
        .bind(report.workspace_id)
        .bind(report.file_id)
        .bind(&report.title)
        .bind(&report.created_by)
        .bind(report.created_at)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create report", e))
    }

    async fn find_by_id(&self, id: &ReportId) -> AppResult<Option<Report>> {
        sqlx::query_as::<_, ReportRow>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Into::into))
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find report", e))
    }

    async fn update_file(&self, id: &ReportId, file: &FileId) -> AppResult<Report> {
        let row = sqlx::query_as::<_, ReportRow>(
            "UPDATE reports SET file_id = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(file)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update report", e))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::not_found(format!("report {id} not found")))
    }
}
