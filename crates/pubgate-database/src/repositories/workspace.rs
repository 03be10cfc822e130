//! Workspace repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pubgate_core::error::{AppError, ErrorKind};
use pubgate_core::result::AppResult;
use pubgate_core::types::id::WorkspaceId;
use pubgate_entity::workspace::Workspace;

use crate::traits::WorkspaceRepository;

/// PostgreSQL-backed workspace repository.
#[derive(Debug, Clone)]
pub struct PgWorkspaceRepository {
    pool: PgPool,
}

impl PgWorkspaceRepository {
    /// Create a new workspace repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: WorkspaceId,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<WorkspaceRow> for Workspace {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl WorkspaceRepository for PgWorkspaceRepository {
    async fn create(&self, workspace: &Workspace) -> AppResult<Workspace> {
        sqlx::query_as::<_, WorkspaceRow>(
            "INSERT INTO workspaces (id, name, created_at) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(workspace.created_at)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create workspace", e))
    }

    async fn find_by_id(&self, id: &WorkspaceId) -> AppResult<Option<Workspace>> {
        sqlx::query_as::<_, WorkspaceRow>("SELECT * FROM workspaces WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Into::into))
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find workspace", e))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Workspace>> {
        sqlx::query_as::<_, WorkspaceRow>("SELECT * FROM workspaces WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Into::into))
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find workspace by name", e)
            })
    }
}
