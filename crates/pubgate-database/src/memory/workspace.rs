use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::types::id::WorkspaceId;
use pubgate_entity::workspace::Workspace;

use crate::traits::WorkspaceRepository;

/// In-memory workspace repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkspaceRepository {
    workspaces: Arc<RwLock<HashMap<WorkspaceId, Workspace>>>,
}

impl MemoryWorkspaceRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkspaceRepository for MemoryWorkspaceRepository {
    async fn create(&self, workspace: &Workspace) -> AppResult<Workspace> {
        let mut workspaces = self.workspaces.write().await;
        if workspaces.values().any(|w| w.name == workspace.name) {
            return Err(AppError::conflict(format!(
                "workspace {:?} already exists",
                workspace.name
            )));
        }
        workspaces.insert(workspace.id, workspace.clone());
        Ok(workspace.clone())
    }

    async fn find_by_id(&self, id: &WorkspaceId) -> AppResult<Option<Workspace>> {
        Ok(self.workspaces.read().await.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Workspace>> {
        Ok(self
            .workspaces
            .read()
            .await
            .values()
            .find(|w| w.name == name)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = MemoryWorkspaceRepository::new();
        let ws = Workspace {
            id: WorkspaceId::new(),
            name: "genomics".to_string(),
            created_at: Utc::now(),
        };

        repo.create(&ws).await.expect("create");
        let by_id = repo.find_by_id(&ws.id).await.expect("find");
        assert_eq!(by_id.map(|w| w.name), Some("genomics".to_string()));

        let by_name = repo.find_by_name("genomics").await.expect("find");
        assert_eq!(by_name.map(|w| w.id), Some(ws.id));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let repo = MemoryWorkspaceRepository::new();
        let ws = Workspace {
            id: WorkspaceId::new(),
            name: "genomics".to_string(),
            created_at: Utc::now(),
        };
        repo.create(&ws).await.expect("create");

        let dup = Workspace {
            id: WorkspaceId::new(),
            ..ws
        };
        assert!(repo.create(&dup).await.is_err());
    }
}
