use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{FileId, SnapshotId, WorkspaceId};
use pubgate_entity::snapshot::Snapshot;

use crate::traits::SnapshotRepository;

/// In-memory snapshot repository.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotRepository {
    snapshots: Arc<RwLock<HashMap<SnapshotId, Snapshot>>>,
}

impl MemorySnapshotRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotRepository for MemorySnapshotRepository {
    async fn create(&self, snapshot: &Snapshot) -> AppResult<Snapshot> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.id, snapshot.clone());
        Ok(snapshot.clone())
    }

    async fn find_by_id(&self, id: &SnapshotId) -> AppResult<Option<Snapshot>> {
        Ok(self.snapshots.read().await.get(id).cloned())
    }

    async fn find_by_workspace(&self, workspace: &WorkspaceId) -> AppResult<Vec<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        let mut found: Vec<Snapshot> = snapshots
            .values()
            .filter(|s| &s.workspace_id == workspace)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.created_at);
        Ok(found)
    }

    async fn remove_file(&self, snapshot: &SnapshotId, file: &FileId) -> AppResult<Snapshot> {
        let mut snapshots = self.snapshots.write().await;
        let snap = snapshots
            .get_mut(snapshot)
            .ok_or_else(|| AppError::not_found(format!("snapshot {snapshot} not found")))?;

        let before = snap.file_ids.len();
        snap.file_ids.retain(|id| id != file);
        if snap.file_ids.len() == before {
            return Err(AppError::not_found(format!(
                "file {file} is not a member of snapshot {snapshot}"
            )));
        }
        Ok(snap.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(workspace_id: WorkspaceId, file_ids: Vec<FileId>) -> Snapshot {
        Snapshot {
            id: SnapshotId::new(),
            workspace_id,
            created_by: "curator".to_string(),
            created_at: Utc::now(),
            file_ids,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_by_workspace() {
        let repo = MemorySnapshotRepository::new();
        let ws = WorkspaceId::new();

        let snap = snapshot(ws, vec![FileId::new()]);
        repo.create(&snap).await.expect("create");
        repo.create(&snapshot(WorkspaceId::new(), vec![]))
            .await
            .expect("create other");

        let listed = repo.find_by_workspace(&ws).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, snap.id);
    }

    #[tokio::test]
    async fn test_remove_file() {
        let repo = MemorySnapshotRepository::new();
        let keep = FileId::new();
        let drop = FileId::new();
        let snap = snapshot(WorkspaceId::new(), vec![keep, drop]);
        repo.create(&snap).await.expect("create");

        let updated = repo.remove_file(&snap.id, &drop).await.expect("remove");
        assert_eq!(updated.file_ids, vec![keep]);

        assert!(repo.remove_file(&snap.id, &drop).await.is_err());
    }
}
