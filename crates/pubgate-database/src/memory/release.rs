use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{FileId, ReleaseId};
use pubgate_entity::release::{FileState, Release, ReleaseFile, UploadedMeta};

use crate::traits::ReleaseRepository;

/// Releases and files live behind one lock so insert-or-get publishes the
/// release together with its placeholders.
#[derive(Debug, Default)]
struct ReleaseState {
    releases: HashMap<ReleaseId, Release>,
    files: HashMap<FileId, ReleaseFile>,
}

/// In-memory release repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryReleaseRepository {
    state: Arc<RwLock<ReleaseState>>,
}

impl MemoryReleaseRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReleaseRepository for MemoryReleaseRepository {
    async fn insert_or_get(
        &self,
        release: &Release,
        files: &[ReleaseFile],
    ) -> AppResult<(Release, bool)> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.releases.get(&release.id) {
            return Ok((existing.clone(), false));
        }

        state.releases.insert(release.id.clone(), release.clone());
        for file in files {
            state.files.insert(file.id, file.clone());
        }
        Ok((release.clone(), true))
    }

    async fn find_by_id(&self, id: &ReleaseId) -> AppResult<Option<Release>> {
        Ok(self.state.read().await.releases.get(id).cloned())
    }

    async fn files_for_release(&self, id: &ReleaseId) -> AppResult<Vec<ReleaseFile>> {
        let state = self.state.read().await;
        let mut files: Vec<ReleaseFile> = state
            .files
            .values()
            .filter(|f| &f.release_id == id)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn find_file(&self, release: &ReleaseId, name: &str) -> AppResult<Option<ReleaseFile>> {
        Ok(self
            .state
            .read()
            .await
            .files
            .values()
            .find(|f| &f.release_id == release && f.name == name)
            .cloned())
    }

    async fn find_file_by_id(&self, id: &FileId) -> AppResult<Option<ReleaseFile>> {
        Ok(self.state.read().await.files.get(id).cloned())
    }

    async fn find_files(&self, ids: &[FileId]) -> AppResult<Vec<ReleaseFile>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.files.get(id).cloned())
            .collect())
    }

    async fn mark_uploaded(&self, id: &FileId, meta: &UploadedMeta) -> AppResult<ReleaseFile> {
        let mut state = self.state.write().await;
        let file = state
            .files
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("file {id} not found")))?;

        if !file.is_pending() {
            return Err(AppError::file_already_exists(format!(
                "file {id} is no longer pending"
            )));
        }
        file.state = FileState::Uploaded(meta.clone());
        Ok(file.clone())
    }

    async fn mark_deleted(
        &self,
        id: &FileId,
        deleted_by: &str,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<ReleaseFile> {
        let mut state = self.state.write().await;
        let file = state
            .files
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("file {id} not found")))?;

        let uploaded = match &file.state {
            FileState::Uploaded(meta) => meta.clone(),
            FileState::Deleted { .. } => {
                return Err(AppError::conflict(format!("file {id} is already deleted")));
            }
            FileState::Pending => {
                return Err(AppError::conflict(format!(
                    "file {id} was never uploaded and cannot be deleted"
                )));
            }
        };

        file.state = FileState::Deleted {
            uploaded,
            deleted_at,
            deleted_by: deleted_by.to_string(),
        };
        Ok(file.clone())
    }
}
