use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::types::id::{FileId, ReportId};
use pubgate_entity::report::Report;

use crate::traits::ReportRepository;

/// In-memory report repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportRepository {
    reports: Arc<RwLock<HashMap<ReportId, Report>>>,
}

impl MemoryReportRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportRepository for MemoryReportRepository {
    async fn create(&self, report: &Report) -> AppResult<Report> {
        let mut reports = self.reports.write().await;
        reports.insert(report.id, report.clone());
        Ok(report.clone())
    }

    async fn find_by_id(&self, id: &ReportId) -> AppResult<Option<Report>> {
        Ok(self.reports.read().await.get(id).cloned())
    }

    async fn update_file(&self, id: &ReportId, file: &FileId) -> AppResult<Report> {
        let mut reports = self.reports.write().await;
        let report = reports
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("report {id} not found")))?;
        report.file_id = *file;
        Ok(report.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pubgate_core::types::id::WorkspaceId;

    #[tokio::test]
    async fn test_update_file_repoints_report() {
        let repo = MemoryReportRepository::new();
        let report = Report {
            id: ReportId::new(),
            workspace_id: WorkspaceId::new(),
            file_id: FileId::new(),
            title: "Q3 variant summary".to_string(),
            created_by: "alice".to_string(),
            created_at: Utc::now(),
        };
        repo.create(&report).await.expect("create");

        let newer = FileId::new();
        let updated = repo.update_file(&report.id, &newer).await.expect("update");
        assert_eq!(updated.file_id, newer);
        assert_eq!(updated.title, report.title);
    }
}
