//! Privacy gate driven by a dataset's open-issue count.
//!
//! The count is read fresh on every invocation; the gate only acts on the
//! 0↔1 boundary, so creates and closes while issues remain open do not
//! touch dataset visibility.

use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::{
    config::IssuesConfig,
    error::AppResult,
    host::DatasetControl,
    models::{issue, IssueStatus},
};

pub struct ReviewGate {
    db: DatabaseConnection,
    control: Arc<dyn DatasetControl>,
    config: IssuesConfig,
}

impl ReviewGate {
    pub fn new(
        db: DatabaseConnection,
        control: Arc<dyn DatasetControl>,
        config: IssuesConfig,
    ) -> Self {
        Self {
            db,
            control,
            config,
        }
    }

    /// Called after an issue was created or reopened.
    pub async fn issue_opened(&self, dataset_id: &str) -> AppResult<()> {
        if !self.config.review_system {
            return Ok(());
        }
        if self.open_count(dataset_id).await? == 1 {
            self.control.set_private(dataset_id, true).await?;
            tracing::info!(dataset = dataset_id, "dataset made private: first open issue");
        }
        Ok(())
    }

    /// Called after an open issue was closed or deleted.
    pub async fn issue_closed(&self, dataset_id: &str) -> AppResult<()> {
        if !self.config.review_system {
            return Ok(());
        }
        if self.open_count(dataset_id).await? == 0 {
            self.control.set_private(dataset_id, false).await?;
            tracing::info!(dataset = dataset_id, "dataset made public: no open issues");
        }
        Ok(())
    }

    async fn open_count(&self, dataset_id: &str) -> AppResult<u64> {
        let count = issue::Entity::find()
            .filter(issue::Column::DatasetId.eq(dataset_id))
            .filter(issue::Column::Status.eq(IssueStatus::Open))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
