//! Best-effort spam screening.
//!
//! Creation paths enqueue a [`SpamCheckJob`] after commit; the screener
//! re-reads the entity, asks the classifier, and files a report through the
//! moderation engine as the configured site user. The report path is
//! idempotent, so at-least-once task delivery is safe.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::{
    config::IssuesConfig,
    error::{AppError, AppResult},
    host::HostDirectory,
    models::issue_comment,
};

use super::issue::issue_by_number;
use super::moderation::ModerationService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamCheckJob {
    Issue { dataset_id: String, number: i32 },
    Comment { comment_id: i32 },
}

/// Task-submission seam. Hosts with a real queue implement this; for
/// everything else there is [`SpawnRunner`].
pub trait TaskRunner: Send + Sync {
    fn enqueue(&self, job: SpamCheckJob);
}

/// External spam-detection seam. `None` means unavailable or undecided.
#[async_trait]
pub trait SpamClassifier: Send + Sync {
    async fn classify(&self, text: &str, author: &str) -> Option<bool>;
}

pub struct SpamScreener {
    db: DatabaseConnection,
    classifier: Arc<dyn SpamClassifier>,
    moderation: Arc<ModerationService>,
    directory: Arc<dyn HostDirectory>,
    config: IssuesConfig,
}

impl SpamScreener {
    pub fn new(
        db: DatabaseConnection,
        classifier: Arc<dyn SpamClassifier>,
        moderation: Arc<ModerationService>,
        directory: Arc<dyn HostDirectory>,
        config: IssuesConfig,
    ) -> Self {
        Self {
            db,
            classifier,
            moderation,
            directory,
            config,
        }
    }

    pub async fn run(&self, job: SpamCheckJob) -> AppResult<()> {
        match job {
            SpamCheckJob::Issue { dataset_id, number } => {
                let issue = issue_by_number(&self.db, &dataset_id, number)
                    .await?
                    .ok_or(AppError::NotFound)?;
                let text = issue
                    .description
                    .clone()
                    .unwrap_or_else(|| issue.title.clone());
                if self.is_spam(&text, &issue.user_id).await {
                    self.moderation
                        .report_issue(&self.config.site_user_id, &dataset_id, number)
                        .await?;
                    tracing::info!(dataset = %dataset_id, number, "issue reported as spam");
                }
            }
            SpamCheckJob::Comment { comment_id } => {
                let comment = issue_comment::Entity::find_by_id(comment_id)
                    .one(&self.db)
                    .await?
                    .ok_or(AppError::NotFound)?;
                if self.is_spam(&comment.comment, &comment.user_id).await {
                    self.moderation
                        .report_comment(&self.config.site_user_id, comment_id)
                        .await?;
                    tracing::info!(comment = comment_id, "comment reported as spam");
                }
            }
        }
        Ok(())
    }

    async fn is_spam(&self, text: &str, user_id: &str) -> bool {
        let author = match self.directory.user_display(user_id).await {
            Ok(Some(display)) => display.name,
            _ => user_id.to_string(),
        };
        self.classifier.classify(text, &author).await.unwrap_or(false)
    }
}

/// Fire-and-forget runner for hosts without a task queue.
pub struct SpawnRunner {
    screener: Arc<SpamScreener>,
}

impl SpawnRunner {
    pub fn new(screener: Arc<SpamScreener>) -> Self {
        Self { screener }
    }
}

impl TaskRunner for SpawnRunner {
    fn enqueue(&self, job: SpamCheckJob) {
        let screener = self.screener.clone();
        tokio::spawn(async move {
            if let Err(e) = screener.run(job).await {
                tracing::warn!(error = ?e, "spam check failed");
            }
        });
    }
}
