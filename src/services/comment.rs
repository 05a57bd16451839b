use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

use crate::{
    error::{AppError, AppResult},
    models::{issue_comment, AbuseStatus, Visibility},
};

use super::issue::issue_by_number;
use super::notification::NotificationService;
use super::spam::{SpamCheckJob, TaskRunner};

pub struct CommentService {
    db: DatabaseConnection,
    notifier: Arc<NotificationService>,
    tasks: Arc<dyn TaskRunner>,
}

impl CommentService {
    pub fn new(
        db: DatabaseConnection,
        notifier: Arc<NotificationService>,
        tasks: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            db,
            notifier,
            tasks,
        }
    }

    pub async fn create(
        &self,
        actor: &str,
        dataset_id: &str,
        issue_number: i32,
        comment: &str,
    ) -> AppResult<issue_comment::Model> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(AppError::Validation("comment cannot be empty".to_string()));
        }
        let issue = issue_by_number(&self.db, dataset_id, issue_number)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = chrono::Utc::now().naive_utc();
        let model = issue_comment::ActiveModel {
            issue_id: Set(issue.id),
            comment: Set(comment.to_string()),
            user_id: Set(actor.to_string()),
            created: Set(now),
            visibility: Set(Visibility::Visible),
            abuse_status: Set(AbuseStatus::Unmoderated),
            ..Default::default()
        };
        let saved = model.insert(&self.db).await?;
        tracing::debug!(issue = issue.id, comment = saved.id, "created issue comment");

        if let Err(e) = self.notifier.comment_posted(&issue, &saved).await {
            tracing::warn!(comment = saved.id, error = ?e, "comment notification failed");
        }
        self.tasks
            .enqueue(SpamCheckJob::Comment { comment_id: saved.id });
        Ok(saved)
    }

    pub async fn get(&self, comment_id: i32) -> AppResult<issue_comment::Model> {
        issue_comment::Entity::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_for_issue(
        &self,
        dataset_id: &str,
        issue_number: i32,
    ) -> AppResult<Vec<issue_comment::Model>> {
        let issue = issue_by_number(&self.db, dataset_id, issue_number)
            .await?
            .ok_or(AppError::NotFound)?;
        let comments = issue_comment::Entity::find()
            .filter(issue_comment::Column::IssueId.eq(issue.id))
            .order_by_asc(issue_comment::Column::Created)
            .order_by_asc(issue_comment::Column::Id)
            .all(&self.db)
            .await?;
        Ok(comments)
    }

    /// Deletes the comment and, through the schema, its reports.
    pub async fn delete(&self, comment_id: i32) -> AppResult<()> {
        let existing = self.get(comment_id).await?;
        issue_comment::Entity::delete_by_id(existing.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
