use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    host::{Action, HostDirectory, PermissionChecker},
    models::{
        comment_report, issue, issue_comment, issue_report, AbuseStatus, IssueStatus, Visibility,
    },
};

use super::notification::{IssueEvent, NotificationService};
use super::numbering;
use super::review_gate::ReviewGate;
use super::spam::{SpamCheckJob, TaskRunner};

/// Fields a caller may change through the general update path. Moderation
/// fields are not part of this shape, so update payloads carrying
/// `visibility` or `abuse_status` lose them at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentDetail {
    #[serde(flatten)]
    pub comment: issue_comment::Model,
    /// Author's public display name, when the host still knows them.
    pub user: Option<String>,
    pub abuse_reports: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub issue: issue::Model,
    pub user: Option<String>,
    pub comments: Vec<CommentDetail>,
    pub abuse_reports: Vec<String>,
}

pub struct IssueService {
    db: DatabaseConnection,
    directory: Arc<dyn HostDirectory>,
    perms: Arc<dyn PermissionChecker>,
    notifier: Arc<NotificationService>,
    review_gate: Arc<ReviewGate>,
    tasks: Arc<dyn TaskRunner>,
}

impl IssueService {
    pub fn new(
        db: DatabaseConnection,
        directory: Arc<dyn HostDirectory>,
        perms: Arc<dyn PermissionChecker>,
        notifier: Arc<NotificationService>,
        review_gate: Arc<ReviewGate>,
        tasks: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            db,
            directory,
            perms,
            notifier,
            review_gate,
            tasks,
        }
    }

    pub async fn create(
        &self,
        actor: &str,
        dataset_id: &str,
        title: &str,
        description: Option<&str>,
        resource_id: Option<&str>,
    ) -> AppResult<issue::Model> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        let dataset = self
            .directory
            .dataset(dataset_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let saved = self
            .insert_with_number(actor, &dataset.id, title, description, resource_id)
            .await?;
        tracing::debug!(
            issue = saved.id,
            dataset = %saved.dataset_id,
            number = saved.number,
            "created issue"
        );

        self.notify(IssueEvent::Created, &saved).await;
        self.gate_opened(&saved.dataset_id).await;
        self.tasks.enqueue(SpamCheckJob::Issue {
            dataset_id: saved.dataset_id.clone(),
            number: saved.number,
        });
        Ok(saved)
    }

    async fn insert_with_number(
        &self,
        actor: &str,
        dataset_id: &str,
        title: &str,
        description: Option<&str>,
        resource_id: Option<&str>,
    ) -> AppResult<issue::Model> {
        for _ in 0..numbering::MAX_ALLOCATION_ATTEMPTS {
            let txn = self.db.begin().await?;
            let number = numbering::next_issue_number(&txn, dataset_id).await?;
            let now = chrono::Utc::now().naive_utc();

            let model = issue::ActiveModel {
                number: Set(number),
                title: Set(title.to_string()),
                description: Set(description.map(|s| s.to_string())),
                dataset_id: Set(dataset_id.to_string()),
                resource_id: Set(resource_id.map(|s| s.to_string())),
                user_id: Set(actor.to_string()),
                assignee_id: Set(None),
                status: Set(IssueStatus::Open),
                resolved: Set(None),
                visibility: Set(Visibility::Visible),
                abuse_status: Set(AbuseStatus::Unmoderated),
                created: Set(now),
                ..Default::default()
            };

            match model.insert(&txn).await {
                Ok(saved) => {
                    txn.commit().await?;
                    return Ok(saved);
                }
                Err(e) if numbering::is_unique_violation(&e) => {
                    let _ = txn.rollback().await;
                    continue;
                }
                Err(e) => {
                    let _ = txn.rollback().await;
                    return Err(e.into());
                }
            }
        }
        Err(AppError::Conflict(format!(
            "could not allocate an issue number for dataset {dataset_id}"
        )))
    }

    pub async fn update(
        &self,
        actor: &str,
        dataset_id: &str,
        number: i32,
        changes: IssueUpdate,
    ) -> AppResult<issue::Model> {
        let existing = issue_by_number(&self.db, dataset_id, number)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(title) = &changes.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("title cannot be empty".to_string()));
            }
        }

        let transition = status_transition(existing.status, changes.status);
        let explicit_assignee = changes.assignee_id.is_some();

        let mut active: issue::ActiveModel = existing.into();
        if let Some(title) = changes.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(assignee_id) = changes.assignee_id {
            active.assignee_id = Set(Some(assignee_id));
        }

        match transition {
            Some(Transition::Close) => {
                let now = chrono::Utc::now().naive_utc();
                active.status = Set(IssueStatus::Closed);
                active.resolved = Set(Some(now));
                // closing assigns the issue to whoever closed it
                active.assignee_id = Set(Some(actor.to_string()));
            }
            Some(Transition::Reopen) => {
                active.status = Set(IssueStatus::Open);
                active.resolved = Set(None);
                if !explicit_assignee {
                    active.assignee_id = Set(None);
                }
            }
            None => {}
        }

        let updated = active.update(&self.db).await?;

        match transition {
            Some(Transition::Close) => {
                self.notify(IssueEvent::Closed, &updated).await;
                self.gate_closed(&updated.dataset_id).await;
            }
            Some(Transition::Reopen) => {
                self.notify(IssueEvent::Reopened, &updated).await;
                self.gate_opened(&updated.dataset_id).await;
            }
            None => {}
        }
        Ok(updated)
    }

    pub async fn delete(&self, dataset_id: &str, number: i32) -> AppResult<()> {
        let existing = issue_by_number(&self.db, dataset_id, number)
            .await?
            .ok_or(AppError::NotFound)?;
        let was_open = existing.status == IssueStatus::Open;

        issue::Entity::delete_by_id(existing.id)
            .exec(&self.db)
            .await?;
        tracing::debug!(dataset = dataset_id, number, "deleted issue");

        self.notify(IssueEvent::Deleted, &existing).await;
        if was_open {
            self.gate_closed(&existing.dataset_id).await;
        }
        Ok(())
    }

    /// Single issue with its comments. Hidden issues are not found for
    /// actors without dataset-update rights; reporter lists are filtered to
    /// the actor's own reports for the same actors.
    pub async fn show(
        &self,
        actor: Option<&str>,
        dataset_id: &str,
        number: i32,
        include_reports: bool,
    ) -> AppResult<IssueDetail> {
        let issue = issue_by_number(&self.db, dataset_id, number)
            .await?
            .ok_or(AppError::NotFound)?;

        let can_edit = match actor {
            Some(a) => self.perms.can(a, Action::UpdateDataset, dataset_id).await,
            None => false,
        };
        if issue.visibility == Visibility::Hidden && !can_edit {
            return Err(AppError::NotFound);
        }

        let comments = issue_comment::Entity::find()
            .filter(issue_comment::Column::IssueId.eq(issue.id))
            .order_by_asc(issue_comment::Column::Created)
            .order_by_asc(issue_comment::Column::Id)
            .all(&self.db)
            .await?;

        let mut user_ids: HashSet<&str> = comments.iter().map(|c| c.user_id.as_str()).collect();
        user_ids.insert(issue.user_id.as_str());
        let mut names: HashMap<String, String> = HashMap::new();
        for id in user_ids {
            if let Some(display) = self.directory.user_display(id).await? {
                names.insert(id.to_string(), display.name);
            }
        }

        let issue_reports = if include_reports {
            let reporters = issue_report::Entity::find()
                .filter(issue_report::Column::ParentId.eq(issue.id))
                .order_by_asc(issue_report::Column::Created)
                .all(&self.db)
                .await?
                .into_iter()
                .map(|r| r.user_id)
                .collect();
            visible_reports(reporters, can_edit, actor)
        } else {
            Vec::new()
        };

        let mut comment_details = Vec::with_capacity(comments.len());
        for comment in comments {
            let abuse_reports = if include_reports {
                let reporters = comment_report::Entity::find()
                    .filter(comment_report::Column::ParentId.eq(comment.id))
                    .order_by_asc(comment_report::Column::Created)
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .map(|r| r.user_id)
                    .collect();
                visible_reports(reporters, can_edit, actor)
            } else {
                Vec::new()
            };
            let user = names.get(&comment.user_id).cloned();
            comment_details.push(CommentDetail {
                comment,
                user,
                abuse_reports,
            });
        }

        let user = names.get(&issue.user_id).cloned();
        Ok(IssueDetail {
            issue,
            user,
            comments: comment_details,
            abuse_reports: issue_reports,
        })
    }

    pub async fn count(
        &self,
        dataset_id: &str,
        status: Option<IssueStatus>,
    ) -> AppResult<u64> {
        let mut query =
            issue::Entity::find().filter(issue::Column::DatasetId.eq(dataset_id));
        if let Some(status) = status {
            query = query.filter(issue::Column::Status.eq(status));
        }
        Ok(query.count(&self.db).await?)
    }

    /// Host hook for dataset deletion: removes the dataset's issues, and
    /// with them their comments and reports.
    pub async fn purge_dataset_issues(&self, dataset_id: &str) -> AppResult<u64> {
        let result = issue::Entity::delete_many()
            .filter(issue::Column::DatasetId.eq(dataset_id))
            .exec(&self.db)
            .await?;
        tracing::debug!(
            dataset = dataset_id,
            purged = result.rows_affected,
            "purged dataset issues"
        );
        Ok(result.rows_affected)
    }

    async fn notify(&self, event: IssueEvent, issue: &issue::Model) {
        if let Err(e) = self.notifier.dispatch(event, issue).await {
            tracing::warn!(issue = issue.id, error = ?e, "issue notification failed");
        }
    }

    async fn gate_opened(&self, dataset_id: &str) {
        if let Err(e) = self.review_gate.issue_opened(dataset_id).await {
            tracing::warn!(dataset = dataset_id, error = ?e, "review gate failed");
        }
    }

    async fn gate_closed(&self, dataset_id: &str) {
        if let Err(e) = self.review_gate.issue_closed(dataset_id).await {
            tracing::warn!(dataset = dataset_id, error = ?e, "review gate failed");
        }
    }
}

pub(crate) async fn issue_by_number<C: ConnectionTrait>(
    conn: &C,
    dataset_id: &str,
    number: i32,
) -> Result<Option<issue::Model>, DbErr> {
    issue::Entity::find()
        .filter(issue::Column::DatasetId.eq(dataset_id))
        .filter(issue::Column::Number.eq(number))
        .one(conn)
        .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Close,
    Reopen,
}

fn status_transition(current: IssueStatus, requested: Option<IssueStatus>) -> Option<Transition> {
    match (current, requested) {
        (IssueStatus::Open, Some(IssueStatus::Closed)) => Some(Transition::Close),
        (IssueStatus::Closed, Some(IssueStatus::Open)) => Some(Transition::Reopen),
        _ => None,
    }
}

fn visible_reports(reporters: Vec<String>, can_edit: bool, actor: Option<&str>) -> Vec<String> {
    if can_edit {
        return reporters;
    }
    match actor {
        Some(a) if reporters.iter().any(|r| r == a) => vec![a.to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_an_open_issue_is_a_transition() {
        assert_eq!(
            status_transition(IssueStatus::Open, Some(IssueStatus::Closed)),
            Some(Transition::Close)
        );
    }

    #[test]
    fn reopening_a_closed_issue_is_a_transition() {
        assert_eq!(
            status_transition(IssueStatus::Closed, Some(IssueStatus::Open)),
            Some(Transition::Reopen)
        );
    }

    #[test]
    fn same_status_is_not_a_transition() {
        assert_eq!(status_transition(IssueStatus::Open, Some(IssueStatus::Open)), None);
        assert_eq!(status_transition(IssueStatus::Open, None), None);
    }

    #[test]
    fn editors_see_every_report() {
        let reports = vec!["alice".to_string(), "bob".to_string()];
        assert_eq!(visible_reports(reports.clone(), true, None), reports);
    }

    #[test]
    fn reporters_only_see_their_own_report() {
        let reports = vec!["alice".to_string(), "bob".to_string()];
        assert_eq!(
            visible_reports(reports.clone(), false, Some("bob")),
            vec!["bob".to_string()]
        );
        assert!(visible_reports(reports, false, Some("carol")).is_empty());
    }
}
