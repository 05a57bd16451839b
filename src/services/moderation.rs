//! Abuse-report bookkeeping and the visibility state machine.
//!
//! Two tiers: actors with dataset-update rights hide an entity the moment
//! they report it; everyone else accumulates strikes, and crossing the
//! configured limit hides the entity. Hiding is sticky — removing reports
//! never restores visibility, only the privileged reset does.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use crate::{
    config::IssuesConfig,
    error::{AppError, AppResult},
    host::{Action, PermissionChecker},
    models::{comment_report, issue, issue_comment, issue_report, AbuseStatus, Visibility},
};

use super::issue::issue_by_number;
use super::numbering::is_unique_violation;

enum Target {
    Issue(issue::Model),
    Comment(issue_comment::Model),
}

impl Target {
    fn visibility(&self) -> Visibility {
        match self {
            Target::Issue(i) => i.visibility,
            Target::Comment(c) => c.visibility,
        }
    }

    fn abuse_status(&self) -> AbuseStatus {
        match self {
            Target::Issue(i) => i.abuse_status,
            Target::Comment(c) => c.abuse_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub visibility: Visibility,
    pub abuse_status: AbuseStatus,
    /// Distinct reporters currently on record.
    pub strikes: u64,
}

pub struct ModerationService {
    db: DatabaseConnection,
    perms: Arc<dyn PermissionChecker>,
    config: IssuesConfig,
}

impl ModerationService {
    pub fn new(
        db: DatabaseConnection,
        perms: Arc<dyn PermissionChecker>,
        config: IssuesConfig,
    ) -> Self {
        Self { db, perms, config }
    }

    pub async fn report_issue(
        &self,
        actor: &str,
        dataset_id: &str,
        number: i32,
    ) -> AppResult<ReportOutcome> {
        let issue = issue_by_number(&self.db, dataset_id, number)
            .await?
            .ok_or(AppError::NotFound)?;
        self.file_report(actor, Target::Issue(issue)).await
    }

    pub async fn report_comment(&self, actor: &str, comment_id: i32) -> AppResult<ReportOutcome> {
        let comment = issue_comment::Entity::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        self.file_report(actor, Target::Comment(comment)).await
    }

    /// Clear reports on an issue. Privileged actors perform the full reset;
    /// anyone else only withdraws their own report.
    pub async fn clear_issue_reports(
        &self,
        actor: &str,
        dataset_id: &str,
        number: i32,
    ) -> AppResult<()> {
        let issue = issue_by_number(&self.db, dataset_id, number)
            .await?
            .ok_or(AppError::NotFound)?;
        self.clear_reports(actor, Target::Issue(issue)).await
    }

    pub async fn clear_comment_reports(&self, actor: &str, comment_id: i32) -> AppResult<()> {
        let comment = issue_comment::Entity::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        self.clear_reports(actor, Target::Comment(comment)).await
    }

    /// Full reset: visible, not abuse, all report rows deleted.
    /// Fails with Forbidden for actors without dataset-update rights.
    pub async fn reset_issue(&self, actor: &str, dataset_id: &str, number: i32) -> AppResult<()> {
        let issue = issue_by_number(&self.db, dataset_id, number)
            .await?
            .ok_or(AppError::NotFound)?;
        let target = Target::Issue(issue);
        self.require_privileged(actor, &target).await?;
        self.reset_target(&target).await
    }

    pub async fn reset_comment(&self, actor: &str, comment_id: i32) -> AppResult<()> {
        let comment = issue_comment::Entity::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let target = Target::Comment(comment);
        self.require_privileged(actor, &target).await?;
        self.reset_target(&target).await
    }

    /// Reporter ids on record for an issue. Privileged actors see all of
    /// them, everyone else only their own.
    pub async fn issue_reporters(
        &self,
        actor: &str,
        dataset_id: &str,
        number: i32,
    ) -> AppResult<Vec<String>> {
        let issue = issue_by_number(&self.db, dataset_id, number)
            .await?
            .ok_or(AppError::NotFound)?;
        let privileged = self.is_privileged(actor, &issue.dataset_id).await;

        let mut query = issue_report::Entity::find()
            .filter(issue_report::Column::ParentId.eq(issue.id))
            .order_by_asc(issue_report::Column::Created);
        if !privileged {
            query = query.filter(issue_report::Column::UserId.eq(actor));
        }
        let reports = query.all(&self.db).await?;
        Ok(reports.into_iter().map(|r| r.user_id).collect())
    }

    async fn is_privileged(&self, actor: &str, dataset_id: &str) -> bool {
        self.perms
            .can(actor, Action::UpdateDataset, dataset_id)
            .await
    }

    async fn require_privileged(&self, actor: &str, target: &Target) -> AppResult<()> {
        let dataset_id = self.dataset_of(target).await?;
        if self.is_privileged(actor, &dataset_id).await {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    async fn dataset_of(&self, target: &Target) -> AppResult<String> {
        match target {
            Target::Issue(i) => Ok(i.dataset_id.clone()),
            Target::Comment(c) => {
                let issue = issue::Entity::find_by_id(c.issue_id)
                    .one(&self.db)
                    .await?
                    .ok_or(AppError::NotFound)?;
                Ok(issue.dataset_id)
            }
        }
    }

    async fn file_report(&self, actor: &str, target: Target) -> AppResult<ReportOutcome> {
        let dataset_id = self.dataset_of(&target).await?;
        let privileged = self.is_privileged(actor, &dataset_id).await;

        let txn = self.db.begin().await?;
        record_report(&txn, actor, &target).await?;
        let strikes = count_reports(&txn, &target).await?;

        let (visibility, abuse_status) =
            if privileged || exceeds_strike_limit(strikes, self.config.max_strikes) {
                set_moderation_state(&txn, &target, Visibility::Hidden, AbuseStatus::Abuse).await?;
                (Visibility::Hidden, AbuseStatus::Abuse)
            } else {
                (target.visibility(), target.abuse_status())
            };
        txn.commit().await?;

        tracing::debug!(
            reporter = actor,
            privileged,
            strikes,
            "abuse report recorded"
        );
        Ok(ReportOutcome {
            visibility,
            abuse_status,
            strikes,
        })
    }

    async fn clear_reports(&self, actor: &str, target: Target) -> AppResult<()> {
        let dataset_id = self.dataset_of(&target).await?;
        if self.is_privileged(actor, &dataset_id).await {
            return self.reset_target(&target).await;
        }

        // Withdrawing a report never restores visibility; the entity stays
        // hidden until a privileged reset.
        match &target {
            Target::Issue(i) => {
                issue_report::Entity::delete_many()
                    .filter(issue_report::Column::ParentId.eq(i.id))
                    .filter(issue_report::Column::UserId.eq(actor))
                    .exec(&self.db)
                    .await?;
            }
            Target::Comment(c) => {
                comment_report::Entity::delete_many()
                    .filter(comment_report::Column::ParentId.eq(c.id))
                    .filter(comment_report::Column::UserId.eq(actor))
                    .exec(&self.db)
                    .await?;
            }
        }
        Ok(())
    }

    async fn reset_target(&self, target: &Target) -> AppResult<()> {
        let txn = self.db.begin().await?;
        set_moderation_state(&txn, target, Visibility::Visible, AbuseStatus::NotAbuse).await?;
        match target {
            Target::Issue(i) => {
                issue_report::Entity::delete_many()
                    .filter(issue_report::Column::ParentId.eq(i.id))
                    .exec(&txn)
                    .await?;
            }
            Target::Comment(c) => {
                comment_report::Entity::delete_many()
                    .filter(comment_report::Column::ParentId.eq(c.id))
                    .exec(&txn)
                    .await?;
            }
        }
        txn.commit().await?;
        Ok(())
    }
}

/// Insert the reporter's row unless it already exists. A losing race against
/// another transaction inserting the same (reporter, parent) pair is treated
/// the same as the row already existing.
async fn record_report(
    txn: &DatabaseTransaction,
    actor: &str,
    target: &Target,
) -> AppResult<()> {
    let now = chrono::Utc::now().naive_utc();
    match target {
        Target::Issue(i) => {
            let existing = issue_report::Entity::find()
                .filter(issue_report::Column::ParentId.eq(i.id))
                .filter(issue_report::Column::UserId.eq(actor))
                .one(txn)
                .await?;
            if existing.is_some() {
                return Ok(());
            }
            let model = issue_report::ActiveModel {
                user_id: Set(actor.to_string()),
                parent_id: Set(i.id),
                created: Set(now),
                ..Default::default()
            };
            match model.insert(txn).await {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
        Target::Comment(c) => {
            let existing = comment_report::Entity::find()
                .filter(comment_report::Column::ParentId.eq(c.id))
                .filter(comment_report::Column::UserId.eq(actor))
                .one(txn)
                .await?;
            if existing.is_some() {
                return Ok(());
            }
            let model = comment_report::ActiveModel {
                user_id: Set(actor.to_string()),
                parent_id: Set(c.id),
                created: Set(now),
                ..Default::default()
            };
            match model.insert(txn).await {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }
}

/// Distinct reporters on record. Rows are unique per (reporter, parent), so
/// the row count is the strike count.
async fn count_reports(txn: &DatabaseTransaction, target: &Target) -> AppResult<u64> {
    let count = match target {
        Target::Issue(i) => {
            issue_report::Entity::find()
                .filter(issue_report::Column::ParentId.eq(i.id))
                .count(txn)
                .await?
        }
        Target::Comment(c) => {
            comment_report::Entity::find()
                .filter(comment_report::Column::ParentId.eq(c.id))
                .count(txn)
                .await?
        }
    };
    Ok(count)
}

async fn set_moderation_state(
    txn: &DatabaseTransaction,
    target: &Target,
    visibility: Visibility,
    abuse_status: AbuseStatus,
) -> AppResult<()> {
    match target {
        Target::Issue(i) => {
            let mut active: issue::ActiveModel = i.clone().into();
            active.visibility = Set(visibility);
            active.abuse_status = Set(abuse_status);
            active.update(txn).await?;
        }
        Target::Comment(c) => {
            let mut active: issue_comment::ActiveModel = c.clone().into();
            active.visibility = Set(visibility);
            active.abuse_status = Set(abuse_status);
            active.update(txn).await?;
        }
    }
    Ok(())
}

fn exceeds_strike_limit(strikes: u64, max_strikes: Option<u32>) -> bool {
    match max_strikes {
        Some(max) => strikes > max as u64,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strike_limit_tolerates_max_reports() {
        assert!(!exceeds_strike_limit(1, Some(2)));
        assert!(!exceeds_strike_limit(2, Some(2)));
        assert!(exceeds_strike_limit(3, Some(2)));
    }

    #[test]
    fn no_limit_means_no_auto_hide() {
        assert!(!exceeds_strike_limit(1000, None));
    }
}
