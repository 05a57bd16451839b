//! Filtered, sorted, paginated search over issues and comments.
//!
//! The engine performs no permission checks of its own: callers resolve the
//! visibility scope an actor may see and pass it in through the filters.
//! Organization scoping goes through the host directory (org → descendant
//! orgs → dataset ids) so queries never touch host-owned tables.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDateTime;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    host::HostDirectory,
    models::{issue, issue_comment, AbuseStatus, IssueStatus, Visibility},
};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSort {
    #[default]
    Newest,
    Oldest,
    MostCommented,
    LeastCommented,
    RecentlyUpdated,
    LeastRecentlyUpdated,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFilters {
    pub dataset_id: Option<String>,
    pub organization_id: Option<String>,
    #[serde(default)]
    pub include_sub_organizations: bool,
    pub status: Option<IssueStatus>,
    pub visibility: Option<Visibility>,
    pub abuse_status: Option<AbuseStatus>,
    /// Case-insensitive substring match over title and description.
    pub q: Option<String>,
    #[serde(default)]
    pub sort: IssueSort,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentFilters {
    pub organization_id: Option<String>,
    #[serde(default)]
    pub include_sub_organizations: bool,
    #[serde(default)]
    pub only_hidden: bool,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage<T> {
    /// Exact match count for the filter set, ignoring offset/limit.
    pub count: u64,
    pub results: Vec<T>,
}

#[derive(Debug, FromQueryResult)]
struct IssueRow {
    id: i32,
    number: i32,
    title: String,
    description: Option<String>,
    dataset_id: String,
    resource_id: Option<String>,
    user_id: String,
    assignee_id: Option<String>,
    status: IssueStatus,
    resolved: Option<NaiveDateTime>,
    visibility: Visibility,
    abuse_status: AbuseStatus,
    created: NaiveDateTime,
    comment_count: i64,
    updated: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueSummary {
    pub id: i32,
    pub number: i32,
    pub title: String,
    pub description: Option<String>,
    pub dataset_id: String,
    pub resource_id: Option<String>,
    pub user_id: String,
    /// Creator's public display name, when the host still knows them.
    pub user: Option<String>,
    pub assignee_id: Option<String>,
    pub status: IssueStatus,
    pub resolved: Option<NaiveDateTime>,
    pub visibility: Visibility,
    pub abuse_status: AbuseStatus,
    pub created: NaiveDateTime,
    pub comment_count: i64,
    /// Most recent comment timestamp; None for uncommented issues.
    pub updated: Option<NaiveDateTime>,
}

#[derive(Debug, FromQueryResult)]
struct CommentRow {
    id: i32,
    issue_id: i32,
    comment: String,
    user_id: String,
    created: NaiveDateTime,
    visibility: Visibility,
    abuse_status: AbuseStatus,
    dataset_id: String,
    issue_number: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentSummary {
    pub id: i32,
    pub issue_id: i32,
    pub comment: String,
    pub user_id: String,
    pub user: Option<String>,
    pub created: NaiveDateTime,
    pub visibility: Visibility,
    pub abuse_status: AbuseStatus,
    pub dataset_id: String,
    pub issue_number: i32,
}

pub struct SearchService {
    db: DatabaseConnection,
    directory: Arc<dyn HostDirectory>,
}

impl SearchService {
    pub fn new(db: DatabaseConnection, directory: Arc<dyn HostDirectory>) -> Self {
        Self { db, directory }
    }

    pub async fn issue_search(&self, filters: &IssueFilters) -> AppResult<SearchPage<IssueSummary>> {
        let scope = self
            .dataset_scope(
                filters.organization_id.as_deref(),
                filters.include_sub_organizations,
            )
            .await?;
        if let Some(ids) = &scope {
            if ids.is_empty() {
                return Ok(SearchPage {
                    count: 0,
                    results: Vec::new(),
                });
            }
        }
        let condition = issue_condition(filters, scope.as_deref());

        let count = issue::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;

        let query = apply_issue_sort(
            issue::Entity::find()
                .select_only()
                .columns([
                    issue::Column::Id,
                    issue::Column::Number,
                    issue::Column::Title,
                    issue::Column::Description,
                    issue::Column::DatasetId,
                    issue::Column::ResourceId,
                    issue::Column::UserId,
                    issue::Column::AssigneeId,
                    issue::Column::Status,
                    issue::Column::Resolved,
                    issue::Column::Visibility,
                    issue::Column::AbuseStatus,
                    issue::Column::Created,
                ])
                .column_as(issue_comment::Column::Id.count(), "comment_count")
                .column_as(issue_comment::Column::Created.max(), "updated")
                .join(JoinType::LeftJoin, issue::Relation::Comments.def())
                .filter(condition)
                .group_by(issue::Column::Id),
            filters.sort,
        )
        .offset(filters.offset.unwrap_or(0))
        .limit(clamp_limit(filters.limit));

        let rows = query.into_model::<IssueRow>().all(&self.db).await?;
        let names = self
            .display_names(rows.iter().map(|r| r.user_id.as_str()))
            .await?;
        let results = rows
            .into_iter()
            .map(|row| {
                let user = names.get(&row.user_id).cloned();
                IssueSummary {
                    id: row.id,
                    number: row.number,
                    title: row.title,
                    description: row.description,
                    dataset_id: row.dataset_id,
                    resource_id: row.resource_id,
                    user_id: row.user_id,
                    user,
                    assignee_id: row.assignee_id,
                    status: row.status,
                    resolved: row.resolved,
                    visibility: row.visibility,
                    abuse_status: row.abuse_status,
                    created: row.created,
                    comment_count: row.comment_count,
                    updated: row.updated,
                }
            })
            .collect();

        Ok(SearchPage { count, results })
    }

    pub async fn comment_search(
        &self,
        filters: &CommentFilters,
    ) -> AppResult<SearchPage<CommentSummary>> {
        let scope = self
            .dataset_scope(
                filters.organization_id.as_deref(),
                filters.include_sub_organizations,
            )
            .await?;
        if let Some(ids) = &scope {
            if ids.is_empty() {
                return Ok(SearchPage {
                    count: 0,
                    results: Vec::new(),
                });
            }
        }

        let mut condition = Condition::all();
        if filters.only_hidden {
            condition = condition.add(issue_comment::Column::Visibility.eq(Visibility::Hidden));
        }
        if let Some(ids) = scope {
            condition = condition.add(issue::Column::DatasetId.is_in(ids));
        }

        let count = issue_comment::Entity::find()
            .join(JoinType::InnerJoin, issue_comment::Relation::Issue.def())
            .filter(condition.clone())
            .count(&self.db)
            .await?;

        let rows = issue_comment::Entity::find()
            .select_only()
            .columns([
                issue_comment::Column::Id,
                issue_comment::Column::IssueId,
                issue_comment::Column::Comment,
                issue_comment::Column::UserId,
                issue_comment::Column::Created,
                issue_comment::Column::Visibility,
                issue_comment::Column::AbuseStatus,
            ])
            .column_as(issue::Column::DatasetId, "dataset_id")
            .column_as(issue::Column::Number, "issue_number")
            .join(JoinType::InnerJoin, issue_comment::Relation::Issue.def())
            .filter(condition)
            .order_by_desc(issue_comment::Column::Created)
            .order_by_desc(issue_comment::Column::Id)
            .offset(filters.offset.unwrap_or(0))
            .limit(clamp_limit(filters.limit))
            .into_model::<CommentRow>()
            .all(&self.db)
            .await?;

        let names = self
            .display_names(rows.iter().map(|r| r.user_id.as_str()))
            .await?;
        let results = rows
            .into_iter()
            .map(|row| {
                let user = names.get(&row.user_id).cloned();
                CommentSummary {
                    id: row.id,
                    issue_id: row.issue_id,
                    comment: row.comment,
                    user_id: row.user_id,
                    user,
                    created: row.created,
                    visibility: row.visibility,
                    abuse_status: row.abuse_status,
                    dataset_id: row.dataset_id,
                    issue_number: row.issue_number,
                }
            })
            .collect();

        Ok(SearchPage { count, results })
    }

    /// None when unscoped; Some(dataset ids) when an organization filter is
    /// present. An org without datasets yields Some(empty).
    async fn dataset_scope(
        &self,
        organization_id: Option<&str>,
        include_subs: bool,
    ) -> AppResult<Option<Vec<String>>> {
        let Some(org_id) = organization_id else {
            return Ok(None);
        };
        let mut orgs = vec![org_id.to_string()];
        if include_subs {
            orgs.extend(self.directory.organization_descendants(org_id).await?);
        }
        Ok(Some(self.directory.organization_datasets(&orgs).await?))
    }

    async fn display_names<'a>(
        &self,
        ids: impl Iterator<Item = &'a str>,
    ) -> AppResult<HashMap<String, String>> {
        let distinct: HashSet<&str> = ids.collect();
        let mut names = HashMap::new();
        for id in distinct {
            if let Some(display) = self.directory.user_display(id).await? {
                names.insert(id.to_string(), display.name);
            }
        }
        Ok(names)
    }
}

fn issue_condition(filters: &IssueFilters, scope: Option<&[String]>) -> Condition {
    let mut condition = Condition::all();
    if let Some(dataset_id) = &filters.dataset_id {
        condition = condition.add(issue::Column::DatasetId.eq(dataset_id));
    }
    if let Some(ids) = scope {
        condition = condition.add(issue::Column::DatasetId.is_in(ids.iter().cloned()));
    }
    if let Some(status) = filters.status {
        condition = condition.add(issue::Column::Status.eq(status));
    }
    if let Some(visibility) = filters.visibility {
        condition = condition.add(issue::Column::Visibility.eq(visibility));
    }
    if let Some(abuse_status) = filters.abuse_status {
        condition = condition.add(issue::Column::AbuseStatus.eq(abuse_status));
    }
    if let Some(q) = filters.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q.to_lowercase());
        condition = condition.add(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col((
                        issue::Entity,
                        issue::Column::Title,
                    ))))
                    .like(pattern.clone()),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col((
                        issue::Entity,
                        issue::Column::Description,
                    ))))
                    .like(pattern),
                ),
        );
    }
    condition
}

fn apply_issue_sort(query: Select<issue::Entity>, sort: IssueSort) -> Select<issue::Entity> {
    let comment_count = issue_comment::Column::Id.count();
    match sort {
        IssueSort::Newest => query
            .order_by_desc(issue::Column::Created)
            .order_by_desc(issue::Column::Number),
        IssueSort::Oldest => query
            .order_by_asc(issue::Column::Created)
            .order_by_asc(issue::Column::Number),
        IssueSort::MostCommented => query
            .order_by(comment_count, Order::Desc)
            .order_by_asc(issue::Column::Created)
            .order_by_asc(issue::Column::Number),
        IssueSort::LeastCommented => query
            .order_by(comment_count, Order::Asc)
            .order_by_asc(issue::Column::Created)
            .order_by_asc(issue::Column::Number),
        IssueSort::RecentlyUpdated => query
            .order_by(last_activity(), Order::Desc)
            .order_by_desc(issue::Column::Created)
            .order_by_desc(issue::Column::Number),
        IssueSort::LeastRecentlyUpdated => query
            .order_by(last_activity(), Order::Asc)
            .order_by_asc(issue::Column::Created)
            .order_by_asc(issue::Column::Number),
    }
}

/// Last-activity timestamp: issues without comments fall back to their own
/// creation time, which keeps the ordering deterministic on every backend.
fn last_activity() -> SimpleExpr {
    Func::coalesce([
        issue_comment::Column::Created.max(),
        Expr::col((issue::Entity, issue::Column::Created)).into(),
    ])
    .into()
}

fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_limit(Some(5)), 5);
        assert_eq!(clamp_limit(Some(10_000)), MAX_PAGE_SIZE);
    }

    #[test]
    fn default_sort_is_newest() {
        assert_eq!(IssueSort::default(), IssueSort::Newest);
    }
}
