use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AbuseStatus, IssueStatus, Visibility};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Sequential within a dataset, starting at 1.
    pub number: i32,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub dataset_id: String,
    pub resource_id: Option<String>,
    pub user_id: String,
    pub assignee_id: Option<String>,
    pub status: IssueStatus,
    /// Set iff status is closed.
    pub resolved: Option<DateTime>,
    pub visibility: Visibility,
    pub abuse_status: AbuseStatus,
    pub created: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::issue_comment::Entity")]
    Comments,
    #[sea_orm(has_many = "super::issue_report::Entity")]
    Reports,
}

impl Related<super::issue_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::issue_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
