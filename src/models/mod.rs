pub mod comment_report;
pub mod issue;
pub mod issue_comment;
pub mod issue_report;

pub use comment_report::{Entity as CommentReport, Model as CommentReportModel};
pub use issue::{Entity as Issue, Model as IssueModel};
pub use issue_comment::{Entity as IssueComment, Model as IssueCommentModel};
pub use issue_report::{Entity as IssueReport, Model as IssueReportModel};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(15))")]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Whether an entity shows up in default listings or is suppressed by
/// moderation. Only the moderation service writes this.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(15))")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[sea_orm(string_value = "visible")]
    Visible,
    #[sea_orm(string_value = "hidden")]
    Hidden,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(15))")]
#[serde(rename_all = "snake_case")]
pub enum AbuseStatus {
    #[sea_orm(string_value = "unmoderated")]
    Unmoderated,
    #[sea_orm(string_value = "abuse")]
    Abuse,
    #[sea_orm(string_value = "not_abuse")]
    NotAbuse,
}
