use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One abuse report by one user against one comment.
/// At most one row per (user_id, parent_id).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub parent_id: i32,
    pub created: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::issue_comment::Entity",
        from = "Column::ParentId",
        to = "super::issue_comment::Column::Id"
    )]
    Comment,
}

impl Related<super::issue_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
