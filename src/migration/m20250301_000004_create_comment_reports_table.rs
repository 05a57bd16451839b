use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum CommentReports {
    Table,
    Id,
    UserId,
    ParentId,
    Created,
}

#[derive(DeriveIden)]
enum IssueComments {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommentReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentReports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CommentReports::UserId).string().not_null())
                    .col(
                        ColumnDef::new(CommentReports::ParentId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommentReports::Created)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_reports_parent_id")
                            .from(CommentReports::Table, CommentReports::ParentId)
                            .to(IssueComments::Table, IssueComments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One report per reporter per comment.
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_reports_user_id_parent_id")
                    .table(CommentReports::Table)
                    .col(CommentReports::UserId)
                    .col(CommentReports::ParentId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_reports_parent_id")
                    .table(CommentReports::Table)
                    .col(CommentReports::ParentId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentReports::Table).to_owned())
            .await
    }
}
