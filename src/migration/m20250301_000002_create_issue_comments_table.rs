use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum IssueComments {
    Table,
    Id,
    IssueId,
    Comment,
    UserId,
    Created,
    Visibility,
    AbuseStatus,
}

#[derive(DeriveIden)]
enum Issues {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IssueComments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IssueComments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IssueComments::IssueId).integer().not_null())
                    .col(ColumnDef::new(IssueComments::Comment).text().not_null())
                    .col(ColumnDef::new(IssueComments::UserId).string().not_null())
                    .col(ColumnDef::new(IssueComments::Created).timestamp().not_null())
                    .col(
                        ColumnDef::new(IssueComments::Visibility)
                            .string_len(15)
                            .not_null()
                            .default("visible"),
                    )
                    .col(
                        ColumnDef::new(IssueComments::AbuseStatus)
                            .string_len(15)
                            .not_null()
                            .default("unmoderated"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issue_comments_issue_id")
                            .from(IssueComments::Table, IssueComments::IssueId)
                            .to(Issues::Table, Issues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issue_comments_issue_id")
                    .table(IssueComments::Table)
                    .col(IssueComments::IssueId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issue_comments_user_id")
                    .table(IssueComments::Table)
                    .col(IssueComments::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IssueComments::Table).to_owned())
            .await
    }
}
