use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum IssueReports {
    Table,
    Id,
    UserId,
    ParentId,
    Created,
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
                    .table(IssueReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IssueReports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IssueReports::UserId).string().not_null())
                    .col(ColumnDef::new(IssueReports::ParentId).integer().not_null())
                    .col(ColumnDef::new(IssueReports::Created).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issue_reports_parent_id")
                            .from(IssueReports::Table, IssueReports::ParentId)
                            .to(Issues::Table, Issues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One report per reporter per issue.
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_reports_user_id_parent_id")
                    .table(IssueReports::Table)
                    .col(IssueReports::UserId)
                    .col(IssueReports::ParentId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issue_reports_parent_id")
                    .table(IssueReports::Table)
                    .col(IssueReports::ParentId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IssueReports::Table).to_owned())
            .await
    }
}
