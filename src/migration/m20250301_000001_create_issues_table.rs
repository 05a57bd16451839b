use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Issues {
    Table,
    Id,
    Number,
    Title,
    Description,
    DatasetId,
    ResourceId,
    UserId,
    AssigneeId,
    Status,
    Resolved,
    Visibility,
    AbuseStatus,
    Created,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Issues::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Issues::Number).integer().not_null())
                    .col(ColumnDef::new(Issues::Title).text().not_null())
                    .col(ColumnDef::new(Issues::Description).text().null())
                    .col(ColumnDef::new(Issues::DatasetId).string().not_null())
                    .col(ColumnDef::new(Issues::ResourceId).string().null())
                    .col(ColumnDef::new(Issues::UserId).string().not_null())
                    .col(ColumnDef::new(Issues::AssigneeId).string().null())
                    .col(
                        ColumnDef::new(Issues::Status)
                            .string_len(15)
                            .not_null()
                            .default("open"),
                    )
                    .col(ColumnDef::new(Issues::Resolved).timestamp().null())
                    .col(
                        ColumnDef::new(Issues::Visibility)
                            .string_len(15)
                            .not_null()
                            .default("visible"),
                    )
                    .col(
                        ColumnDef::new(Issues::AbuseStatus)
                            .string_len(15)
                            .not_null()
                            .default("unmoderated"),
                    )
                    .col(ColumnDef::new(Issues::Created).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Per-dataset sequential numbering relies on this being unique.
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_dataset_id_number")
                    .table(Issues::Table)
                    .col(Issues::DatasetId)
                    .col(Issues::Number)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_created")
                    .table(Issues::Table)
                    .col(Issues::Created)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await
    }
}
