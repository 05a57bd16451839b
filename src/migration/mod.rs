use sea_orm_migration::prelude::*;

mod m20250301_000001_create_issues_table;
mod m20250301_000002_create_issue_comments_table;
mod m20250301_000003_create_issue_reports_table;
mod m20250301_000004_create_comment_reports_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_issues_table::Migration),
            Box::new(m20250301_000002_create_issue_comments_table::Migration),
            Box::new(m20250301_000003_create_issue_reports_table::Migration),
            Box::new(m20250301_000004_create_comment_reports_table::Migration),
        ]
    }
}
