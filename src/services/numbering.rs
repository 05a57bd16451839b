//! Dataset-scoped issue numbering.
//!
//! Numbers are allocated with a max+1 read inside the same transaction as
//! the issue insert. Two transactions racing for the same dataset will pick
//! the same number and one insert will trip the unique (dataset_id, number)
//! index; the caller classifies that with [`is_unique_violation`] and
//! retries with a fresh read.

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, SqlErr};

use crate::models::issue;

pub(crate) const MAX_ALLOCATION_ATTEMPTS: u32 = 5;

pub(crate) async fn next_issue_number<C: ConnectionTrait>(
    conn: &C,
    dataset_id: &str,
) -> Result<i32, DbErr> {
    let current_max: Option<Option<i32>> = issue::Entity::find()
        .select_only()
        .column_as(issue::Column::Number.max(), "max_number")
        .filter(issue::Column::DatasetId.eq(dataset_id))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(next_from(current_max.flatten()))
}

pub(crate) fn next_from(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(0) + 1
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
