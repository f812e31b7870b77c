use chrono::{DateTime, Utc};
use sqlx::{Acquire, PgPool, Postgres, Transaction};

use super::types::AssignmentView;
use crate::errors::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignmentRow {
    pub id: i64,
    pub opinion_request_id: i64,
    pub department_id: i64,
    pub expert_id: Option<i64>,
    pub is_primary: bool,
    pub status: String,
}

pub struct NewAssignment {
    pub opinion_request_id: i64,
    pub department_id: i64,
    pub expert_id: Option<i64>,
    pub assigned_by: i64,
    pub is_primary: bool,
    pub due_date: Option<DateTime<Utc>>,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewAssignment,
) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO request_assignments
             (opinion_request_id, department_id, expert_id, assigned_by, is_primary, due_date)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(new.opinion_request_id)
    .bind(new.department_id)
    .bind(new.expert_id)
    .bind(new.assigned_by)
    .bind(new.is_primary)
    .bind(new.due_date)
    .fetch_one(tx.acquire().await?)
    .await?;

    Ok(id)
}

/// Clear the primary flag on the current primary assignment, if any.
/// Runs before inserting a new primary so the partial unique index on
/// (opinion_request_id) WHERE is_primary never sees two rows.
pub async fn demote_primary(
    tx: &mut Transaction<'_, Postgres>,
    opinion_request_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE request_assignments
         SET is_primary = FALSE, updated_at = NOW()
         WHERE opinion_request_id = $1 AND is_primary",
    )
    .bind(opinion_request_id)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

pub async fn update_expert(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    expert_id: i64,
    due_date: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE request_assignments
         SET expert_id = $2, due_date = COALESCE($3, due_date), updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(expert_id)
    .bind(due_date)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    status: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE request_assignments SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(tx.acquire().await?)
        .await?;

    Ok(())
}

pub async fn find_row(pool: &PgPool, id: i64) -> Result<Option<AssignmentRow>, AppError> {
    let row = sqlx::query_as::<_, AssignmentRow>(
        "SELECT id, opinion_request_id, department_id, expert_id, is_primary, status
         FROM request_assignments
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Re-read an assignment inside a transaction that already holds the
/// request row lock.
pub async fn find_row_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<AssignmentRow>, AppError> {
    let row = sqlx::query_as::<_, AssignmentRow>(
        "SELECT id, opinion_request_id, department_id, expert_id, is_primary, status
         FROM request_assignments
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}

/// Active assignment tying this expert (in this department) to the request.
/// Opinion creation hangs off this row.
pub async fn find_for_expert(
    tx: &mut Transaction<'_, Postgres>,
    opinion_request_id: i64,
    department_id: i64,
    expert_id: i64,
) -> Result<Option<AssignmentRow>, AppError> {
    let row = sqlx::query_as::<_, AssignmentRow>(
        "SELECT id, opinion_request_id, department_id, expert_id, is_primary, status
         FROM request_assignments
         WHERE opinion_request_id = $1 AND department_id = $2 AND expert_id = $3
         ORDER BY created_at DESC
         LIMIT 1",
    )
    .bind(opinion_request_id)
    .bind(department_id)
    .bind(expert_id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}

/// Whether the caller is the expert on any assignment of the request.
pub async fn expert_holds_assignment(
    tx: &mut Transaction<'_, Postgres>,
    opinion_request_id: i64,
    expert_id: i64,
) -> Result<bool, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM request_assignments
         WHERE opinion_request_id = $1 AND expert_id = $2
         LIMIT 1",
    )
    .bind(opinion_request_id)
    .bind(expert_id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row.is_some())
}

pub async fn find_for_request(
    pool: &PgPool,
    opinion_request_id: i64,
) -> Result<Vec<AssignmentView>, AppError> {
    let rows = sqlx::query_as::<_, AssignmentView>(
        "SELECT a.id, a.opinion_request_id,
                a.department_id, d.name AS department_name,
                a.expert_id, e.username AS expert_name,
                a.assigned_by, ab.username AS assigned_by_name,
                a.is_primary, a.status, a.due_date, a.created_at, a.updated_at
         FROM request_assignments a
         JOIN departments d ON d.id = a.department_id
         LEFT JOIN users e ON e.id = a.expert_id
         JOIN users ab ON ab.id = a.assigned_by
         WHERE a.opinion_request_id = $1
         ORDER BY a.is_primary DESC, a.created_at ASC",
    )
    .bind(opinion_request_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
