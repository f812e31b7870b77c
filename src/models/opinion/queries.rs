use sqlx::{Acquire, PgPool, Postgres, Transaction};

use super::types::OpinionView;
use crate::errors::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OpinionRow {
    pub id: i64,
    pub opinion_request_id: i64,
    pub department_id: i64,
    pub expert_id: i64,
    pub status: String,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    opinion_request_id: i64,
    department_id: i64,
    expert_id: i64,
    content: &str,
    recommendation: Option<&str>,
) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO opinions (opinion_request_id, department_id, expert_id, content, recommendation)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(opinion_request_id)
    .bind(department_id)
    .bind(expert_id)
    .bind(content)
    .bind(recommendation)
    .fetch_one(tx.acquire().await?)
    .await?;

    Ok(id)
}

pub async fn find_row(pool: &PgPool, id: i64) -> Result<Option<OpinionRow>, AppError> {
    let row = sqlx::query_as::<_, OpinionRow>(
        "SELECT id, opinion_request_id, department_id, expert_id, status
         FROM opinions
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Re-read an opinion inside a transaction that already holds the request
/// row lock.
pub async fn find_row_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<OpinionRow>, AppError> {
    let row = sqlx::query_as::<_, OpinionRow>(
        "SELECT id, opinion_request_id, department_id, expert_id, status
         FROM opinions
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}

/// Existing draft or submitted opinion by this expert on the request.
/// Used to stop an expert from opening a second opinion on the same
/// request while one is still in flight.
pub async fn open_opinion_for(
    tx: &mut Transaction<'_, Postgres>,
    opinion_request_id: i64,
    expert_id: i64,
) -> Result<Option<OpinionRow>, AppError> {
    let row = sqlx::query_as::<_, OpinionRow>(
        "SELECT id, opinion_request_id, department_id, expert_id, status
         FROM opinions
         WHERE opinion_request_id = $1 AND expert_id = $2
           AND status IN ('draft', 'submitted')
         LIMIT 1",
    )
    .bind(opinion_request_id)
    .bind(expert_id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}

pub async fn update_content(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    content: Option<&str>,
    recommendation: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE opinions
         SET content = COALESCE($2, content),
             recommendation = COALESCE($3, recommendation),
             updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(content)
    .bind(recommendation)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

pub async fn set_submitted(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE opinions SET status = 'submitted', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(tx.acquire().await?)
        .await?;

    Ok(())
}

pub async fn set_reviewed(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    outcome: &str,
    reviewed_by: i64,
    comments: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE opinions
         SET status = $2, reviewed_by = $3, review_comments = $4,
             reviewed_at = NOW(), updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(outcome)
    .bind(reviewed_by)
    .bind(comments)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

pub async fn find_for_request(
    pool: &PgPool,
    opinion_request_id: i64,
) -> Result<Vec<OpinionView>, AppError> {
    let rows = sqlx::query_as::<_, OpinionView>(
        "SELECT o.id, o.opinion_request_id,
                o.department_id, d.name AS department_name,
                o.expert_id, e.username AS expert_name,
                o.content, o.recommendation, o.status,
                o.review_comments, o.reviewed_by, rv.username AS reviewed_by_name,
                o.reviewed_at, o.created_at, o.updated_at
         FROM opinions o
         JOIN departments d ON d.id = o.department_id
         JOIN users e ON e.id = o.expert_id
         LEFT JOIN users rv ON rv.id = o.reviewed_by
         WHERE o.opinion_request_id = $1
         ORDER BY o.created_at ASC",
    )
    .bind(opinion_request_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
