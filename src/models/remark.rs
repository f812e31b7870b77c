use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Acquire, PgPool, Postgres, Transaction};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Remark {
    pub id: i64,
    pub opinion_request_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    request_id: i64,
    author_id: i64,
    body: &str,
) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO request_remarks (opinion_request_id, author_id, body)
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(request_id)
    .bind(author_id)
    .bind(body)
    .fetch_one(tx.acquire().await?)
    .await?;

    Ok(row.0)
}

pub async fn find_for_request(pool: &PgPool, request_id: i64) -> Result<Vec<Remark>, AppError> {
    let rows = sqlx::query_as::<_, Remark>(
        "SELECT r.id, r.opinion_request_id, r.author_id, u.username AS author_name,
                r.body, r.created_at
         FROM request_remarks r
         JOIN users u ON u.id = r.author_id
         WHERE r.opinion_request_id = $1
         ORDER BY r.created_at ASC, r.id ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
