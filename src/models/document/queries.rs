use sqlx::{Acquire, PgPool, Postgres, Transaction};

use super::types::DocumentView;
use crate::errors::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: i64,
    pub opinion_request_id: i64,
    pub file_name: String,
    pub stored_name: String,
    pub file_path: String,
    pub uploaded_by: i64,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    opinion_request_id: i64,
    file_name: &str,
    stored_name: &str,
    file_path: &str,
    file_type: &str,
    file_size: i64,
    uploaded_by: i64,
) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO documents
             (opinion_request_id, file_name, stored_name, file_path, file_type,
              file_size, uploaded_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id",
    )
    .bind(opinion_request_id)
    .bind(file_name)
    .bind(stored_name)
    .bind(file_path)
    .bind(file_type)
    .bind(file_size)
    .bind(uploaded_by)
    .fetch_one(tx.acquire().await?)
    .await?;

    Ok(id)
}

pub async fn find_row(pool: &PgPool, id: i64) -> Result<Option<DocumentRow>, AppError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, opinion_request_id, file_name, stored_name, file_path, uploaded_by
         FROM documents
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Re-read a document inside a transaction that already holds the request
/// row lock.
pub async fn find_row_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<DocumentRow>, AppError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, opinion_request_id, file_name, stored_name, file_path, uploaded_by
         FROM documents
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}

pub async fn delete_row(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(tx.acquire().await?)
        .await?;

    Ok(())
}

pub async fn find_for_request(
    pool: &PgPool,
    opinion_request_id: i64,
) -> Result<Vec<DocumentView>, AppError> {
    let rows = sqlx::query_as::<_, DocumentView>(
        "SELECT doc.id, doc.opinion_request_id, doc.file_name, doc.file_size,
                doc.uploaded_by, u.username AS uploaded_by_name, doc.created_at
         FROM documents doc
         JOIN users u ON u.id = doc.uploaded_by
         WHERE doc.opinion_request_id = $1
         ORDER BY doc.created_at ASC",
    )
    .bind(opinion_request_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
