use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, PgPool, Postgres, Transaction};

use crate::errors::AppError;

#[derive(Debug, Deserialize)]
pub struct SendCommunicationBody {
    pub to_department_id: i64,
    pub subject: String,
    pub body: Option<String>,
    pub comm_type: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub requires_response: bool,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RespondCommunicationBody {
    pub body: String,
}

/// Cross-department correspondence attached to a request. Created either as
/// a side effect of assigning across department boundaries or explicitly by
/// a caller; replies thread through `parent_communication_id`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Communication {
    pub id: i64,
    pub opinion_request_id: i64,
    pub from_department_id: i64,
    pub from_department_name: String,
    pub to_department_id: i64,
    pub to_department_name: String,
    pub sender_id: i64,
    pub sender_name: String,
    pub comm_type: String,
    pub subject: String,
    pub body: Option<String>,
    pub priority: String,
    pub status: String,
    pub requires_response: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub parent_communication_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Bare row used inside engine transactions.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommunicationRow {
    pub id: i64,
    pub opinion_request_id: i64,
    pub from_department_id: i64,
    pub to_department_id: i64,
    pub subject: String,
    pub status: String,
    pub requires_response: bool,
}

pub struct NewCommunication<'a> {
    pub request_id: i64,
    pub from_department_id: i64,
    pub to_department_id: i64,
    pub sender_id: i64,
    pub comm_type: &'a str,
    pub subject: &'a str,
    pub body: Option<&'a str>,
    pub priority: &'a str,
    pub status: &'a str,
    pub requires_response: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub parent_communication_id: Option<i64>,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewCommunication<'_>,
) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO interdepartmental_communications
             (opinion_request_id, from_department_id, to_department_id, sender_id,
              comm_type, subject, body, priority, status, requires_response, due_date,
              parent_communication_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING id",
    )
    .bind(new.request_id)
    .bind(new.from_department_id)
    .bind(new.to_department_id)
    .bind(new.sender_id)
    .bind(new.comm_type)
    .bind(new.subject)
    .bind(new.body)
    .bind(new.priority)
    .bind(new.status)
    .bind(new.requires_response)
    .bind(new.due_date)
    .bind(new.parent_communication_id)
    .fetch_one(tx.acquire().await?)
    .await?;

    Ok(row.0)
}

pub async fn find_row(pool: &PgPool, id: i64) -> Result<Option<CommunicationRow>, AppError> {
    let row = sqlx::query_as::<_, CommunicationRow>(
        "SELECT id, opinion_request_id, from_department_id, to_department_id,
                subject, status, requires_response
         FROM interdepartmental_communications WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn find_row_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<CommunicationRow>, AppError> {
    let row = sqlx::query_as::<_, CommunicationRow>(
        "SELECT id, opinion_request_id, from_department_id, to_department_id,
                subject, status, requires_response
         FROM interdepartmental_communications WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}

pub async fn mark_responded(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE interdepartmental_communications
         SET status = 'responded', updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

/// How many communications on the request are still awaiting a response.
pub async fn pending_response_count(
    tx: &mut Transaction<'_, Postgres>,
    request_id: i64,
) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM interdepartmental_communications
         WHERE opinion_request_id = $1 AND status = 'pending' AND requires_response",
    )
    .bind(request_id)
    .fetch_one(tx.acquire().await?)
    .await?;

    Ok(row.0)
}

pub async fn find_for_request(
    pool: &PgPool,
    request_id: i64,
) -> Result<Vec<Communication>, AppError> {
    let rows = sqlx::query_as::<_, Communication>(
        "SELECT c.id, c.opinion_request_id,
                c.from_department_id, df.name AS from_department_name,
                c.to_department_id, dt.name AS to_department_name,
                c.sender_id, u.username AS sender_name,
                c.comm_type, c.subject, c.body, c.priority, c.status,
                c.requires_response, c.due_date, c.parent_communication_id,
                c.created_at
         FROM interdepartmental_communications c
         JOIN departments df ON df.id = c.from_department_id
         JOIN departments dt ON dt.id = c.to_department_id
         JOIN users u ON u.id = c.sender_id
         WHERE c.opinion_request_id = $1
         ORDER BY c.created_at ASC, c.id ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
