use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Acquire, PgPool, Postgres, Transaction};

use crate::errors::AppError;

/// One immutable audit entry. `from_status` is None only for the `created`
/// row; `to_status` always names the status the request held after the action.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub opinion_request_id: i64,
    pub action_type: String,
    pub action_by: i64,
    pub action_by_name: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub action_details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Append one audit row inside the caller's transaction. If this insert
/// fails the whole operation rolls back with it; an action that cannot be
/// audited is treated as not having happened.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    request_id: i64,
    action_type: &str,
    action_by: i64,
    from_status_id: Option<i64>,
    to_status_id: i64,
    details: serde_json::Value,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO workflow_history
             (opinion_request_id, action_type, action_by, from_status_id, to_status_id, action_details)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(request_id)
    .bind(action_type)
    .bind(action_by)
    .bind(from_status_id)
    .bind(to_status_id)
    .bind(details)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

/// Full trail for one request, oldest first.
pub async fn find_for_request(
    pool: &PgPool,
    request_id: i64,
) -> Result<Vec<HistoryEntry>, AppError> {
    let rows = sqlx::query_as::<_, HistoryEntry>(
        "SELECT h.id, h.opinion_request_id, h.action_type, h.action_by,
                u.username AS action_by_name,
                sf.name AS from_status, st.name AS to_status,
                h.action_details, h.created_at
         FROM workflow_history h
         JOIN users u ON u.id = h.action_by
         LEFT JOIN workflow_status sf ON sf.id = h.from_status_id
         JOIN workflow_status st ON st.id = h.to_status_id
         WHERE h.opinion_request_id = $1
         ORDER BY h.created_at ASC, h.id ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The pre-branch status recorded when the request last entered a side
/// branch via the given action type (e.g. `info_requested`).
pub async fn latest_branch_origin(
    tx: &mut Transaction<'_, Postgres>,
    request_id: i64,
    action_type: &str,
) -> Result<Option<i64>, AppError> {
    let row: Option<(Option<i64>,)> = sqlx::query_as(
        "SELECT from_status_id FROM workflow_history
         WHERE opinion_request_id = $1 AND action_type = $2
         ORDER BY id DESC LIMIT 1",
    )
    .bind(request_id)
    .bind(action_type)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row.and_then(|r| r.0))
}

/// The status the request held before it was parked on another department.
/// Communications sent while already parked record the parked status as
/// their origin, so the entry point is the latest `communication_sent`
/// recorded from anywhere else.
pub async fn pending_branch_origin(
    tx: &mut Transaction<'_, Postgres>,
    request_id: i64,
    parked_status_id: i64,
) -> Result<Option<i64>, AppError> {
    let row: Option<(Option<i64>,)> = sqlx::query_as(
        "SELECT from_status_id FROM workflow_history
         WHERE opinion_request_id = $1
           AND action_type = 'communication_sent'
           AND from_status_id IS DISTINCT FROM $2
         ORDER BY id DESC LIMIT 1",
    )
    .bind(request_id)
    .bind(parked_status_id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row.and_then(|r| r.0))
}
