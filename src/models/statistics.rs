use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;

/// Aggregated workload counters. `average_completion_seconds` is the mean
/// wall-clock time from creation to last update over completed requests,
/// 0.0 when nothing has completed yet.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentStats {
    pub department_id: Option<i64>,
    pub total_requests: i64,
    pub completed_requests: i64,
    pub pending_requests: i64,
    pub rejected_requests: i64,
    pub average_completion_seconds: f64,
}

pub async fn department_stats(
    pool: &PgPool,
    department_id: Option<i64>,
    from_date: Option<DateTime<Utc>>,
    to_date: Option<DateTime<Utc>>,
) -> Result<DepartmentStats, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        total_requests: i64,
        completed_requests: i64,
        pending_requests: i64,
        rejected_requests: i64,
        average_completion_seconds: f64,
    }

    let row = sqlx::query_as::<_, Row>(
        "SELECT COUNT(*) AS total_requests,
                COUNT(*) FILTER (WHERE s.name IN ('head_approved', 'completed'))
                    AS completed_requests,
                COUNT(*) FILTER (WHERE s.name NOT IN ('head_approved', 'completed', 'rejected'))
                    AS pending_requests,
                COUNT(*) FILTER (WHERE s.name = 'rejected') AS rejected_requests,
                COALESCE(AVG(EXTRACT(EPOCH FROM (r.updated_at - r.created_at)))
                    FILTER (WHERE s.name IN ('head_approved', 'completed')), 0)::double precision
                    AS average_completion_seconds
         FROM opinion_requests r
         JOIN workflow_status s ON s.id = r.current_status_id
         WHERE r.is_deleted = FALSE
           AND ($1::bigint IS NULL OR r.department_id = $1)
           AND ($2::timestamptz IS NULL OR r.created_at >= $2)
           AND ($3::timestamptz IS NULL OR r.created_at <= $3)",
    )
    .bind(department_id)
    .bind(from_date)
    .bind(to_date)
    .fetch_one(pool)
    .await?;

    Ok(DepartmentStats {
        department_id,
        total_requests: row.total_requests,
        completed_requests: row.completed_requests,
        pending_requests: row.pending_requests,
        rejected_requests: row.rejected_requests,
        average_completion_seconds: row.average_completion_seconds,
    })
}
