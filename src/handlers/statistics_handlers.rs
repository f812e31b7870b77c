use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::statistics;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub department_id: Option<i64>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// GET /api/v1/statistics - Request counts and average completion time,
/// optionally scoped to a department and a creation window
pub async fn department(
    pool: web::Data<PgPool>,
    _caller: Caller,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, AppError> {
    if let (Some(from), Some(to)) = (query.from_date, query.to_date) {
        if from > to {
            return Err(AppError::Validation("from_date must not be after to_date".into()));
        }
    }

    let stats = statistics::department_stats(
        pool.get_ref(),
        query.department_id,
        query.from_date,
        query.to_date,
    )
    .await?;

    Ok(HttpResponse::Ok().json(stats))
}
