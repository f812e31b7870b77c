use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::handlers::api;
use crate::models::assignment::{self, AssignRequestBody, ReassignBody};
use crate::workflow;

/// POST /api/v1/requests/{id}/assign - Assign to a department or expert
pub async fn assign(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<AssignRequestBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    workflow::assignments::assign(pool.get_ref(), &caller, id, &body).await?;
    let detail = api::load_detail(pool.get_ref(), id).await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/v1/assignments/{id}/reassign - Hand the assignment to another expert
pub async fn reassign(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<ReassignBody>,
) -> Result<HttpResponse, AppError> {
    let assignment_id = path.into_inner();
    workflow::assignments::reassign(pool.get_ref(), &caller, assignment_id, &body).await?;

    let assignment = assignment::find_row(pool.get_ref(), assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("assignment {assignment_id}")))?;
    let detail = api::load_detail(pool.get_ref(), assignment.opinion_request_id).await?;

    Ok(HttpResponse::Ok().json(detail))
}
