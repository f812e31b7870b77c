use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::handlers::api;
use crate::models::opinion::{self, CreateOpinionBody, ReviewOpinionBody, UpdateOpinionBody};
use crate::workflow;

async fn detail_for_opinion(pool: &PgPool, opinion_id: i64) -> Result<HttpResponse, AppError> {
    let located = opinion::find_row(pool, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;
    let detail = api::load_detail(pool, located.opinion_request_id).await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/v1/requests/{id}/opinions - Open a draft opinion
pub async fn create(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<CreateOpinionBody>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    workflow::opinions::create(pool.get_ref(), &caller, request_id, &body).await?;
    let detail = api::load_detail(pool.get_ref(), request_id).await?;

    Ok(HttpResponse::Created().json(detail))
}

/// PATCH /api/v1/opinions/{id} - Revise a draft opinion
pub async fn update(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<UpdateOpinionBody>,
) -> Result<HttpResponse, AppError> {
    let opinion_id = path.into_inner();
    workflow::opinions::update(pool.get_ref(), &caller, opinion_id, &body).await?;

    detail_for_opinion(pool.get_ref(), opinion_id).await
}

/// POST /api/v1/opinions/{id}/submit - Submit a draft for head review
pub async fn submit(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let opinion_id = path.into_inner();
    workflow::opinions::submit(pool.get_ref(), &caller, opinion_id).await?;

    detail_for_opinion(pool.get_ref(), opinion_id).await
}

/// POST /api/v1/opinions/{id}/start-review - Claim a submitted opinion for review
pub async fn start_review(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let opinion_id = path.into_inner();
    workflow::opinions::start_review(pool.get_ref(), &caller, opinion_id).await?;

    detail_for_opinion(pool.get_ref(), opinion_id).await
}

/// POST /api/v1/opinions/{id}/review - Approve or reject a submitted opinion
pub async fn review(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<ReviewOpinionBody>,
) -> Result<HttpResponse, AppError> {
    let opinion_id = path.into_inner();
    workflow::opinions::review(pool.get_ref(), &caller, opinion_id, &body).await?;

    detail_for_opinion(pool.get_ref(), opinion_id).await
}
