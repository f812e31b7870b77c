use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::handlers::api;
use crate::models::communication::{self, RespondCommunicationBody, SendCommunicationBody};
use crate::workflow;

/// POST /api/v1/requests/{id}/communications - Send to another department
pub async fn send(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<SendCommunicationBody>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    workflow::communications::send(pool.get_ref(), &caller, request_id, &body).await?;
    let detail = api::load_detail(pool.get_ref(), request_id).await?;

    Ok(HttpResponse::Created().json(detail))
}

/// POST /api/v1/communications/{id}/respond - Answer a pending communication
pub async fn respond(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<RespondCommunicationBody>,
) -> Result<HttpResponse, AppError> {
    let communication_id = path.into_inner();
    workflow::communications::respond(pool.get_ref(), &caller, communication_id, &body).await?;

    let located = communication::find_row(pool.get_ref(), communication_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("communication {communication_id}")))?;
    let detail = api::load_detail(pool.get_ref(), located.opinion_request_id).await?;

    Ok(HttpResponse::Ok().json(detail))
}
