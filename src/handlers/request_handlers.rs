use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::handlers::api::{self, PaginatedResponse};
use crate::models::request::{
    CreateRequestBody, ProvideInfoBody, RemarkBody, RequestInfoBody, RequestListQuery,
    UpdateRequestBody,
};
use crate::models::{history, request};
use crate::storage::FileStore;
use crate::workflow;

/// GET /api/v1/requests - List requests with filters and pagination
pub async fn list(
    pool: web::Data<PgPool>,
    _caller: Caller,
    query: web::Query<RequestListQuery>,
) -> Result<HttpResponse, AppError> {
    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(20).max(1).min(100);

    let (items, total) = request::find_list(pool.get_ref(), &query, skip, limit).await?;

    Ok(HttpResponse::Ok().json(PaginatedResponse { items, skip, limit, total }))
}

/// POST /api/v1/requests - Create a request, optionally with inline documents
pub async fn create(
    pool: web::Data<PgPool>,
    store: web::Data<FileStore>,
    caller: Caller,
    body: web::Json<CreateRequestBody>,
) -> Result<HttpResponse, AppError> {
    let id = workflow::requests::create(pool.get_ref(), store.get_ref(), &caller, &body).await?;
    let detail = api::load_detail(pool.get_ref(), id).await?;

    Ok(HttpResponse::Created().json(detail))
}

/// GET /api/v1/requests/{id} - Full request detail with child collections
pub async fn read(
    pool: web::Data<PgPool>,
    _caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let detail = api::load_detail(pool.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// PATCH /api/v1/requests/{id} - Partial update; null clears nullable fields
pub async fn update(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<UpdateRequestBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    workflow::requests::update(pool.get_ref(), &caller, id, &body).await?;
    let detail = api::load_detail(pool.get_ref(), id).await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// DELETE /api/v1/requests/{id} - Soft-delete
pub async fn delete(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    workflow::requests::delete(pool.get_ref(), &caller, path.into_inner()).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/requests/{id}/history - Audit trail, oldest first
pub async fn history(
    pool: web::Data<PgPool>,
    _caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if !request::exists(pool.get_ref(), id).await? {
        return Err(AppError::NotFound(format!("opinion request {id}")));
    }
    let entries = history::find_for_request(pool.get_ref(), id).await?;

    Ok(HttpResponse::Ok().json(entries))
}

/// POST /api/v1/requests/{id}/remarks - Attach a free-text remark
pub async fn add_remark(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<RemarkBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    workflow::requests::add_remark(pool.get_ref(), &caller, id, &body).await?;
    let detail = api::load_detail(pool.get_ref(), id).await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/v1/requests/{id}/request-info - Ask the requester for more information
pub async fn request_info(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<RequestInfoBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    workflow::requests::request_info(pool.get_ref(), &caller, id, &body).await?;
    let detail = api::load_detail(pool.get_ref(), id).await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/v1/requests/{id}/provide-info - Answer an information request
pub async fn provide_info(
    pool: web::Data<PgPool>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<ProvideInfoBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    workflow::requests::provide_info(pool.get_ref(), &caller, id, &body).await?;
    let detail = api::load_detail(pool.get_ref(), id).await?;

    Ok(HttpResponse::Ok().json(detail))
}
