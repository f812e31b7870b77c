pub mod api;
pub mod assignment_handlers;
pub mod communication_handlers;
pub mod document_handlers;
pub mod opinion_handlers;
pub mod request_handlers;
pub mod statistics_handlers;

use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};
use sqlx::PgPool;

use crate::errors::AppError;

/// CSRF protection for REST API mutation endpoints.
///
/// Rejects POST/PUT/PATCH/DELETE requests that don't have
/// Content-Type: application/json. Browsers cannot send cross-origin JSON
/// with credentials via simple form POST — the Content-Type check acts as a
/// CSRF guard without requiring tokens. GET requests are exempt (read-only,
/// no state changes).
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::PATCH
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::BadRequest().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// GET /health - Liveness check including a database round trip
pub async fn health(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    sqlx::query("SELECT 1").execute(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "database": "reachable",
    })))
}

/// Configure API v1 routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/requests")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("", web::get().to(request_handlers::list))
            .route("", web::post().to(request_handlers::create))
            .route("/{id}", web::get().to(request_handlers::read))
            .route("/{id}", web::patch().to(request_handlers::update))
            .route("/{id}", web::delete().to(request_handlers::delete))
            .route("/{id}/history", web::get().to(request_handlers::history))
            .route("/{id}/remarks", web::post().to(request_handlers::add_remark))
            .route("/{id}/request-info", web::post().to(request_handlers::request_info))
            .route("/{id}/provide-info", web::post().to(request_handlers::provide_info))
            .route("/{id}/assign", web::post().to(assignment_handlers::assign))
            .route("/{id}/opinions", web::post().to(opinion_handlers::create))
            .route("/{id}/documents", web::post().to(document_handlers::upload))
            .route("/{id}/documents/{doc_id}", web::delete().to(document_handlers::delete))
            .route(
                "/{id}/documents/{doc_id}/download",
                web::get().to(document_handlers::download),
            )
            .route("/{id}/communications", web::post().to(communication_handlers::send)),
    );
    cfg.service(
        web::scope("/assignments")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("/{id}/reassign", web::post().to(assignment_handlers::reassign)),
    );
    cfg.service(
        web::scope("/opinions")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("/{id}", web::patch().to(opinion_handlers::update))
            .route("/{id}/submit", web::post().to(opinion_handlers::submit))
            .route("/{id}/start-review", web::post().to(opinion_handlers::start_review))
            .route("/{id}/review", web::post().to(opinion_handlers::review)),
    );
    cfg.service(
        web::scope("/communications")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("/{id}/respond", web::post().to(communication_handlers::respond)),
    );
    cfg.service(web::scope("/statistics").route("", web::get().to(statistics_handlers::department)));
}
