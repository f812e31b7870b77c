use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, web};
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::handlers::api;
use crate::models::document::{self, UploadDocumentsBody};
use crate::models::request;
use crate::storage::FileStore;
use crate::workflow;

/// POST /api/v1/requests/{id}/documents - Attach a batch of documents
pub async fn upload(
    pool: web::Data<PgPool>,
    store: web::Data<FileStore>,
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<UploadDocumentsBody>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    workflow::documents::upload(pool.get_ref(), store.get_ref(), &caller, request_id, &body)
        .await?;
    let detail = api::load_detail(pool.get_ref(), request_id).await?;

    Ok(HttpResponse::Created().json(detail))
}

/// DELETE /api/v1/requests/{id}/documents/{doc_id} - Remove a document
pub async fn delete(
    pool: web::Data<PgPool>,
    store: web::Data<FileStore>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (request_id, document_id) = path.into_inner();
    let doc = document::find_row(pool.get_ref(), document_id)
        .await?
        .filter(|d| d.opinion_request_id == request_id)
        .ok_or_else(|| AppError::NotFound(format!("document {document_id}")))?;

    workflow::documents::remove(pool.get_ref(), store.get_ref(), &caller, doc.id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/requests/{id}/documents/{doc_id}/download - Stream the stored file
pub async fn download(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    store: web::Data<FileStore>,
    _caller: Caller,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (request_id, document_id) = path.into_inner();

    // A deleted request hides its documents along with everything else.
    if !request::exists(pool.get_ref(), request_id).await? {
        return Err(AppError::NotFound(format!("opinion request {request_id}")));
    }
    let doc = document::find_row(pool.get_ref(), document_id)
        .await?
        .filter(|d| d.opinion_request_id == request_id)
        .ok_or_else(|| AppError::NotFound(format!("document {document_id}")))?;

    let file = NamedFile::open_async(store.path_of(&doc.stored_name)).await.map_err(|e| {
        AppError::Dependency(format!("stored file missing for document {document_id}: {e}"))
    })?;
    let file = file.set_content_disposition(ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(doc.file_name.clone())],
    });

    Ok(file.into_response(&req))
}
