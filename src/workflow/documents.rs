//! Document attachment and removal, plus the shared plumbing for inline
//! file batches (request creation attaches documents through the same
//! path).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use sqlx::{Postgres, Transaction};

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::document::{InlineFile, UploadDocumentsBody};
use crate::models::{document, history, request};
use crate::storage::{self, FileStore, StoredFile};
use crate::workflow::transitions;

/// Decode a batch of inline files and validate every one of them before
/// reporting success. One bad file fails the whole batch.
pub(crate) fn decode_batch(files: &[InlineFile]) -> Result<Vec<(String, Vec<u8>)>, AppError> {
    let mut decoded = Vec::with_capacity(files.len());
    for file in files {
        let bytes = BASE64.decode(file.content_base64.as_bytes()).map_err(|_| {
            AppError::Validation(format!("document '{}' is not valid base64", file.file_name))
        })?;
        storage::validate_file(&file.file_name, bytes.len())?;
        decoded.push((file.file_name.clone(), bytes));
    }
    Ok(decoded)
}

/// Write a validated batch to disk. If any file fails to save, the ones
/// already written are removed again.
pub(crate) async fn save_batch(
    store: &FileStore,
    decoded: &[(String, Vec<u8>)],
) -> Result<Vec<(String, StoredFile)>, AppError> {
    let mut saved = Vec::with_capacity(decoded.len());
    for (name, bytes) in decoded {
        match store.save(name, bytes).await {
            Ok(stored) => saved.push((name.clone(), stored)),
            Err(e) => {
                discard_batch(store, &saved).await;
                return Err(e);
            }
        }
    }
    Ok(saved)
}

/// Best-effort removal of files whose database rows never made it.
pub(crate) async fn discard_batch(store: &FileStore, saved: &[(String, StoredFile)]) {
    for (_, stored) in saved {
        if !store.remove(&stored.stored_name).await {
            log::warn!("Failed to remove orphaned upload {}", stored.stored_name);
        }
    }
}

pub(crate) async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    request_id: i64,
    uploaded_by: i64,
    saved: &[(String, StoredFile)],
) -> Result<Vec<i64>, AppError> {
    let mut ids = Vec::with_capacity(saved.len());
    for (original, stored) in saved {
        // Validation already required an allow-listed extension.
        let file_type = storage::extension_of(original).unwrap_or_default();
        let id = document::insert(
            tx,
            request_id,
            original,
            &stored.stored_name,
            &stored.path,
            &file_type,
            stored.size,
            uploaded_by,
        )
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

/// Attach a batch of documents to an existing request. All files of the
/// batch land together with a single version bump and a single audit
/// entry, or none of them do.
pub async fn upload(
    pool: &sqlx::PgPool,
    store: &FileStore,
    caller: &Caller,
    request_id: i64,
    body: &UploadDocumentsBody,
) -> Result<Vec<i64>, AppError> {
    if body.files.is_empty() {
        return Err(AppError::Validation("upload contains no files".into()));
    }
    let decoded = decode_batch(&body.files)?;

    // Cheap existence probe so a typo'd id does not scatter files on disk.
    // The authoritative check is the row lock below.
    if !request::exists(pool, request_id).await? {
        return Err(AppError::NotFound(format!("opinion request {request_id}")));
    }

    let saved = save_batch(store, &decoded).await?;

    match persist_upload(pool, caller, request_id, body, &saved).await {
        Ok(ids) => Ok(ids),
        Err(e) => {
            discard_batch(store, &saved).await;
            Err(e)
        }
    }
}

async fn persist_upload(
    pool: &sqlx::PgPool,
    caller: &Caller,
    request_id: i64,
    body: &UploadDocumentsBody,
    saved: &[(String, StoredFile)],
) -> Result<Vec<i64>, AppError> {
    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {request_id}")))?;
    transitions::ensure_mutable(&row.status)?;

    let ids = insert_rows(&mut tx, request_id, caller.id, saved).await?;
    request::bump_version(&mut tx, request_id).await?;

    let names: Vec<&str> = saved.iter().map(|(name, _)| name.as_str()).collect();
    history::record(
        &mut tx,
        request_id,
        "documents_uploaded",
        caller.id,
        Some(row.current_status_id),
        row.current_status_id,
        json!({ "files": names, "remarks": body.remarks }),
    )
    .await?;

    tx.commit().await?;
    Ok(ids)
}

/// Delete one document. The database row goes first; the stored file is
/// only removed after the commit, so a rolled-back delete loses nothing.
pub async fn remove(
    pool: &sqlx::PgPool,
    store: &FileStore,
    caller: &Caller,
    document_id: i64,
) -> Result<(), AppError> {
    let located = document::find_row(pool, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("document {document_id}")))?;

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, located.opinion_request_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("opinion request {}", located.opinion_request_id))
        })?;
    transitions::ensure_mutable(&row.status)?;

    let current = document::find_row_tx(&mut tx, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("document {document_id}")))?;
    if current.uploaded_by != caller.id && !caller.permissions.has("documents.manage") {
        return Err(AppError::Permission(
            "only the uploader or a document manager can delete a document".into(),
        ));
    }

    document::delete_row(&mut tx, document_id).await?;
    request::bump_version(&mut tx, located.opinion_request_id).await?;
    history::record(
        &mut tx,
        located.opinion_request_id,
        "document_deleted",
        caller.id,
        Some(row.current_status_id),
        row.current_status_id,
        json!({ "document_id": document_id, "file_name": current.file_name }),
    )
    .await?;

    tx.commit().await?;

    if !store.remove(&current.stored_name).await {
        log::warn!("Failed to remove stored file {}", current.stored_name);
    }
    Ok(())
}
