//! Request lifecycle operations: creation, patching, soft deletion, remarks
//! and the additional-information detour.
//!
//! Every mutation follows the same shape: open a transaction, lock the
//! request row, check permissions and state, apply the change together with
//! a version bump, append the audit entry, commit. The audit insert lives
//! in the same transaction as the change it records.

use serde_json::json;
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::request::{
    CreateRequestBody, NewRequest, PRIORITIES, ProvideInfoBody, RemarkBody, RequestInfoBody,
    UpdateRequestBody,
};
use crate::models::{assignment, category, department, history, remark, request, status};
use crate::storage::{FileStore, StoredFile};
use crate::workflow::{documents, reference, transitions};

const REFERENCE_ATTEMPTS: usize = 5;

/// Create a request with optional inline documents. The whole call is
/// all-or-nothing: if any document fails validation or any write fails,
/// no request row and no file survives.
pub async fn create(
    pool: &PgPool,
    store: &FileStore,
    caller: &Caller,
    body: &CreateRequestBody,
) -> Result<i64, AppError> {
    caller.require("requests.create")?;

    if body.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".into()));
    }
    if body.description.trim().is_empty() {
        return Err(AppError::Validation("description must not be empty".into()));
    }
    let priority = body.priority.as_deref().unwrap_or("medium");
    if !PRIORITIES.contains(&priority) {
        return Err(AppError::Validation(format!(
            "priority must be one of {}",
            PRIORITIES.join(", ")
        )));
    }

    // Decode and validate every attachment before anything touches disk,
    // so one bad file rejects the whole batch.
    let decoded = documents::decode_batch(body.documents.as_deref().unwrap_or(&[]))?;
    let saved = documents::save_batch(store, &decoded).await?;

    match persist_new(pool, caller, body, priority, &saved).await {
        Ok(id) => Ok(id),
        Err(e) => {
            documents::discard_batch(store, &saved).await;
            Err(e)
        }
    }
}

async fn persist_new(
    pool: &PgPool,
    caller: &Caller,
    body: &CreateRequestBody,
    priority: &str,
    saved: &[(String, StoredFile)],
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    department::find_by_id(&mut tx, body.department_id).await?.ok_or_else(|| {
        AppError::Validation(format!("department {} does not exist", body.department_id))
    })?;
    category::validate_pairing(&mut tx, body.category_id, body.subcategory_id).await?;
    let initial = status::find_by_name(&mut tx, transitions::UNASSIGNED).await?;

    let new = NewRequest {
        title: body.title.trim(),
        description: body.description.trim(),
        requester_id: caller.id,
        department_id: body.department_id,
        category_id: body.category_id,
        subcategory_id: body.subcategory_id,
        priority,
        due_date: body.due_date,
        statement: body.statement.as_deref(),
        risks: body.risks.as_deref(),
        impact: body.impact.as_deref(),
    };

    // The reference number is random, so an insert can collide with an
    // existing row. ON CONFLICT DO NOTHING turns that into a retry
    // instead of an aborted transaction.
    let mut allocated: Option<(i64, String)> = None;
    for _ in 0..REFERENCE_ATTEMPTS {
        let candidate = reference::generate();
        if let Some(id) = request::insert_new(&mut tx, &new, &candidate, initial.id).await? {
            allocated = Some((id, candidate));
            break;
        }
    }
    let (request_id, reference_number) = allocated.ok_or_else(|| {
        AppError::Dependency("could not allocate a unique reference number".into())
    })?;

    documents::insert_rows(&mut tx, request_id, caller.id, saved).await?;
    let file_names: Vec<&str> = saved.iter().map(|(name, _)| name.as_str()).collect();

    history::record(
        &mut tx,
        request_id,
        "created",
        caller.id,
        None,
        initial.id,
        json!({
            "reference_number": reference_number,
            "title": body.title.trim(),
            "documents": file_names,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(request_id)
}

/// Apply a partial update. Fields absent from the patch are untouched;
/// fields present with null clear the column, except where the column is
/// required.
pub async fn update(
    pool: &PgPool,
    caller: &Caller,
    id: i64,
    patch: &UpdateRequestBody,
) -> Result<(), AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("patch contains no recognized fields".into()));
    }
    for (field, is_null) in [
        ("title", matches!(patch.title, Some(None))),
        ("description", matches!(patch.description, Some(None))),
        ("priority", matches!(patch.priority, Some(None))),
        ("category_id", matches!(patch.category_id, Some(None))),
    ] {
        if is_null {
            return Err(AppError::Validation(format!("field '{field}' cannot be null")));
        }
    }
    if let Some(Some(title)) = &patch.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
    }
    if let Some(Some(description)) = &patch.description {
        if description.trim().is_empty() {
            return Err(AppError::Validation("description must not be empty".into()));
        }
    }
    if let Some(Some(priority)) = &patch.priority {
        if !PRIORITIES.contains(&priority.as_str()) {
            return Err(AppError::Validation(format!(
                "priority must be one of {}",
                PRIORITIES.join(", ")
            )));
        }
    }

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {id}")))?;

    if row.requester_id != caller.id && !caller.permissions.has("requests.manage") {
        return Err(AppError::Permission(
            "only the requester or a request manager can update a request".into(),
        ));
    }
    transitions::ensure_mutable(&row.status)?;

    // Category and subcategory must stay a valid pair after the patch,
    // whichever of the two it touches.
    if patch.category_id.is_some() || patch.subcategory_id.is_some() {
        let effective_category = match patch.category_id {
            Some(Some(c)) => c,
            _ => row.category_id,
        };
        let effective_subcategory = match patch.subcategory_id {
            Some(s) => s,
            None => row.subcategory_id,
        };
        category::validate_pairing(&mut tx, effective_category, effective_subcategory).await?;
    }

    let changed = request::apply_patch(&mut tx, id, patch).await?;
    history::record(
        &mut tx,
        id,
        "updated",
        caller.id,
        Some(row.current_status_id),
        row.current_status_id,
        json!({ "fields": changed }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Soft-delete. Unlike other mutations this is allowed on terminal
/// requests; the row and its audit trail stay in the database.
pub async fn delete(pool: &PgPool, caller: &Caller, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {id}")))?;

    if row.requester_id != caller.id && !caller.permissions.has("requests.manage") {
        return Err(AppError::Permission(
            "only the requester or a request manager can delete a request".into(),
        ));
    }

    request::mark_deleted(&mut tx, id, caller.id).await?;
    history::record(
        &mut tx,
        id,
        "deleted",
        caller.id,
        Some(row.current_status_id),
        row.current_status_id,
        json!({ "reference_number": row.reference_number }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn add_remark(
    pool: &PgPool,
    caller: &Caller,
    id: i64,
    body: &RemarkBody,
) -> Result<i64, AppError> {
    if body.body.trim().is_empty() {
        return Err(AppError::Validation("remark body must not be empty".into()));
    }

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {id}")))?;
    transitions::ensure_mutable(&row.status)?;

    let remark_id = remark::insert(&mut tx, id, caller.id, body.body.trim()).await?;
    request::bump_version(&mut tx, id).await?;
    history::record(
        &mut tx,
        id,
        "remark_added",
        caller.id,
        Some(row.current_status_id),
        row.current_status_id,
        json!({ "remark_id": remark_id }),
    )
    .await?;

    tx.commit().await?;
    Ok(remark_id)
}

/// Park the request in the additional-information branch. The entry
/// records where the request came from so `provide_info` can return it
/// there.
pub async fn request_info(
    pool: &PgPool,
    caller: &Caller,
    id: i64,
    body: &RequestInfoBody,
) -> Result<(), AppError> {
    if body.comments.trim().is_empty() {
        return Err(AppError::Validation("comments must not be empty".into()));
    }

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {id}")))?;

    if !caller.permissions.has("requests.assign")
        && !assignment::expert_holds_assignment(&mut tx, id, caller.id).await?
    {
        return Err(AppError::Permission(
            "only assigners or assigned experts can request additional information".into(),
        ));
    }

    transitions::ensure_mutable(&row.status)?;
    if row.status == transitions::ADDITIONAL_INFO_REQUESTED {
        return Err(AppError::InvalidState(
            "additional information has already been requested".into(),
        ));
    }
    transitions::validate(&row.status, transitions::ADDITIONAL_INFO_REQUESTED)?;

    let target = status::find_by_name(&mut tx, transitions::ADDITIONAL_INFO_REQUESTED).await?;
    request::set_status(&mut tx, id, target.id).await?;
    history::record(
        &mut tx,
        id,
        "info_requested",
        caller.id,
        Some(row.current_status_id),
        target.id,
        json!({ "comments": body.comments }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Answer an additional-information request and put the request back in
/// the status it was in when the information was asked for.
pub async fn provide_info(
    pool: &PgPool,
    caller: &Caller,
    id: i64,
    body: &ProvideInfoBody,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {id}")))?;

    if row.requester_id != caller.id && !caller.permissions.has("requests.manage") {
        return Err(AppError::Permission(
            "only the requester or a request manager can provide additional information".into(),
        ));
    }
    if row.status != transitions::ADDITIONAL_INFO_REQUESTED {
        return Err(AppError::InvalidState(format!(
            "request is in status '{}', not '{}'",
            row.status,
            transitions::ADDITIONAL_INFO_REQUESTED
        )));
    }

    let origin_id = history::latest_branch_origin(&mut tx, id, "info_requested")
        .await?
        .ok_or_else(|| {
            AppError::Dependency("no info_requested history entry to return from".into())
        })?;
    let origin = status::find_by_id(&mut tx, origin_id).await?;
    transitions::validate(&row.status, &origin.name)?;

    request::set_status(&mut tx, id, origin.id).await?;
    history::record(
        &mut tx,
        id,
        "info_provided",
        caller.id,
        Some(row.current_status_id),
        origin.id,
        json!({ "comments": body.comments }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}
