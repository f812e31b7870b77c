//! Expert opinion lifecycle: draft, revise, submit, head review.

use serde_json::json;
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::opinion::{CreateOpinionBody, ReviewOpinionBody, UpdateOpinionBody};
use crate::models::{assignment, history, opinion, request, status};
use crate::workflow::transitions;

/// Open a draft opinion. The caller must be the assigned expert for the
/// given department, and must not already have an opinion in flight on
/// this request.
pub async fn create(
    pool: &PgPool,
    caller: &Caller,
    request_id: i64,
    body: &CreateOpinionBody,
) -> Result<i64, AppError> {
    if body.content.trim().is_empty() {
        return Err(AppError::Validation("opinion content must not be empty".into()));
    }

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {request_id}")))?;
    transitions::ensure_mutable(&row.status)?;

    let held = assignment::find_for_expert(&mut tx, request_id, body.department_id, caller.id)
        .await?
        .ok_or_else(|| {
            AppError::Permission("no active assignment for this request and department".into())
        })?;

    if let Some(existing) = opinion::open_opinion_for(&mut tx, request_id, caller.id).await? {
        return Err(AppError::Validation(format!(
            "opinion {} by this expert is still open on this request",
            existing.id
        )));
    }

    transitions::validate(&row.status, transitions::IN_REVIEW)?;
    let target = status::find_by_name(&mut tx, transitions::IN_REVIEW).await?;

    let opinion_id = opinion::insert(
        &mut tx,
        request_id,
        body.department_id,
        caller.id,
        body.content.trim(),
        body.recommendation.as_deref(),
    )
    .await?;
    assignment::set_status(&mut tx, held.id, "opinion_drafted").await?;
    request::set_status(&mut tx, request_id, target.id).await?;
    history::record(
        &mut tx,
        request_id,
        "opinion_created",
        caller.id,
        Some(row.current_status_id),
        target.id,
        json!({ "opinion_id": opinion_id, "department_id": body.department_id }),
    )
    .await?;

    tx.commit().await?;
    Ok(opinion_id)
}

/// Revise a draft. Only the authoring expert may touch it, and only while
/// it is still a draft.
pub async fn update(
    pool: &PgPool,
    caller: &Caller,
    opinion_id: i64,
    body: &UpdateOpinionBody,
) -> Result<(), AppError> {
    if body.content.is_none() && body.recommendation.is_none() {
        return Err(AppError::Validation("patch contains no recognized fields".into()));
    }
    if let Some(content) = &body.content {
        if content.trim().is_empty() {
            return Err(AppError::Validation("opinion content must not be empty".into()));
        }
    }

    let located = opinion::find_row(pool, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, located.opinion_request_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("opinion request {}", located.opinion_request_id))
        })?;
    transitions::ensure_mutable(&row.status)?;

    let current = opinion::find_row_tx(&mut tx, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;
    if current.expert_id != caller.id {
        return Err(AppError::Permission("only the authoring expert can update an opinion".into()));
    }
    if current.status != "draft" {
        return Err(AppError::InvalidState(format!(
            "only draft opinions can be updated (current status '{}')",
            current.status
        )));
    }

    opinion::update_content(
        &mut tx,
        opinion_id,
        body.content.as_deref().map(str::trim),
        body.recommendation.as_deref(),
    )
    .await?;
    request::bump_version(&mut tx, located.opinion_request_id).await?;
    history::record(
        &mut tx,
        located.opinion_request_id,
        "opinion_updated",
        caller.id,
        Some(row.current_status_id),
        row.current_status_id,
        json!({ "opinion_id": opinion_id }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Submit a draft for head review. A non-draft opinion fails before any
/// write happens, so no version bump and no audit entry.
pub async fn submit(pool: &PgPool, caller: &Caller, opinion_id: i64) -> Result<(), AppError> {
    let located = opinion::find_row(pool, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, located.opinion_request_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("opinion request {}", located.opinion_request_id))
        })?;
    transitions::ensure_mutable(&row.status)?;

    let current = opinion::find_row_tx(&mut tx, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;
    if current.expert_id != caller.id {
        return Err(AppError::Permission("only the authoring expert can submit an opinion".into()));
    }
    if current.status != "draft" {
        return Err(AppError::InvalidState(format!(
            "only draft opinions can be submitted (current status '{}')",
            current.status
        )));
    }
    transitions::validate(&row.status, transitions::EXPERT_OPINION_SUBMITTED)?;
    let target = status::find_by_name(&mut tx, transitions::EXPERT_OPINION_SUBMITTED).await?;

    opinion::set_submitted(&mut tx, opinion_id).await?;
    request::set_status(&mut tx, located.opinion_request_id, target.id).await?;
    history::record(
        &mut tx,
        located.opinion_request_id,
        "opinion_submitted",
        caller.id,
        Some(row.current_status_id),
        target.id,
        json!({ "opinion_id": opinion_id }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Claim a submitted opinion for head review. Optional step; a head can
/// also review straight from the submitted status.
pub async fn start_review(pool: &PgPool, caller: &Caller, opinion_id: i64) -> Result<(), AppError> {
    caller.require("opinions.review")?;

    let located = opinion::find_row(pool, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, located.opinion_request_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("opinion request {}", located.opinion_request_id))
        })?;
    transitions::ensure_mutable(&row.status)?;

    let current = opinion::find_row_tx(&mut tx, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;
    if current.status != "submitted" {
        return Err(AppError::InvalidState(format!(
            "only submitted opinions can enter review (current status '{}')",
            current.status
        )));
    }
    transitions::validate(&row.status, transitions::HEAD_REVIEW_PENDING)?;
    let target = status::find_by_name(&mut tx, transitions::HEAD_REVIEW_PENDING).await?;

    request::set_status(&mut tx, located.opinion_request_id, target.id).await?;
    history::record(
        &mut tx,
        located.opinion_request_id,
        "review_started",
        caller.id,
        Some(row.current_status_id),
        target.id,
        json!({ "opinion_id": opinion_id }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Conclude head review, approving or rejecting the opinion and moving
/// the request to its terminal status.
pub async fn review(
    pool: &PgPool,
    caller: &Caller,
    opinion_id: i64,
    body: &ReviewOpinionBody,
) -> Result<(), AppError> {
    caller.require("opinions.review")?;

    let located = opinion::find_row(pool, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, located.opinion_request_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("opinion request {}", located.opinion_request_id))
        })?;
    transitions::ensure_mutable(&row.status)?;

    let current = opinion::find_row_tx(&mut tx, opinion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion {opinion_id}")))?;
    if current.status != "submitted" {
        return Err(AppError::InvalidState(format!(
            "only submitted opinions can be reviewed (current status '{}')",
            current.status
        )));
    }

    let target_name =
        if body.approved { transitions::HEAD_APPROVED } else { transitions::REJECTED };
    transitions::validate(&row.status, target_name)?;
    let target = status::find_by_name(&mut tx, target_name).await?;

    let outcome = if body.approved { "approved" } else { "rejected" };
    opinion::set_reviewed(&mut tx, opinion_id, outcome, caller.id, body.comments.as_deref())
        .await?;
    request::set_status(&mut tx, located.opinion_request_id, target.id).await?;
    history::record(
        &mut tx,
        located.opinion_request_id,
        "opinion_reviewed",
        caller.id,
        Some(row.current_status_id),
        target.id,
        json!({ "opinion_id": opinion_id, "approved": body.approved, "comments": body.comments }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}
