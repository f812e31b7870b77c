//! Assignment of requests to departments and experts.

use serde_json::json;
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::assignment::{AssignRequestBody, NewAssignment, ReassignBody};
use crate::models::communication::NewCommunication;
use crate::models::{
    assignment, communication, department, history, remark, request, status, user,
};
use crate::workflow::transitions;

/// Assign a request to a department, optionally naming the expert. A
/// primary assignment demotes the previous primary; a non-primary one
/// leaves it alone. Assigning a department other than the owning one also
/// drops a notification in that department's communication feed.
pub async fn assign(
    pool: &PgPool,
    caller: &Caller,
    request_id: i64,
    body: &AssignRequestBody,
) -> Result<i64, AppError> {
    caller.require("requests.assign")?;

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {request_id}")))?;
    transitions::ensure_mutable(&row.status)?;

    let target_department =
        department::find_by_id(&mut tx, body.department_id).await?.ok_or_else(|| {
            AppError::Validation(format!("department {} does not exist", body.department_id))
        })?;

    if let Some(expert_id) = body.expert_id {
        user::find_active_in_department(&mut tx, expert_id, body.department_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "user {expert_id} is not an active member of department {}",
                    body.department_id
                ))
            })?;
    }

    let target_name = if body.expert_id.is_some() {
        transitions::ASSIGNED_TO_EXPERT
    } else {
        transitions::ASSIGNED_TO_DEPARTMENT
    };
    transitions::validate(&row.status, target_name)?;
    let target = status::find_by_name(&mut tx, target_name).await?;

    if body.is_primary {
        assignment::demote_primary(&mut tx, request_id).await?;
    }
    let assignment_id = assignment::insert(
        &mut tx,
        &NewAssignment {
            opinion_request_id: request_id,
            department_id: body.department_id,
            expert_id: body.expert_id,
            assigned_by: caller.id,
            is_primary: body.is_primary,
            due_date: body.due_date,
        },
    )
    .await?;

    if let Some(remarks) = body.remarks.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        remark::insert(&mut tx, request_id, caller.id, remarks).await?;
    }

    // Cross-department assignments notify the receiving department.
    if body.department_id != row.department_id {
        let subject =
            format!("Opinion request {} assigned to your department", row.reference_number);
        communication::insert(
            &mut tx,
            &NewCommunication {
                request_id,
                from_department_id: row.department_id,
                to_department_id: body.department_id,
                sender_id: caller.id,
                comm_type: "assignment",
                subject: &subject,
                body: body.remarks.as_deref(),
                priority: &row.priority,
                status: "pending",
                requires_response: false,
                due_date: body.due_date,
                parent_communication_id: None,
            },
        )
        .await?;
    }

    request::set_status(&mut tx, request_id, target.id).await?;
    history::record(
        &mut tx,
        request_id,
        "assigned",
        caller.id,
        Some(row.current_status_id),
        target.id,
        json!({
            "assignment_id": assignment_id,
            "department_id": body.department_id,
            "department_name": target_department.name,
            "expert_id": body.expert_id,
            "is_primary": body.is_primary,
            "due_date": body.due_date,
            "remarks": body.remarks,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(assignment_id)
}

/// Hand an existing assignment to a different expert. The new expert must
/// be an active member of the assignment's department; the request status
/// does not move.
pub async fn reassign(
    pool: &PgPool,
    caller: &Caller,
    assignment_id: i64,
    body: &ReassignBody,
) -> Result<(), AppError> {
    caller.require("requests.assign")?;

    let existing = assignment::find_row(pool, assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("assignment {assignment_id}")))?;

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, existing.opinion_request_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("opinion request {}", existing.opinion_request_id))
        })?;
    transitions::ensure_mutable(&row.status)?;

    // Re-read under the request lock; the unlocked lookup above only
    // resolved which request to lock.
    let current = assignment::find_row_tx(&mut tx, assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("assignment {assignment_id}")))?;

    user::find_active_in_department(&mut tx, body.expert_id, current.department_id)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!(
                "user {} is not an active member of department {}",
                body.expert_id, current.department_id
            ))
        })?;

    assignment::update_expert(&mut tx, assignment_id, body.expert_id, body.due_date).await?;
    request::bump_version(&mut tx, existing.opinion_request_id).await?;
    history::record(
        &mut tx,
        existing.opinion_request_id,
        "reassigned",
        caller.id,
        Some(row.current_status_id),
        row.current_status_id,
        json!({
            "assignment_id": assignment_id,
            "old_expert_id": current.expert_id,
            "new_expert_id": body.expert_id,
            "remarks": body.remarks,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}
