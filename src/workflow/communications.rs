//! Explicit interdepartmental correspondence on a request.
//!
//! A communication that requires a response parks the request in
//! `pending_other_department`; the response puts it back where it was when
//! the question went out. Communications that need no answer only leave an
//! audit entry.

use serde_json::json;
use sqlx::PgPool;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::communication::{
    NewCommunication, RespondCommunicationBody, SendCommunicationBody,
};
use crate::models::request::PRIORITIES;
use crate::models::{communication, department, history, request, status};
use crate::workflow::transitions;

pub async fn send(
    pool: &PgPool,
    caller: &Caller,
    request_id: i64,
    body: &SendCommunicationBody,
) -> Result<i64, AppError> {
    let from_department = caller.department_id.ok_or_else(|| {
        AppError::Permission("caller without a department cannot send communications".into())
    })?;

    if body.subject.trim().is_empty() {
        return Err(AppError::Validation("subject must not be empty".into()));
    }
    if let Some(priority) = &body.priority {
        if !PRIORITIES.contains(&priority.as_str()) {
            return Err(AppError::Validation(format!(
                "priority must be one of {}",
                PRIORITIES.join(", ")
            )));
        }
    }
    if body.to_department_id == from_department {
        return Err(AppError::Validation(
            "communication target must be a different department".into(),
        ));
    }

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {request_id}")))?;
    transitions::ensure_mutable(&row.status)?;

    department::find_by_id(&mut tx, body.to_department_id).await?.ok_or_else(|| {
        AppError::Validation(format!("department {} does not exist", body.to_department_id))
    })?;

    if body.requires_response {
        transitions::validate(&row.status, transitions::PENDING_OTHER_DEPARTMENT)?;
    }

    let communication_id = communication::insert(
        &mut tx,
        &NewCommunication {
            request_id,
            from_department_id: from_department,
            to_department_id: body.to_department_id,
            sender_id: caller.id,
            comm_type: body.comm_type.as_deref().unwrap_or("inquiry"),
            subject: body.subject.trim(),
            body: body.body.as_deref(),
            priority: body.priority.as_deref().unwrap_or(&row.priority),
            status: "pending",
            requires_response: body.requires_response,
            due_date: body.due_date,
            parent_communication_id: None,
        },
    )
    .await?;

    let details = json!({
        "communication_id": communication_id,
        "to_department_id": body.to_department_id,
        "requires_response": body.requires_response,
    });

    if body.requires_response {
        let target =
            status::find_by_name(&mut tx, transitions::PENDING_OTHER_DEPARTMENT).await?;
        request::set_status(&mut tx, request_id, target.id).await?;
        history::record(
            &mut tx,
            request_id,
            "communication_sent",
            caller.id,
            Some(row.current_status_id),
            target.id,
            details,
        )
        .await?;
    } else {
        request::bump_version(&mut tx, request_id).await?;
        history::record(
            &mut tx,
            request_id,
            "communication_sent",
            caller.id,
            Some(row.current_status_id),
            row.current_status_id,
            details,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(communication_id)
}

pub async fn respond(
    pool: &PgPool,
    caller: &Caller,
    communication_id: i64,
    body: &RespondCommunicationBody,
) -> Result<i64, AppError> {
    if body.body.trim().is_empty() {
        return Err(AppError::Validation("response body must not be empty".into()));
    }

    let located = communication::find_row(pool, communication_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("communication {communication_id}")))?;

    if caller.department_id != Some(located.to_department_id)
        && !caller.permissions.has("requests.manage")
    {
        return Err(AppError::Permission(
            "only the receiving department can respond to a communication".into(),
        ));
    }

    let mut tx = pool.begin().await?;
    let row = request::lock_row(&mut tx, located.opinion_request_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("opinion request {}", located.opinion_request_id))
        })?;
    transitions::ensure_mutable(&row.status)?;

    let current = communication::find_row_tx(&mut tx, communication_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("communication {communication_id}")))?;
    if current.status != "pending" {
        return Err(AppError::InvalidState(format!(
            "communication is '{}', not 'pending'",
            current.status
        )));
    }

    let reply_subject = format!("Re: {}", current.subject);
    let reply_id = communication::insert(
        &mut tx,
        &NewCommunication {
            request_id: located.opinion_request_id,
            from_department_id: current.to_department_id,
            to_department_id: current.from_department_id,
            sender_id: caller.id,
            comm_type: "response",
            subject: &reply_subject,
            body: Some(body.body.trim()),
            priority: &row.priority,
            status: "sent",
            requires_response: false,
            due_date: None,
            parent_communication_id: Some(communication_id),
        },
    )
    .await?;
    communication::mark_responded(&mut tx, communication_id).await?;

    let details = json!({ "communication_id": communication_id, "reply_id": reply_id });

    // Only the answer to the last outstanding question lifts the park;
    // earlier answers leave the request waiting on the others.
    let outstanding =
        communication::pending_response_count(&mut tx, located.opinion_request_id).await?;

    if current.requires_response
        && row.status == transitions::PENDING_OTHER_DEPARTMENT
        && outstanding == 0
    {
        let origin_id = history::pending_branch_origin(
            &mut tx,
            located.opinion_request_id,
            row.current_status_id,
        )
        .await?
        .ok_or_else(|| {
            AppError::Dependency("no communication_sent history entry to return from".into())
        })?;
        let origin = status::find_by_id(&mut tx, origin_id).await?;
        transitions::validate(&row.status, &origin.name)?;
        request::set_status(&mut tx, located.opinion_request_id, origin.id).await?;
        history::record(
            &mut tx,
            located.opinion_request_id,
            "communication_responded",
            caller.id,
            Some(row.current_status_id),
            origin.id,
            details,
        )
        .await?;
    } else {
        request::bump_version(&mut tx, located.opinion_request_id).await?;
        history::record(
            &mut tx,
            located.opinion_request_id,
            "communication_responded",
            caller.id,
            Some(row.current_status_id),
            row.current_status_id,
            details,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(reply_id)
}
