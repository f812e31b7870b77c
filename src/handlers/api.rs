//! Shared response shapes for the JSON API.

use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::assignment::AssignmentView;
use crate::models::communication::Communication;
use crate::models::document::DocumentView;
use crate::models::history::HistoryEntry;
use crate::models::opinion::OpinionView;
use crate::models::remark::Remark;
use crate::models::request::RequestDetail;
use crate::models::{assignment, communication, document, history, opinion, remark, request};

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub skip: i64,
    pub limit: i64,
    pub total: i64,
}

/// A request with every child collection a client needs to render it.
/// Soft-deleted requests resolve to NotFound here, and their children
/// disappear with them.
#[derive(Debug, Serialize)]
pub struct RequestDetailResponse {
    #[serde(flatten)]
    pub request: RequestDetail,
    pub assignments: Vec<AssignmentView>,
    pub opinions: Vec<OpinionView>,
    pub documents: Vec<DocumentView>,
    pub remarks: Vec<Remark>,
    pub communications: Vec<Communication>,
    pub history: Vec<HistoryEntry>,
}

pub(crate) async fn load_detail(
    pool: &PgPool,
    id: i64,
) -> Result<RequestDetailResponse, AppError> {
    let request = request::find_detail(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("opinion request {id}")))?;
    let assignments = assignment::find_for_request(pool, id).await?;
    let opinions = opinion::find_for_request(pool, id).await?;
    let documents = document::find_for_request(pool, id).await?;
    let remarks = remark::find_for_request(pool, id).await?;
    let communications = communication::find_for_request(pool, id).await?;
    let history = history::find_for_request(pool, id).await?;

    Ok(RequestDetailResponse {
        request,
        assignments,
        opinions,
        documents,
        remarks,
        communications,
        history,
    })
}
