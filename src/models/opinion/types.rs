use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateOpinionBody {
    pub department_id: i64,
    pub content: String,
    pub recommendation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOpinionBody {
    pub content: Option<String>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewOpinionBody {
    pub approved: bool,
    pub comments: Option<String>,
}

/// Opinion as returned to API clients, with names resolved.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OpinionView {
    pub id: i64,
    pub opinion_request_id: i64,
    pub department_id: i64,
    pub department_name: String,
    pub expert_id: i64,
    pub expert_name: String,
    pub content: String,
    pub recommendation: Option<String>,
    pub status: String,
    pub review_comments: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_by_name: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
