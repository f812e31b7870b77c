use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AssignRequestBody {
    pub department_id: i64,
    pub expert_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_primary: bool,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReassignBody {
    pub expert_id: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
}

/// Assignment as returned to API clients, with names resolved.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AssignmentView {
    pub id: i64,
    pub opinion_request_id: i64,
    pub department_id: i64,
    pub department_name: String,
    pub expert_id: Option<i64>,
    pub expert_name: Option<String>,
    pub assigned_by: i64,
    pub assigned_by_name: String,
    pub is_primary: bool,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
