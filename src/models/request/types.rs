use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::document::InlineFile;

pub const PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];

/// Deserializer distinguishing an absent patch field from an explicit null:
/// absent stays None, null becomes Some(None), a value becomes Some(Some(v)).
pub fn patch_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Request as shown in list views.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RequestListItem {
    pub id: i64,
    pub reference_number: String,
    pub title: String,
    pub department_id: i64,
    pub department_name: String,
    pub category_id: i64,
    pub priority: String,
    pub status: String,
    pub version: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full request detail, without child collections.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RequestDetail {
    pub id: i64,
    pub reference_number: String,
    pub title: String,
    pub description: String,
    pub requester_id: i64,
    pub requester_name: String,
    pub department_id: i64,
    pub department_name: String,
    pub category_id: i64,
    pub category_name: String,
    pub subcategory_id: Option<i64>,
    pub subcategory_name: Option<String>,
    pub priority: String,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub version: i64,
    pub statement: Option<String>,
    pub risks: Option<String>,
    pub impact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub title: String,
    pub description: String,
    pub department_id: i64,
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    pub priority: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub statement: Option<String>,
    pub risks: Option<String>,
    pub impact: Option<String>,
    pub documents: Option<Vec<InlineFile>>,
}

/// Partial update. Absent fields are untouched; explicit nulls clear nullable
/// fields and are rejected for fields that cannot be null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRequestBody {
    #[serde(default, deserialize_with = "patch_field")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub priority: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub category_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub subcategory_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub statement: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub risks: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub impact: Option<Option<String>>,
}

impl UpdateRequestBody {
    /// True when no recognized field is present in the patch.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.category_id.is_none()
            && self.subcategory_id.is_none()
            && self.due_date.is_none()
            && self.statement.is_none()
            && self.risks.is_none()
            && self.impact.is_none()
    }
}

/// List filters and pagination, straight from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub department_id: Option<i64>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub priority: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemarkBody {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestInfoBody {
    pub comments: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvideInfoBody {
    pub comments: Option<String>,
}
