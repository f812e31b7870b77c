use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One file carried inline in a JSON request body, base64-encoded.
#[derive(Debug, Deserialize)]
pub struct InlineFile {
    pub file_name: String,
    pub content_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadDocumentsBody {
    pub files: Vec<InlineFile>,
    pub remarks: Option<String>,
}

/// Document metadata as returned to API clients. The stored file itself is
/// served by the download endpoint, never inlined in responses.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DocumentView {
    pub id: i64,
    pub opinion_request_id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub uploaded_by: i64,
    pub uploaded_by_name: String,
    pub created_at: DateTime<Utc>,
}
