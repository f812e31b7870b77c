use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// JSON error body returned by every failing endpoint.
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    NotFound(String),
    Validation(String),
    Permission(String),
    InvalidState(String),
    Dependency(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::NotFound(what) => write!(f, "Not found: {what}"),
            AppError::Validation(msg) => write!(f, "Validation failed: {msg}"),
            AppError::Permission(msg) => write!(f, "Permission denied: {msg}"),
            AppError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            AppError::Dependency(msg) => write!(f, "Dependency failure: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound(what) => HttpResponse::NotFound().json(ApiErrorResponse {
                error: "Not found".to_string(),
                details: Some(what.clone()),
            }),
            AppError::Validation(msg) => HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(msg.clone()),
            }),
            AppError::Permission(msg) => HttpResponse::Forbidden().json(ApiErrorResponse {
                error: "Permission denied".to_string(),
                details: Some(msg.clone()),
            }),
            AppError::InvalidState(msg) => HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Invalid state".to_string(),
                details: Some(msg.clone()),
            }),
            // Internal failures are logged with full detail and answered generically.
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError().json(ApiErrorResponse {
                    error: "Internal server error".to_string(),
                    details: None,
                })
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}
