use std::future::Future;
use std::pin::Pin;

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::user;

/// Wrapper around permission codes with a `has()` method.
#[derive(Debug, Clone, Default)]
pub struct Permissions(pub Vec<String>);

impl Permissions {
    pub fn has(&self, code: &str) -> bool {
        self.0.iter().any(|p| p == code)
    }

    pub fn from_csv(csv: &str) -> Self {
        let codes = csv
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Permissions(codes)
    }
}

/// The authenticated caller of a request.
///
/// The gateway in front of this service validates credentials and forwards
/// the caller's user id in the `x-user-id` header; the extractor loads the
/// provisioned user row and refuses unknown or deactivated users. No
/// credential checking happens here.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: i64,
    pub username: String,
    pub department_id: Option<i64>,
    pub permissions: Permissions,
}

impl Caller {
    /// Check permission; returns Err(AppError) if denied.
    pub fn require(&self, code: &str) -> Result<(), AppError> {
        if self.permissions.has(code) {
            Ok(())
        } else {
            Err(AppError::Permission(format!("missing permission '{code}'")))
        }
    }
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Caller, AppError>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = req.app_data::<web::Data<PgPool>>().cloned();
        let header = req
            .headers()
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Box::pin(async move {
            let pool =
                pool.ok_or_else(|| AppError::Dependency("database pool not configured".to_string()))?;
            let raw = header
                .ok_or_else(|| AppError::Permission("missing x-user-id header".to_string()))?;
            let user_id: i64 = raw
                .parse()
                .map_err(|_| AppError::Permission("malformed x-user-id header".to_string()))?;

            let user = user::find_by_id(&pool, user_id)
                .await?
                .ok_or_else(|| AppError::Permission(format!("unknown user {user_id}")))?;
            if !user.is_active {
                return Err(AppError::Permission(format!("user {} is deactivated", user.username)));
            }

            Ok(Caller {
                id: user.id,
                username: user.username,
                department_id: user.department_id,
                permissions: Permissions::from_csv(&user.permissions),
            })
        })
    }
}
