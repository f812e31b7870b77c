use sqlx::{Acquire, PgPool, Postgres, Transaction};

use crate::errors::AppError;

/// Provisioned identity row as this service sees it. Credentials live with
/// the external identity provider; only the fields the engine needs are here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
    pub is_active: bool,
    pub department_id: Option<i64>,
    pub permissions: String,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRef>, AppError> {
    let row = sqlx::query_as::<_, UserRef>(
        "SELECT id, username, is_active, department_id, permissions
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Find a user only if they are active and belong to the given department.
/// Used to validate expert assignment targets.
pub async fn find_active_in_department(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    department_id: i64,
) -> Result<Option<UserRef>, AppError> {
    let row = sqlx::query_as::<_, UserRef>(
        "SELECT id, username, is_active, department_id, permissions
         FROM users
         WHERE id = $1 AND is_active AND department_id = $2",
    )
    .bind(user_id)
    .bind(department_id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}
