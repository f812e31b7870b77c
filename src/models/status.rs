use sqlx::{Acquire, Postgres, Transaction};

use crate::errors::AppError;

/// A seeded workflow status. The set is fixed at migration time; every
/// transition resolves its target through this registry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Status {
    pub id: i64,
    pub name: String,
}

/// Resolve a status by its seeded name. A miss means the database seed is
/// incomplete, which is fatal configuration, not recoverable input.
pub async fn find_by_name(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> Result<Status, AppError> {
    sqlx::query_as::<_, Status>("SELECT id, name FROM workflow_status WHERE name = $1")
        .bind(name)
        .fetch_optional(tx.acquire().await?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("workflow status '{name}' is not seeded")))
}

pub async fn find_by_id(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Status, AppError> {
    sqlx::query_as::<_, Status>("SELECT id, name FROM workflow_status WHERE id = $1")
        .bind(id)
        .fetch_optional(tx.acquire().await?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("workflow status {id}")))
}
