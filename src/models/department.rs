use serde::Serialize;
use sqlx::{Acquire, Postgres, Transaction};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub code: String,
}

pub async fn find_by_id(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Department>, AppError> {
    let row = sqlx::query_as::<_, Department>(
        "SELECT id, name, code FROM departments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}
