use sqlx::{Acquire, Postgres, Transaction};

use crate::errors::AppError;

pub async fn exists(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM request_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(tx.acquire().await?)
            .await?;

    Ok(row.is_some())
}

/// The parent category of a subcategory, or None if the subcategory is unknown.
pub async fn parent_of_subcategory(
    tx: &mut Transaction<'_, Postgres>,
    subcategory_id: i64,
) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT category_id FROM request_subcategories WHERE id = $1")
            .bind(subcategory_id)
            .fetch_optional(tx.acquire().await?)
            .await?;

    Ok(row.map(|r| r.0))
}

/// Validate a category/subcategory pairing: the category must exist and the
/// subcategory, when given, must belong to it.
pub async fn validate_pairing(
    tx: &mut Transaction<'_, Postgres>,
    category_id: i64,
    subcategory_id: Option<i64>,
) -> Result<(), AppError> {
    if !exists(tx, category_id).await? {
        return Err(AppError::Validation(format!("category {category_id} does not exist")));
    }
    if let Some(sub_id) = subcategory_id {
        match parent_of_subcategory(tx, sub_id).await? {
            Some(parent) if parent == category_id => {}
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "subcategory {sub_id} does not belong to category {category_id}"
                )));
            }
            None => {
                return Err(AppError::Validation(format!("subcategory {sub_id} does not exist")));
            }
        }
    }
    Ok(())
}
