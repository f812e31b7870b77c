use sqlx::{Acquire, PgPool, Postgres, QueryBuilder, Transaction};

use super::types::*;
use crate::errors::AppError;

/// Working row loaded (and locked) by engine operations.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestRow {
    pub id: i64,
    pub reference_number: String,
    pub requester_id: i64,
    pub department_id: i64,
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    pub priority: String,
    pub current_status_id: i64,
    pub status: String,
    pub version: i64,
}

pub struct NewRequest<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub requester_id: i64,
    pub department_id: i64,
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    pub priority: &'a str,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub statement: Option<&'a str>,
    pub risks: Option<&'a str>,
    pub impact: Option<&'a str>,
}

/// Load the request row under a row lock, serializing every mutating
/// operation on the same request for the rest of the transaction.
/// Soft-deleted requests are invisible here.
pub async fn lock_row(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<RequestRow>, AppError> {
    let row = sqlx::query_as::<_, RequestRow>(
        "SELECT r.id, r.reference_number, r.requester_id, r.department_id,
                r.category_id, r.subcategory_id, r.priority, r.current_status_id,
                (SELECT name FROM workflow_status WHERE id = r.current_status_id) AS status,
                r.version
         FROM opinion_requests r
         WHERE r.id = $1 AND r.is_deleted = FALSE
         FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row)
}

/// Insert a new request with the given reference number. Returns None when
/// the reference collides with an existing one, so the caller can retry
/// with a fresh candidate.
pub async fn insert_new(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewRequest<'_>,
    reference_number: &str,
    status_id: i64,
) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO opinion_requests
             (reference_number, title, description, requester_id, department_id,
              category_id, subcategory_id, priority, current_status_id, due_date,
              statement, risks, impact)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         ON CONFLICT (reference_number) DO NOTHING
         RETURNING id",
    )
    .bind(reference_number)
    .bind(new.title)
    .bind(new.description)
    .bind(new.requester_id)
    .bind(new.department_id)
    .bind(new.category_id)
    .bind(new.subcategory_id)
    .bind(new.priority)
    .bind(status_id)
    .bind(new.due_date)
    .bind(new.statement)
    .bind(new.risks)
    .bind(new.impact)
    .fetch_optional(tx.acquire().await?)
    .await?;

    Ok(row.map(|r| r.0))
}

/// Move the request to a new status. Every status change is also a version
/// bump; the two never happen separately.
pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    status_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE opinion_requests
         SET current_status_id = $2, version = version + 1, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(status_id)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

/// Version bump for mutations that leave the status unchanged
/// (reassignment, remarks, document changes).
pub async fn bump_version(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE opinion_requests SET version = version + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

/// Apply the present fields of a patch in one UPDATE, bumping the version.
/// Returns the names of the changed columns for the audit entry. Null
/// handling is the caller's concern; by the time a patch reaches here every
/// present field is legal to write.
pub async fn apply_patch(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    patch: &UpdateRequestBody,
) -> Result<Vec<&'static str>, AppError> {
    let mut changed: Vec<&'static str> = Vec::new();
    let mut qb: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("UPDATE opinion_requests SET version = version + 1, updated_at = NOW()");

    if let Some(v) = &patch.title {
        qb.push(", title = ");
        qb.push_bind(v.clone());
        changed.push("title");
    }
    if let Some(v) = &patch.description {
        qb.push(", description = ");
        qb.push_bind(v.clone());
        changed.push("description");
    }
    if let Some(v) = &patch.priority {
        qb.push(", priority = ");
        qb.push_bind(v.clone());
        changed.push("priority");
    }
    if let Some(v) = &patch.category_id {
        qb.push(", category_id = ");
        qb.push_bind(*v);
        changed.push("category_id");
    }
    if let Some(v) = &patch.subcategory_id {
        qb.push(", subcategory_id = ");
        qb.push_bind(*v);
        changed.push("subcategory_id");
    }
    if let Some(v) = &patch.due_date {
        qb.push(", due_date = ");
        qb.push_bind(*v);
        changed.push("due_date");
    }
    if let Some(v) = &patch.statement {
        qb.push(", statement = ");
        qb.push_bind(v.clone());
        changed.push("statement");
    }
    if let Some(v) = &patch.risks {
        qb.push(", risks = ");
        qb.push_bind(v.clone());
        changed.push("risks");
    }
    if let Some(v) = &patch.impact {
        qb.push(", impact = ");
        qb.push_bind(v.clone());
        changed.push("impact");
    }

    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb.build().execute(tx.acquire().await?).await?;

    Ok(changed)
}

pub async fn mark_deleted(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    deleted_by: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE opinion_requests
         SET is_deleted = TRUE, deleted_by = $2, deleted_at = NOW(),
             version = version + 1, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(deleted_by)
    .execute(tx.acquire().await?)
    .await?;

    Ok(())
}

/// Cheap existence probe for pre-checks that run before any disk write.
pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM opinion_requests WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub async fn find_detail(pool: &PgPool, id: i64) -> Result<Option<RequestDetail>, AppError> {
    let row = sqlx::query_as::<_, RequestDetail>(
        "SELECT r.id, r.reference_number, r.title, r.description,
                r.requester_id, u.username AS requester_name,
                r.department_id, d.name AS department_name,
                r.category_id, c.name AS category_name,
                r.subcategory_id, sc.name AS subcategory_name,
                r.priority, s.name AS status,
                r.due_date, r.version, r.statement, r.risks, r.impact,
                r.created_at, r.updated_at
         FROM opinion_requests r
         JOIN users u ON u.id = r.requester_id
         JOIN departments d ON d.id = r.department_id
         JOIN request_categories c ON c.id = r.category_id
         LEFT JOIN request_subcategories sc ON sc.id = r.subcategory_id
         JOIN workflow_status s ON s.id = r.current_status_id
         WHERE r.id = $1 AND r.is_deleted = FALSE",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

fn apply_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, q: &'a RequestListQuery) {
    qb.push(" WHERE r.is_deleted = FALSE");
    if let Some(status) = q.status.as_deref() {
        qb.push(" AND s.name = ");
        qb.push_bind(status);
    }
    if let Some(dept) = q.department_id {
        qb.push(" AND r.department_id = ");
        qb.push_bind(dept);
    }
    if let Some(cat) = q.category_id {
        qb.push(" AND r.category_id = ");
        qb.push_bind(cat);
    }
    if let Some(sub) = q.subcategory_id {
        qb.push(" AND r.subcategory_id = ");
        qb.push_bind(sub);
    }
    if let Some(priority) = q.priority.as_deref() {
        qb.push(" AND r.priority = ");
        qb.push_bind(priority);
    }
    if let Some(from) = q.created_from {
        qb.push(" AND r.created_at >= ");
        qb.push_bind(from);
    }
    if let Some(to) = q.created_to {
        qb.push(" AND r.created_at <= ");
        qb.push_bind(to);
    }
}

/// Filtered, paginated listing, newest first. Returns the page and the
/// total matching count.
pub async fn find_list(
    pool: &PgPool,
    q: &RequestListQuery,
    skip: i64,
    limit: i64,
) -> Result<(Vec<RequestListItem>, i64), AppError> {
    let mut count_qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "SELECT COUNT(*)
         FROM opinion_requests r
         JOIN workflow_status s ON s.id = r.current_status_id",
    );
    apply_filters(&mut count_qb, q);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "SELECT r.id, r.reference_number, r.title,
                r.department_id, d.name AS department_name,
                r.category_id, r.priority, s.name AS status, r.version,
                r.due_date, r.created_at, r.updated_at
         FROM opinion_requests r
         JOIN departments d ON d.id = r.department_id
         JOIN workflow_status s ON s.id = r.current_status_id",
    );
    apply_filters(&mut qb, q);
    qb.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(skip);

    let items = qb.build_query_as::<RequestListItem>().fetch_all(pool).await?;

    Ok((items, total))
}
