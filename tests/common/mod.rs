//! Shared test infrastructure for workflow integration tests.
//!
//! Tests run against a real PostgreSQL database named by `TEST_DATABASE_URL`
//! (falling back to `DATABASE_URL`) and skip cleanly when neither is set.
//! The database is shared between tests, so every helper takes a suffix and
//! builds unique names from it.

#![allow(dead_code)]

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;

use diwan::auth::{Caller, Permissions};
use diwan::storage::FileStore;

pub struct TestDb {
    pool: PgPool,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Connect to the test database and bring the schema up to date. Returns
/// None when no database is configured; callers print a notice and return.
pub async fn setup_test_db() -> Option<TestDb> {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(TestDb { pool })
}

/// A fresh upload directory. Keep the TempDir alive for as long as the
/// store is used.
pub fn test_store() -> (TempDir, FileStore) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = FileStore::new(dir.path());
    (dir, store)
}

/// Suffix extended with a random tag, so reruns against the same shared
/// database never trip the unique constraints on seeded names.
pub fn unique(suffix: &str) -> String {
    use rand::Rng;
    let tag: u32 = rand::rng().random();
    format!("{suffix}_{tag:08x}")
}

pub async fn seed_department(pool: &PgPool, suffix: &str) -> i64 {
    let name = unique(suffix);
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO departments (name, code) VALUES ($1, $2) RETURNING id",
    )
    .bind(format!("Department {name}"))
    .bind(format!("D-{name}"))
    .fetch_one(pool)
    .await
    .expect("Failed to seed department");

    id
}

/// Seed a user row and hand back the Caller the extractor would build for
/// it, so engine functions can be exercised directly.
pub async fn seed_caller(
    pool: &PgPool,
    suffix: &str,
    department_id: Option<i64>,
    permissions: &str,
) -> Caller {
    let username = format!("user_{}", unique(suffix));
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (username, email, department_id, permissions)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&username)
    .bind(format!("{username}@test.example"))
    .bind(department_id)
    .bind(permissions)
    .fetch_one(pool)
    .await
    .expect("Failed to seed user");

    Caller {
        id,
        username,
        department_id,
        permissions: Permissions::from_csv(permissions),
    }
}

pub async fn deactivate_user(pool: &PgPool, user_id: i64) {
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Failed to deactivate user");
}

/// Id of a category seeded by the initial migration.
pub async fn category_id(pool: &PgPool, name: &str) -> i64 {
    let (id,): (i64,) =
        sqlx::query_as("SELECT id FROM request_categories WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("Seeded category missing");

    id
}

pub async fn subcategory_id(pool: &PgPool, name: &str) -> i64 {
    let (id,): (i64,) =
        sqlx::query_as("SELECT id FROM request_subcategories WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("Seeded subcategory missing");

    id
}

pub async fn request_version(pool: &PgPool, request_id: i64) -> i64 {
    let (version,): (i64,) =
        sqlx::query_as("SELECT version FROM opinion_requests WHERE id = $1")
            .bind(request_id)
            .fetch_one(pool)
            .await
            .expect("Request row missing");

    version
}

pub async fn request_status(pool: &PgPool, request_id: i64) -> String {
    let (name,): (String,) = sqlx::query_as(
        "SELECT s.name FROM opinion_requests r
         JOIN workflow_status s ON s.id = r.current_status_id
         WHERE r.id = $1",
    )
    .bind(request_id)
    .fetch_one(pool)
    .await
    .expect("Request row missing");

    name
}

/// Action types of the request's audit trail, oldest first.
pub async fn history_actions(pool: &PgPool, request_id: i64) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT action_type FROM workflow_history
         WHERE opinion_request_id = $1
         ORDER BY created_at ASC, id ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await
    .expect("Failed to read history");

    rows.into_iter().map(|r| r.0).collect()
}

/// To-status names of the request's audit trail, oldest first.
pub async fn history_statuses(pool: &PgPool, request_id: i64) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT s.name FROM workflow_history h
         JOIN workflow_status s ON s.id = h.to_status_id
         WHERE h.opinion_request_id = $1
         ORDER BY h.created_at ASC, h.id ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await
    .expect("Failed to read history");

    rows.into_iter().map(|r| r.0).collect()
}

pub fn base64_of(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
