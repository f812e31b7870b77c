//! Integration tests for document upload, download metadata, and deletion:
//! allow-list validation, all-or-nothing batches, and uploader permissions.

mod common;

use common::{
    base64_of, category_id, history_actions, request_version, seed_caller, seed_department,
    setup_test_db, test_store,
};
use diwan::errors::AppError;
use diwan::models::document::{InlineFile, UploadDocumentsBody};
use diwan::models::request::CreateRequestBody;
use diwan::storage::MAX_FILE_SIZE;
use diwan::workflow;
use sqlx::PgPool;

fn inline(file_name: &str, bytes: &[u8]) -> InlineFile {
    InlineFile { file_name: file_name.to_string(), content_base64: base64_of(bytes) }
}

async fn document_count(pool: &PgPool, request_id: i64) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM documents WHERE opinion_request_id = $1")
            .bind(request_id)
            .fetch_one(pool)
            .await
            .unwrap();
    count
}

#[tokio::test]
async fn test_batch_with_disallowed_file_persists_nothing() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (dir, store) = test_store();
    store.init().await.unwrap();

    let dept = seed_department(pool, "docx").await;
    let requester = seed_caller(pool, "docx_req", Some(dept), "requests.create").await;
    let category = category_id(pool, "technical").await;

    let id = workflow::requests::create(
        pool,
        &store,
        &requester,
        &CreateRequestBody {
            title: "Batch rejection".to_string(),
            description: "d".to_string(),
            department_id: dept,
            category_id: category,
            subcategory_id: None,
            priority: None,
            due_date: None,
            statement: None,
            risks: None,
            impact: None,
            documents: None,
        },
    )
    .await
    .unwrap();
    let version_before = request_version(pool, id).await;

    let body = UploadDocumentsBody {
        files: vec![inline("report.pdf", b"fine"), inline("malware.exe", b"nope")],
        remarks: None,
    };
    let err = workflow::documents::upload(pool, &store, &requester, id, &body)
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::Validation(ref msg) if msg.contains("malware.exe")),
        "error must name the offending file, got {err}"
    );

    assert_eq!(document_count(pool, id).await, 0, "whole batch rejected");
    assert_eq!(request_version(pool, id).await, version_before, "no version bump");
    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        0,
        "no file may reach disk when validation fails"
    );
}

#[tokio::test]
async fn test_oversized_file_is_rejected() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();
    store.init().await.unwrap();

    let dept = seed_department(pool, "docsz").await;
    let requester = seed_caller(pool, "docsz_req", Some(dept), "requests.create").await;
    let category = category_id(pool, "technical").await;

    let id = workflow::requests::create(
        pool,
        &store,
        &requester,
        &CreateRequestBody {
            title: "Oversize".to_string(),
            description: "d".to_string(),
            department_id: dept,
            category_id: category,
            subcategory_id: None,
            priority: None,
            due_date: None,
            statement: None,
            risks: None,
            impact: None,
            documents: None,
        },
    )
    .await
    .unwrap();

    let body = UploadDocumentsBody {
        files: vec![inline("huge.pdf", &vec![0u8; MAX_FILE_SIZE + 1])],
        remarks: None,
    };
    let err = workflow::documents::upload(pool, &store, &requester, id, &body)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("huge.pdf")));
    assert_eq!(document_count(pool, id).await, 0);
}

#[tokio::test]
async fn test_upload_batch_and_delete_discipline() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();
    store.init().await.unwrap();

    let dept = seed_department(pool, "docb").await;
    let requester = seed_caller(pool, "docb_req", Some(dept), "requests.create").await;
    let bystander = seed_caller(pool, "docb_byst", Some(dept), "").await;
    let manager = seed_caller(pool, "docb_mgr", Some(dept), "documents.manage").await;
    let category = category_id(pool, "financial").await;

    let id = workflow::requests::create(
        pool,
        &store,
        &requester,
        &CreateRequestBody {
            title: "Upload batch".to_string(),
            description: "d".to_string(),
            department_id: dept,
            category_id: category,
            subcategory_id: None,
            priority: None,
            due_date: None,
            statement: None,
            risks: None,
            impact: None,
            documents: None,
        },
    )
    .await
    .unwrap();

    let body = UploadDocumentsBody {
        files: vec![inline("budget.xlsx", b"numbers"), inline("summary.pdf", b"words")],
        remarks: Some("Q3 figures".to_string()),
    };
    let ids = workflow::documents::upload(pool, &store, &requester, id, &body)
        .await
        .expect("upload batch");
    assert_eq!(ids.len(), 2);
    assert_eq!(document_count(pool, id).await, 2);
    assert_eq!(request_version(pool, id).await, 2, "one bump for the whole batch");
    assert_eq!(
        history_actions(pool, id).await,
        vec!["created", "documents_uploaded"],
        "one history row for the whole batch"
    );

    let (stored_name,): (String,) =
        sqlx::query_as("SELECT stored_name FROM documents WHERE id = $1")
            .bind(ids[0])
            .fetch_one(pool)
            .await
            .unwrap();
    assert!(store.path_of(&stored_name).exists(), "bytes must be on disk after commit");

    // A third party may not delete someone else's upload.
    let err = workflow::documents::remove(pool, &store, &bystander, ids[0]).await.unwrap_err();
    assert!(matches!(err, AppError::Permission(_)));

    // The uploader can; so can a caller with documents.manage.
    workflow::documents::remove(pool, &store, &requester, ids[0]).await.expect("uploader delete");
    assert!(!store.path_of(&stored_name).exists(), "file removed after delete");
    workflow::documents::remove(pool, &store, &manager, ids[1]).await.expect("manager delete");

    assert_eq!(document_count(pool, id).await, 0);
    assert_eq!(request_version(pool, id).await, 4);
    assert_eq!(history_actions(pool, id).await.last().map(String::as_str), Some("document_deleted"));
}

#[tokio::test]
async fn test_create_request_with_inline_documents() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();
    store.init().await.unwrap();

    let dept = seed_department(pool, "doci").await;
    let requester = seed_caller(pool, "doci_req", Some(dept), "requests.create").await;
    let category = category_id(pool, "legal").await;

    let id = workflow::requests::create(
        pool,
        &store,
        &requester,
        &CreateRequestBody {
            title: "With attachments".to_string(),
            description: "d".to_string(),
            department_id: dept,
            category_id: category,
            subcategory_id: None,
            priority: None,
            due_date: None,
            statement: None,
            risks: None,
            impact: None,
            documents: Some(vec![inline("contract.docx", b"terms")]),
        },
    )
    .await
    .expect("create with attachment");

    assert_eq!(document_count(pool, id).await, 1);
    assert_eq!(request_version(pool, id).await, 1, "attachments ride on the creation version");

    let (file_type,): (String,) = sqlx::query_as(
        "SELECT file_type FROM documents WHERE opinion_request_id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(file_type, "docx");
}
