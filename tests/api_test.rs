//! Handler-level tests over the actix service: identity extraction, the
//! JSON content-type guard on mutating routes, and the page-size ceiling.

mod common;

use actix_web::{App, test, web};
use common::{deactivate_user, seed_caller, seed_department, setup_test_db, test_store};
use diwan::handlers;

macro_rules! service {
    ($pool:expr, $store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new($store.clone()))
                .route("/health", web::get().to(handlers::health))
                .service(web::scope("/api/v1").configure(handlers::configure)),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_health_endpoint_reports_database() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let (_dir, store) = test_store();
    let app = service!(db.pool(), store);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "reachable");
}

#[actix_rt::test]
async fn test_requests_without_identity_header_are_forbidden() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let (_dir, store) = test_store();
    let app = service!(db.pool(), store);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/requests").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);
}

#[actix_rt::test]
async fn test_deactivated_user_is_forbidden() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();
    let app = service!(pool, store);

    let dept = seed_department(pool, "api_deact").await;
    let caller = seed_caller(pool, "api_deact", Some(dept), "").await;
    deactivate_user(pool, caller.id).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/requests")
            .insert_header(("x-user-id", caller.id.to_string()))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);
}

#[actix_rt::test]
async fn test_list_clamps_page_size_to_100() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();
    let app = service!(pool, store);

    let dept = seed_department(pool, "api_clamp").await;
    let caller = seed_caller(pool, "api_clamp", Some(dept), "").await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/requests?limit=500")
            .insert_header(("x-user-id", caller.id.to_string()))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["limit"], 100, "limit is clamped to the hard ceiling");
}

#[actix_rt::test]
async fn test_mutating_route_requires_json_content_type() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();
    let app = service!(pool, store);

    let dept = seed_department(pool, "api_ct").await;
    let caller = seed_caller(pool, "api_ct", Some(dept), "requests.create").await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/requests")
            .insert_header(("x-user-id", caller.id.to_string()))
            .insert_header(("content-type", "text/plain"))
            .set_payload("title=nope")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400, "non-JSON mutation is rejected by the guard");
}

#[actix_rt::test]
async fn test_unknown_request_is_not_found() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();
    let app = service!(pool, store);

    let dept = seed_department(pool, "api_404").await;
    let caller = seed_caller(pool, "api_404", Some(dept), "").await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/requests/999999999")
            .insert_header(("x-user-id", caller.id.to_string()))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Not found");
}
