//! Integration tests for the side branches of the status graph: the
//! additional-information detour and interdepartmental communications,
//! both of which must return the request to its pre-branch status.

mod common;

use common::{
    category_id, history_actions, request_status, request_version, seed_caller,
    seed_department, setup_test_db, test_store,
};
use diwan::auth::Caller;
use diwan::errors::AppError;
use diwan::models::assignment::AssignRequestBody;
use diwan::models::communication::{RespondCommunicationBody, SendCommunicationBody};
use diwan::models::request::{CreateRequestBody, ProvideInfoBody, RequestInfoBody};
use diwan::storage::FileStore;
use diwan::workflow;
use sqlx::PgPool;

async fn assigned_request(
    pool: &PgPool,
    store: &FileStore,
    requester: &Caller,
    assigner: &Caller,
    dept: i64,
    title: &str,
) -> i64 {
    let category = category_id(pool, "administrative").await;
    let id = workflow::requests::create(
        pool,
        store,
        requester,
        &CreateRequestBody {
            title: title.to_string(),
            description: "d".to_string(),
            department_id: dept,
            category_id: category,
            subcategory_id: None,
            priority: Some("medium".to_string()),
            due_date: None,
            statement: None,
            risks: None,
            impact: None,
            documents: None,
        },
    )
    .await
    .unwrap();
    workflow::assignments::assign(
        pool,
        assigner,
        id,
        &AssignRequestBody {
            department_id: dept,
            expert_id: None,
            due_date: None,
            is_primary: true,
            remarks: None,
        },
    )
    .await
    .unwrap();
    id
}

#[tokio::test]
async fn test_info_branch_returns_to_pre_branch_status() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();

    let dept = seed_department(pool, "info").await;
    let requester = seed_caller(pool, "info_req", Some(dept), "requests.create").await;
    let assigner = seed_caller(pool, "info_asg", Some(dept), "requests.assign").await;

    let id = assigned_request(pool, &store, &requester, &assigner, dept, "Info detour").await;
    assert_eq!(request_status(pool, id).await, "assigned_to_department");

    workflow::requests::request_info(
        pool,
        &assigner,
        id,
        &RequestInfoBody { comments: "Which fiscal year?".to_string() },
    )
    .await
    .expect("request info");
    assert_eq!(request_status(pool, id).await, "additional_info_requested");

    // Asking again while already parked is an InvalidState.
    let err = workflow::requests::request_info(
        pool,
        &assigner,
        id,
        &RequestInfoBody { comments: "again".to_string() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    workflow::requests::provide_info(
        pool,
        &requester,
        id,
        &ProvideInfoBody { comments: Some("FY 2026".to_string()) },
    )
    .await
    .expect("provide info");
    assert_eq!(
        request_status(pool, id).await,
        "assigned_to_department",
        "request must return exactly where it was"
    );
    assert_eq!(request_version(pool, id).await, 4);
    assert_eq!(
        history_actions(pool, id).await,
        vec!["created", "assigned", "info_requested", "info_provided"]
    );
}

#[tokio::test]
async fn test_provide_info_outside_the_branch_fails() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();

    let dept = seed_department(pool, "infx").await;
    let requester = seed_caller(pool, "infx_req", Some(dept), "requests.create").await;
    let assigner = seed_caller(pool, "infx_asg", Some(dept), "requests.assign").await;

    let id = assigned_request(pool, &store, &requester, &assigner, dept, "No detour").await;
    let err = workflow::requests::provide_info(
        pool,
        &requester,
        id,
        &ProvideInfoBody { comments: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "expected InvalidState, got {err}");
}

#[tokio::test]
async fn test_communication_with_response_parks_and_restores() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();

    let home = seed_department(pool, "comm_a").await;
    let other = seed_department(pool, "comm_b").await;
    let requester = seed_caller(pool, "comm_req", Some(home), "requests.create").await;
    let assigner = seed_caller(pool, "comm_asg", Some(home), "requests.assign").await;
    let colleague = seed_caller(pool, "comm_col", Some(other), "").await;

    let id = assigned_request(pool, &store, &requester, &assigner, home, "Cross question").await;

    let comm_id = workflow::communications::send(
        pool,
        &assigner,
        id,
        &SendCommunicationBody {
            to_department_id: other,
            subject: "Does this touch your remit?".to_string(),
            body: Some("See attached request.".to_string()),
            comm_type: None,
            priority: None,
            requires_response: true,
            due_date: None,
        },
    )
    .await
    .expect("send communication");
    assert_eq!(request_status(pool, id).await, "pending_other_department");

    // Someone from an uninvolved department cannot answer.
    let err = workflow::communications::respond(
        pool,
        &assigner,
        comm_id,
        &RespondCommunicationBody { body: "not mine to answer".to_string() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Permission(_)));

    let reply_id = workflow::communications::respond(
        pool,
        &colleague,
        comm_id,
        &RespondCommunicationBody { body: "No overlap with our remit.".to_string() },
    )
    .await
    .expect("respond");

    assert_eq!(
        request_status(pool, id).await,
        "assigned_to_department",
        "pre-branch status restored after the response"
    );

    let (status, parent): (String, Option<i64>) = sqlx::query_as(
        "SELECT status, parent_communication_id
         FROM interdepartmental_communications WHERE id = $1",
    )
    .bind(reply_id)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(status, "sent");
    assert_eq!(parent, Some(comm_id), "reply threads through the parent");

    let (parent_status,): (String,) = sqlx::query_as(
        "SELECT status FROM interdepartmental_communications WHERE id = $1",
    )
    .bind(comm_id)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(parent_status, "responded");

    // A second response to the same communication is an InvalidState.
    let err = workflow::communications::respond(
        pool,
        &colleague,
        comm_id,
        &RespondCommunicationBody { body: "again".to_string() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_park_lifts_only_after_every_question_is_answered() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();

    let home = seed_department(pool, "comm_two").await;
    let other = seed_department(pool, "comm_two_b").await;
    let third = seed_department(pool, "comm_two_c").await;
    let requester = seed_caller(pool, "comm_two_req", Some(home), "requests.create").await;
    let assigner = seed_caller(pool, "comm_two_asg", Some(home), "requests.assign").await;
    let colleague = seed_caller(pool, "comm_two_col", Some(other), "").await;
    let neighbour = seed_caller(pool, "comm_two_nbr", Some(third), "").await;

    let id = assigned_request(pool, &store, &requester, &assigner, home, "Two questions").await;

    let ask = |to: i64, subject: &str| SendCommunicationBody {
        to_department_id: to,
        subject: subject.to_string(),
        body: None,
        comm_type: None,
        priority: None,
        requires_response: true,
        due_date: None,
    };
    let first = workflow::communications::send(pool, &assigner, id, &ask(other, "Budget side?"))
        .await
        .unwrap();
    let second = workflow::communications::send(pool, &assigner, id, &ask(third, "Legal side?"))
        .await
        .unwrap();
    assert_eq!(request_status(pool, id).await, "pending_other_department");

    // Answering the first question leaves the request parked on the second.
    workflow::communications::respond(
        pool,
        &colleague,
        first,
        &RespondCommunicationBody { body: "Budget is unaffected.".to_string() },
    )
    .await
    .unwrap();
    assert_eq!(
        request_status(pool, id).await,
        "pending_other_department",
        "one question is still outstanding"
    );

    workflow::communications::respond(
        pool,
        &neighbour,
        second,
        &RespondCommunicationBody { body: "No legal concerns.".to_string() },
    )
    .await
    .unwrap();
    assert_eq!(
        request_status(pool, id).await,
        "assigned_to_department",
        "last answer restores the pre-branch status"
    );
}

#[tokio::test]
async fn test_communication_to_own_department_is_rejected() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();

    let dept = seed_department(pool, "comm_own").await;
    let requester = seed_caller(pool, "comm_own_req", Some(dept), "requests.create").await;
    let assigner = seed_caller(pool, "comm_own_asg", Some(dept), "requests.assign").await;

    let id = assigned_request(pool, &store, &requester, &assigner, dept, "Self talk").await;
    let err = workflow::communications::send(
        pool,
        &assigner,
        id,
        &SendCommunicationBody {
            to_department_id: dept,
            subject: "Note to self".to_string(),
            body: None,
            comm_type: None,
            priority: None,
            requires_response: false,
            due_date: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "expected Validation, got {err}");
}

#[tokio::test]
async fn test_communication_without_response_only_audits() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: no test database configured");
        return;
    };
    let pool = db.pool();
    let (_dir, store) = test_store();

    let home = seed_department(pool, "comm_fyi").await;
    let other = seed_department(pool, "comm_fyi2").await;
    let requester = seed_caller(pool, "comm_fyi_req", Some(home), "requests.create").await;
    let assigner = seed_caller(pool, "comm_fyi_asg", Some(home), "requests.assign").await;

    let id = assigned_request(pool, &store, &requester, &assigner, home, "FYI only").await;
    let before = request_status(pool, id).await;

    workflow::communications::send(
        pool,
        &assigner,
        id,
        &SendCommunicationBody {
            to_department_id: other,
            subject: "For your awareness".to_string(),
            body: None,
            comm_type: Some("notification".to_string()),
            priority: None,
            requires_response: false,
            due_date: None,
        },
    )
    .await
    .expect("send fyi");

    assert_eq!(request_status(pool, id).await, before, "status unchanged");
    assert_eq!(request_version(pool, id).await, 3, "but the version still moves");
    assert_eq!(
        history_actions(pool, id).await.last().map(String::as_str),
        Some("communication_sent")
    );
}
