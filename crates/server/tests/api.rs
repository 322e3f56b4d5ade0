use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn test_router() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(engine::Engine::builder().database(db).build());
    server::router(server::ServerState { engine })
}

async fn request(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn deposit_withdraw_roundtrip() {
    let router = test_router().await;

    let (status, account) = request(
        &router,
        Method::POST,
        "/accounts",
        Some(json!({"name": "Ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = account["id"].as_str().unwrap().to_string();

    let (status, tx) = request(
        &router,
        Method::POST,
        &format!("/accounts/{id}/deposit"),
        Some(json!({"amount": "50.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["kind"], "deposit");
    assert_eq!(tx["amount_cents"], 5000);
    assert_eq!(tx["balance_after_cents"], 5000);

    let (status, tx) = request(
        &router,
        Method::POST,
        &format!("/accounts/{id}/withdraw"),
        Some(json!({"amount": "20.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["kind"], "withdrawal");
    assert_eq!(tx["balance_after_cents"], 3000);

    let (status, body) = request(
        &router,
        Method::POST,
        &format!("/accounts/{id}/withdraw"),
        Some(json!({"amount": "31.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Insufficient"));

    let (status, detail) =
        request(&router, Method::GET, &format!("/accounts/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["account"]["balance_cents"], 3000);
    assert_eq!(detail["transactions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_account_is_404() {
    let router = test_router().await;

    let (status, _) = request(
        &router,
        Method::POST,
        "/accounts/00000000-0000-0000-0000-000000000000/deposit",
        Some(json!({"amount": "1.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_amounts_are_422() {
    let router = test_router().await;

    let (_, account) = request(
        &router,
        Method::POST,
        "/accounts",
        Some(json!({"name": "Ada"})),
    )
    .await;
    let id = account["id"].as_str().unwrap().to_string();

    for amount in ["0.005", "-5", "0", "ten"] {
        let (status, _) = request(
            &router,
            Method::POST,
            &format!("/accounts/{id}/deposit"),
            Some(json!({"amount": amount})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "amount {amount}");
    }
}

#[tokio::test]
async fn interest_rate_update_converts_percent() {
    let router = test_router().await;

    let (_, account) = request(
        &router,
        Method::POST,
        "/accounts",
        Some(json!({"name": "Ada"})),
    )
    .await;
    let id = account["id"].as_str().unwrap().to_string();

    let (status, account) = request(
        &router,
        Method::PUT,
        &format!("/accounts/{id}/interest-rate"),
        Some(json!({"rate_percent": 5.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["interest_rate"], 0.05);

    let (status, _) = request(
        &router,
        Method::PUT,
        &format!("/accounts/{id}/interest-rate"),
        Some(json!({"rate_percent": -1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn empty_account_name_is_400() {
    let router = test_router().await;

    let (status, _) = request(
        &router,
        Method::POST,
        "/accounts",
        Some(json!({"name": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
