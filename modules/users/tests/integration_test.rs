//! Integration-style tests for the users module.
//!
//! Every test runs on a fresh in-memory SQLite DB with the `users` table created
//! from the entity, and drives the real routes through `tower::ServiceExt::oneshot`.

use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use users::{
    api::rest::{dto::UserDto, error::ErrorBody, response::Envelope},
    build_router,
    infra::storage::schema::create_table_if_missing,
    UsersConfig,
};

async fn create_test_db() -> DatabaseConnection {
    // a single connection keeps the in-memory database alive and shared
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");
    create_table_if_missing(&db)
        .await
        .expect("Failed to create users table");
    db
}

async fn create_test_router() -> Router {
    build_router(create_test_db().await, UsersConfig::default())
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn new_user(first: &str, last: &str) -> Value {
    json!({
        "first_name": first,
        "last_name": last,
        "email": format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        "phone": "+14155552671",
    })
}

async fn create(router: &Router, first: &str, last: &str) -> UserDto {
    let (status, body) = send(router, "POST", "/users", Some(new_user(first, last))).await;
    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    let env: Envelope<UserDto> = serde_json::from_value(body).unwrap();
    // created_at has sub-second precision; keep creations strictly ordered
    tokio::time::sleep(Duration::from_millis(5)).await;
    env.data
}

fn error_of(body: Value) -> String {
    serde_json::from_value::<ErrorBody>(body).unwrap().error
}

#[tokio::test]
async fn create_then_get_round_trips() -> Result<()> {
    let router = create_test_router().await;

    let created = create(&router, "John", "Doe").await;
    assert_eq!(created.first_name, "John");
    assert_eq!(created.last_name, "Doe");
    assert_eq!(created.email, "john.doe@example.com");
    assert_eq!(created.phone, "+14155552671");
    assert_ne!(created.id, Uuid::nil());

    let (status, body) = send(&router, "GET", &format!("/users/{}", created.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("meta").is_none());
    let fetched: Envelope<UserDto> = serde_json::from_value(body)?;
    assert_eq!(fetched.data, created);
    Ok(())
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let router = create_test_router().await;

    for phone in ["12345", "+12", "+123456"] {
        let mut bad_phone = new_user("Ann", "Lee");
        bad_phone["phone"] = json!(phone);
        let (status, body) = send(&router, "POST", "/users", Some(bad_phone)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "phone {phone}");
        assert!(error_of(body).contains("phone"));
    }

    let mut bad_email = new_user("Ann", "Lee");
    bad_email["email"] = json!("not-an-email");
    let (status, body) = send(&router, "POST", "/users", Some(bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_of(body).contains("email"));

    let mut null_name = new_user("Ann", "Lee");
    null_name["first_name"] = Value::Null;
    let (status, body) = send(&router, "POST", "/users", Some(null_name)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_of(body).contains("first_name"));

    let (status, body) = send(&router, "POST", "/users", Some(json!({"first_name": "Ann"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_of(body).contains("last_name"));

    let request = Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let err: ErrorBody = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(err.error, "invalid JSON");

    // nothing was stored
    let (_, body) = send(&router, "GET", "/users", None).await;
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn create_accepts_json_without_content_type() -> Result<()> {
    let router = create_test_router().await;

    let request = Request::builder()
        .method("POST")
        .uri("/users")
        .body(Body::from(new_user("Ann", "Lee").to_string()))?;
    let response = router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let created: Envelope<UserDto> = serde_json::from_slice(&bytes)?;

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/users/{}", created.data.id))
        .header("content-type", "text/plain")
        .body(Body::from(r#"{"email":"ann@example.com","phone":"+442071838750"}"#))?;
    let response = router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let (_, body) = send(&router, "GET", &format!("/users/{}", created.data.id), None).await;
    assert_eq!(body["data"]["email"], "ann@example.com");
    Ok(())
}

#[tokio::test]
async fn get_unknown_and_malformed_ids() {
    let router = create_test_router().await;

    let (status, body) = send(&router, "GET", &format!("/users/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(body), "user not found");

    for uri in ["/users/not-a-uuid", "/users/%FF"] {
        let (status, body) = send(&router, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(error_of(body), "invalid UUID");
    }
}

#[tokio::test]
async fn list_pages_newest_first_with_meta() -> Result<()> {
    let router = create_test_router().await;
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(create(&router, &format!("User{i}"), "Smith").await.id);
    }

    let (status, body) = send(&router, "GET", "/users?limit=2&offset=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"], json!({"offset": 1, "limit": 2, "total": 5}));
    let page: Envelope<Vec<UserDto>> = serde_json::from_value(body)?;
    let got: Vec<Uuid> = page.data.iter().map(|u| u.id).collect();
    assert_eq!(got, vec![ids[3], ids[2]]);

    // defaults apply when paging is absent or junk
    let (_, body) = send(&router, "GET", "/users?limit=abc&offset=-3", None).await;
    assert_eq!(body["meta"], json!({"offset": 0, "limit": 10, "total": 5}));
    assert_eq!(body["data"].as_array().map(Vec::len), Some(5));

    // a repeated key keeps its first value
    let (status, body) = send(&router, "GET", "/users?limit=1&limit=2&offset=0&offset=3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"], json!({"offset": 0, "limit": 1, "total": 5}));
    assert_eq!(body["data"][0]["id"], json!(ids[4]));

    // an oversized limit is clamped
    let (_, body) = send(&router, "GET", "/users?limit=100000", None).await;
    assert_eq!(body["meta"]["limit"], 1000);

    // past the end yields an empty page, not an error
    let (status, body) = send(&router, "GET", "/users?offset=50", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["total"], 5);
    Ok(())
}

#[tokio::test]
async fn list_filters_are_case_insensitive_substrings() -> Result<()> {
    let router = create_test_router().await;
    create(&router, "Johnny", "Walker").await;
    create(&router, "John", "Doe").await;
    create(&router, "Jane", "Doe").await;

    let (_, body) = send(&router, "GET", "/users?first_name=JOHN", None).await;
    assert_eq!(body["meta"]["total"], 2);
    let page: Envelope<Vec<UserDto>> = serde_json::from_value(body)?;
    assert!(page.data.iter().all(|u| u.first_name.starts_with("John")));

    let (_, body) = send(&router, "GET", "/users?first_name=jo&last_name=oe", None).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["first_name"], "John");

    // blank filter behaves as absent
    let (_, body) = send(&router, "GET", "/users?last_name=", None).await;
    assert_eq!(body["meta"]["total"], 3);
    Ok(())
}

#[tokio::test]
async fn update_contact_changes_only_contact_fields() -> Result<()> {
    let router = create_test_router().await;
    let created = create(&router, "John", "Doe").await;

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/users/{}", created.id),
        Some(json!({"email": "new@example.com", "phone": "+442071838750"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Envelope<UserDto> = serde_json::from_value(body)?;
    assert_eq!(updated.data.email, "new@example.com");
    assert_eq!(updated.data.phone, "+442071838750");
    assert_eq!(updated.data.first_name, created.first_name);
    assert_eq!(updated.data.created_at, created.created_at);

    let (_, body) = send(&router, "GET", &format!("/users/{}", created.id), None).await;
    let fetched: Envelope<UserDto> = serde_json::from_value(body)?;
    assert_eq!(fetched.data, updated.data);
    Ok(())
}

#[tokio::test]
async fn update_contact_errors() {
    let router = create_test_router().await;
    let created = create(&router, "John", "Doe").await;
    let contact = json!({"email": "new@example.com", "phone": "+442071838750"});

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/users/{}", Uuid::new_v4()),
        Some(contact.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(body), "user not found");

    let (status, body) = send(&router, "PUT", "/users/123", Some(contact)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(body), "invalid UUID");

    let (status, _) = send(
        &router,
        "PUT",
        &format!("/users/{}", created.id),
        Some(json!({"email": "nope", "phone": "+442071838750"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the stored row is untouched after rejected updates
    let (_, body) = send(&router, "GET", &format!("/users/{}", created.id), None).await;
    assert_eq!(body["data"]["email"], "john.doe@example.com");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let router = create_test_router().await;
    let created = create(&router, "John", "Doe").await;
    let uri = format!("/users/{}", created.id);

    let (status, body) = send(&router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&router, "DELETE", "/users/xyz", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(body), "invalid UUID");
}

#[tokio::test]
async fn schema_bootstrap_is_repeatable() {
    let db = create_test_db().await;
    create_table_if_missing(&db)
        .await
        .expect("second bootstrap should be a no-op");
}
