use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sweetshop::config::Config;
use sweetshop::services::TokenService;
use tower::ServiceExt;

/// Must match the secrets `spawn_app` configures.
const SECRET_KEY: &str = "integration-test-secret";
const ADMIN_CODE: &str = "super-secret-admin-code";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    config.auth.secret_key = SECRET_KEY.to_string();
    config.auth.admin_register_secret = ADMIN_CODE.to_string();

    let state = sweetshop::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    sweetshop::api::router(state)
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

async fn register(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
    admin_code: Option<&str>,
) -> (StatusCode, Value) {
    let mut body = json!({
        "username": username,
        "email": email,
        "password": password,
    });
    if let Some(code) = admin_code {
        body["admin_code"] = json!(code);
    }

    send_json(app, "POST", "/api/auth/register", None, Some(body)).await
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

/// Register + login an admin account, returning its token.
async fn admin_token(app: &Router) -> String {
    let (status, _) = register(
        app,
        "admin",
        "admin@example.com",
        "admin-pw",
        Some(ADMIN_CODE),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    login(app, "admin@example.com", "admin-pw").await
}

/// Register + login a regular member account, returning its token.
async fn member_token(app: &Router) -> String {
    let (status, _) = register(app, "alice", "alice@x.com", "pw123", None).await;
    assert_eq!(status, StatusCode::CREATED);

    login(app, "alice@x.com", "pw123").await
}

async fn create_sweet(
    app: &Router,
    token: &str,
    name: &str,
    category: &str,
    price: f64,
    quantity: i64,
) -> i64 {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/sweets",
        Some(token),
        Some(json!({
            "name": name,
            "category": category,
            "price": price,
            "quantity": quantity,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_register_then_login_round_trip() {
    let app = spawn_app().await;

    let (status, body) = register(&app, "alice", "alice@x.com", "pw123", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["msg"], "User registered");

    let token = login(&app, "alice@x.com", "pw123").await;

    // The token subject is the username, not the email.
    let tokens = TokenService::new(SECRET_KEY, 60);
    assert_eq!(tokens.verify(&token).unwrap(), "alice");

    let (status, _) = send_json(&app, "GET", "/api/sweets", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_conflicts_on_username_and_email() {
    let app = spawn_app().await;

    let (status, _) = register(&app, "alice", "alice@x.com", "pw123", None).await;
    assert_eq!(status, StatusCode::CREATED);

    // Same username, different email
    let (status, body) = register(&app, "alice", "other@x.com", "pw456", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Same email, different username
    let (status, body) = register(&app, "bob", "alice@x.com", "pw456", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_bad_credentials_rejected() {
    let app = spawn_app().await;

    register(&app, "alice", "alice@x.com", "pw123", None).await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@x.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown email is indistinguishable from a wrong password.
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_reject_bad_tokens() {
    let app = spawn_app().await;

    // No Authorization header
    let (status, _) = send_json(&app, "GET", "/api/sweets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Garbage token
    let (status, _) = send_json(&app, "GET", "/api/sweets", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let tokens = TokenService::new(SECRET_KEY, 60);

    // Expired token for a real user
    register(&app, "alice", "alice@x.com", "pw123", None).await;
    let expired = tokens
        .issue_with_ttl("alice", Duration::minutes(-5))
        .unwrap();
    let (status, _) = send_json(&app, "GET", "/api/sweets", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Valid token whose subject does not exist
    let ghost = tokens.issue("ghost").unwrap();
    let (status, _) = send_json(&app, "GET", "/api/sweets", Some(&ghost), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Token signed with a different secret
    let forged = TokenService::new("other-secret", 60).issue("alice").unwrap();
    let (status, _) = send_json(&app, "GET", "/api/sweets", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_cannot_create_delete_or_restock() {
    let app = spawn_app().await;

    let admin = admin_token(&app).await;
    let member = member_token(&app).await;

    let id = create_sweet(&app, &admin, "Ladoo", "Indian", 2.5, 10).await;

    // 403 regardless of payload validity
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/sweets",
        Some(&member),
        Some(json!({ "name": "Barfi", "category": "Indian", "price": 5.0, "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/sweets/{id}"),
        Some(&member),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/sweets/{id}/restock"),
        Some(&member),
        Some(json!({ "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The catalog is untouched
    let (status, body) = send_json(&app, "GET", "/api/sweets", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["quantity"], 10);
}

#[tokio::test]
async fn test_purchase_and_restock_flow() {
    let app = spawn_app().await;

    let admin = admin_token(&app).await;
    let id = create_sweet(&app, &admin, "Ladoo", "Indian", 2.5, 10).await;

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sweets/{id}/purchase"),
        Some(&admin),
        Some(json!({ "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Purchase successful");
    assert_eq!(body["remaining_quantity"], 7);

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sweets/{id}/restock"),
        Some(&admin),
        Some(json!({ "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Restock successful");
    assert_eq!(body["new_quantity"], 12);
}

#[tokio::test]
async fn test_purchase_rejects_invalid_quantities_without_mutating_stock() {
    let app = spawn_app().await;

    let admin = admin_token(&app).await;
    let member = member_token(&app).await;
    let id = create_sweet(&app, &admin, "Ladoo", "Indian", 2.5, 10).await;

    for quantity in [0, -3, 11] {
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/sweets/{id}/purchase"),
            Some(&member),
            Some(json!({ "quantity": quantity })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity={quantity}");
    }

    let (_, body) = send_json(&app, "GET", "/api/sweets", Some(&member), None).await;
    assert_eq!(body[0]["quantity"], 10);

    // Unknown id is 404, not 400
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/sweets/9999/purchase",
        Some(&member),
        Some(json!({ "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_purchase_then_restock_restores_stock() {
    let app = spawn_app().await;

    let admin = admin_token(&app).await;
    let id = create_sweet(&app, &admin, "Jalebi", "Indian", 1.75, 20).await;

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/sweets/{id}/purchase"),
        Some(&admin),
        Some(json!({ "quantity": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sweets/{id}/restock"),
        Some(&admin),
        Some(json!({ "quantity": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_quantity"], 20);
}

#[tokio::test]
async fn test_search_filters() {
    let app = spawn_app().await;

    let admin = admin_token(&app).await;
    create_sweet(&app, &admin, "Ladoo", "Indian", 2.5, 10).await;
    create_sweet(&app, &admin, "ABCdef", "Western", 10.0, 5).await;
    create_sweet(&app, &admin, "Barfi", "Indian", 5.0, 8).await;

    let names = |body: &Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect()
    };

    // Case-insensitive substring on name
    let (status, body) = send_json(&app, "GET", "/api/sweets/search?name=abc", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["ABCdef"]);

    // Exact category match
    let (_, body) = send_json(
        &app,
        "GET",
        "/api/sweets/search?category=Indian",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(names(&body), vec!["Ladoo", "Barfi"]);

    // Inclusive price bounds
    let (_, body) = send_json(
        &app,
        "GET",
        "/api/sweets/search?min_price=2.5&max_price=5.0",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(names(&body), vec!["Ladoo", "Barfi"]);

    // Conjunctive filters
    let (_, body) = send_json(
        &app,
        "GET",
        "/api/sweets/search?name=a&category=Indian",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(names(&body), vec!["Ladoo", "Barfi"]);

    // No filters returns everything
    let (_, body) = send_json(&app, "GET", "/api/sweets/search", Some(&admin), None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_update_applies_only_present_fields() {
    let app = spawn_app().await;

    let admin = admin_token(&app).await;
    let member = member_token(&app).await;
    let id = create_sweet(&app, &admin, "Ladoo", "Indian", 2.5, 10).await;

    // Any authenticated user may update, not just admins.
    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/sweets/{id}"),
        Some(&member),
        Some(json!({ "price": 3.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 3.0);
    assert_eq!(body["name"], "Ladoo");
    assert_eq!(body["category"], "Indian");
    assert_eq!(body["quantity"], 10);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/sweets/9999",
        Some(&member),
        Some(json!({ "price": 3.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_rejects_negative_quantity() {
    let app = spawn_app().await;

    let admin = admin_token(&app).await;
    let id = create_sweet(&app, &admin, "Ladoo", "Indian", 2.5, 10).await;

    // The stock invariant holds on direct updates too.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/sweets/{id}"),
        Some(&admin),
        Some(json!({ "quantity": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/sweets/{id}"),
        Some(&admin),
        Some(json!({ "price": -0.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send_json(&app, "GET", "/api/sweets", Some(&admin), None).await;
    assert_eq!(body[0]["quantity"], 10);
    assert_eq!(body[0]["price"], 2.5);
}

#[tokio::test]
async fn test_delete_sweet() {
    let app = spawn_app().await;

    let admin = admin_token(&app).await;
    let id = create_sweet(&app, &admin, "Ladoo", "Indian", 2.5, 10).await;

    let (status, body) = send_json(
        &app,
        "DELETE",
        &format!("/api/sweets/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Sweet deleted");

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/sweets/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_login_distinguishes_401_from_403() {
    let app = spawn_app().await;

    register(&app, "alice", "alice@x.com", "pw123", None).await;
    register(&app, "boss", "boss@x.com", "boss-pw", Some(ADMIN_CODE)).await;

    // Valid member credentials but no admin role
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/admin-login",
        None,
        Some(json!({ "email": "alice@x.com", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Bad credentials
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/admin-login",
        None,
        Some(json!({ "email": "boss@x.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The real admin
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/admin-login",
        None,
        Some(json!({ "email": "boss@x.com", "password": "boss-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["username"], "boss");
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn test_member_registration_example() {
    let app = spawn_app().await;

    // Register without an admin code, then try an admin-only endpoint.
    let (status, body) = register(&app, "alice", "alice@x.com", "pw123", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_admin"], false);

    let token = login(&app, "alice@x.com", "pw123").await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/sweets",
        Some(&token),
        Some(json!({ "name": "Ladoo", "category": "Indian", "price": 2.5, "quantity": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_wrong_admin_code_registers_member() {
    let app = spawn_app().await;

    let (status, body) = register(&app, "eve", "eve@x.com", "pw123", Some("guess")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn test_root_and_health_are_public() {
    let app = spawn_app().await;

    let (status, body) = send_json(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Welcome to Sweet Shop API");

    let (status, body) = send_json(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
