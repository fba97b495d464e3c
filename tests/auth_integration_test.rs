mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{response_json, TestApp, TEST_PASSWORD, TEST_USER};
use logitrack_api::{
    auth::{AuthConfig, AuthService},
    entities::user,
};
use serde_json::json;

#[tokio::test]
async fn order_routes_require_a_token() {
    let app = TestApp::new().await;

    for (method, uri) in [
        (Method::GET, "/api/order"),
        (Method::GET, "/api/order/allitems"),
        (Method::GET, "/api/order/1"),
        (Method::DELETE, "/api/order/1"),
    ] {
        let response = app.request(method.clone(), uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    let create = app
        .request(
            Method::POST,
            "/api/order",
            Some(json!({ "customerName": "Acme Corp", "items": [{ "itemId": 1, "quantity": 1 }] })),
            None,
        )
        .await;
    assert_eq!(create.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_or_garbage_tokens_are_rejected() {
    let app = TestApp::new().await;

    let garbage = app
        .request(Method::GET, "/api/order", None, Some("not.a.jwt"))
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    // same claims, signed with a key the server does not know
    let forger = AuthService::new(
        AuthConfig {
            jwt_secret: "a-completely-different-signing-key!!".to_string(),
            ..AuthConfig::from(&app.state.config)
        },
        app.state.db.clone(),
    );
    let forged_token = forger
        .issue_token(&user::Model {
            id: 1,
            username: TEST_USER.to_string(),
            email: "supervisor@logitrack.example".to_string(),
            password_hash: String::new(),
            roles: "User,Admin".to_string(),
            created_at: Utc::now(),
        })
        .unwrap();
    let forged = app
        .request(Method::GET, "/api/order", None, Some(&forged_token))
        .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_token_reaches_order_routes() {
    let app = TestApp::new().await;
    // no orders yet, but the gate let the request through
    let response = app.authed(Method::GET, "/api/order", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_and_login_over_http() {
    let app = TestApp::new().await;

    let register = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "username": "night-shift",
                "email": "night@logitrack.example",
                "password": "Reach_Truck_9",
                "confirmPassword": "Reach_Truck_9"
            })),
            None,
        )
        .await;
    assert_eq!(register.status(), StatusCode::OK);
    assert_eq!(
        response_json(register).await["message"],
        "User registered successfully"
    );

    let login = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "night-shift", "password": "Reach_Truck_9" })),
            None,
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
    let body = response_json(login).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);
    assert_eq!(body["roles"], json!(["User"]));

    let token = body["token"].as_str().unwrap();
    let orders = app
        .request(Method::GET, "/api/order", None, Some(token))
        .await;
    assert_eq!(orders.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_registrations_are_rejected() {
    let app = TestApp::new().await;

    let mismatch = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "username": "night-shift",
                "email": "night@logitrack.example",
                "password": "Reach_Truck_9",
                "confirmPassword": "Reach_Truck_8"
            })),
            None,
        )
        .await;
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);

    let duplicate = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "username": TEST_USER,
                "email": "other@logitrack.example",
                "password": "Reach_Truck_9",
                "confirmPassword": "Reach_Truck_9"
            })),
            None,
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": TEST_USER, "password": format!("{TEST_PASSWORD}x") })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
}
