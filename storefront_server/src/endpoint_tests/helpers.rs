use actix_web::{
    body::MessageBody,
    http::{header::AUTHORIZATION, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use log::debug;
use order_engine::{
    db_types::{Cents, Order, OrderStatusType, PaymentStatus, Role},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::PaymentGatewayDatabase,
    SqliteDatabase,
};

use crate::{
    auth::{TokenIssuer, TokenValidator},
    config::AuthConfig,
    errors::{json_config, path_config},
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("endpoint-test-secret-8f1c2e0b7d4a4c21b6f3")
}

pub fn issue_token(user_id: i64, roles: Vec<Role>) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(user_id, roles, None).expect("Failed to sign token")
}

pub fn customer_token(user_id: i64) -> String {
    issue_token(user_id, vec![Role::Customer])
}

pub fn admin_token() -> String {
    issue_token(1, vec![Role::Customer, Role::Admin])
}

/// Sends the request to an app built by `configure` and returns the status and body of the response.
///
/// Errors raised by middleware are rendered the same way the server would render them.
pub async fn send_request(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::Data::new(TokenValidator::new(&get_auth_config())))
        .app_data(json_config())
        .app_data(path_config())
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().expect("Error bodies are always buffered");
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

fn with_token(req: TestRequest, token: &str) -> TestRequest {
    if token.is_empty() {
        req
    } else {
        req.insert_header((AUTHORIZATION, format!("Bearer {token}")))
    }
}

fn with_json_body(req: TestRequest, body: &str) -> TestRequest {
    req.insert_header(("Content-Type", "application/json")).set_payload(body.to_string())
}

pub async fn get_request(token: &str, path: &str, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    send_request(with_token(TestRequest::get().uri(path), token), configure).await
}

pub async fn post_request(
    token: &str,
    path: &str,
    body: &str,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = with_json_body(TestRequest::post().uri(path), body);
    send_request(with_token(req, token), configure).await
}

pub async fn patch_request(
    token: &str,
    path: &str,
    body: &str,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = with_json_body(TestRequest::patch().uri(path), body);
    send_request(with_token(req, token), configure).await
}

pub fn error_message(body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).expect("Response is not JSON");
    value["error"].as_str().expect("Response is not an error envelope").to_string()
}

pub fn order(id: i64, user_id: Option<i64>) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    Order {
        id,
        order_number: format!("ORD-TEST{id:04}"),
        user_id,
        status: OrderStatusType::Pending,
        payment_status: PaymentStatus::Pending,
        payment_reference: None,
        payment_gateway: None,
        subtotal: Cents::from(4999),
        total: Cents::from(4999),
        currency: "NGN".into(),
        shipping_address: None,
        billing_address: None,
        promo_code: None,
        payment_metadata: None,
        created_at,
        updated_at: created_at,
    }
}

pub async fn test_db() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

pub async fn drop_test_db(db: SqliteDatabase) {
    db.pool().close().await;
    let path = db.url().trim_start_matches("sqlite://").to_string();
    let _ = std::fs::remove_file(path);
}
