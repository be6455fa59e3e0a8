use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use mockall::predicate::eq;
use order_engine::{
    db_types::{AuditLogEntry, Order},
    OrderQueryApi,
};
use serde_json::Value;

use super::{
    helpers::{admin_token, customer_token, error_message, get_request, order},
    mocks::MockOrderManager,
};
use crate::routes::{MyOrdersRoute, OrderAuditLogRoute, OrderByIdRoute};

fn configure(db: MockOrderManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderQueryApi::new(db)))
            .service(MyOrdersRoute::<MockOrderManager>::new())
            .service(OrderAuditLogRoute::<MockOrderManager>::new())
            .service(OrderByIdRoute::<MockOrderManager>::new());
    }
}

#[actix_web::test]
async fn fetch_my_orders_no_token() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/orders", configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "Authentication Error. No access token was provided.");
}

#[actix_web::test]
async fn fetch_my_orders_invalid_token() {
    let _ = env_logger::try_init().ok();
    let mut token = customer_token(7);
    token.replace_range(token.len() - 10..token.len() - 5, "AAAAA");
    let (status, body) = get_request(&token, "/orders", configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(error_message(&body).starts_with("Authentication Error. Access token is invalid."));
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_user()
        .with(eq(7))
        .times(1)
        .returning(|_| Ok(vec![order(2, Some(7)), order(1, Some(7))]));
    let (status, body) = get_request(&customer_token(7), "/orders", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].order_number, "ORD-TEST0002");
}

#[actix_web::test]
async fn fetch_own_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().with(eq(3)).returning(|id| Ok(Some(order(id, Some(7)))));
    db.expect_fetch_order_items().with(eq(3)).returning(|_| Ok(vec![]));
    let (status, body) = get_request(&customer_token(7), "/orders/3", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["id"], 3);
    assert_eq!(value["status"], "PENDING");
    assert_eq!(value["items"], Value::Array(vec![]));
}

#[actix_web::test]
async fn try_fetch_another_users_order_as_customer() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, Some(8)))));
    db.expect_fetch_order_items().never();
    let (status, body) = get_request(&customer_token(7), "/orders/3", configure(db)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_message(&body), "You do not have permission to access this order");
}

#[actix_web::test]
async fn fetch_another_users_order_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, Some(8)))));
    db.expect_fetch_order_items().returning(|_| Ok(vec![]));
    let (status, _) = get_request(&admin_token(), "/orders/3", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn owned_order_requires_a_token() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, Some(8)))));
    let (status, _) = get_request("", "/orders/3", configure(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn guest_orders_are_open_to_anyone() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, None))));
    db.expect_fetch_order_items().returning(|_| Ok(vec![]));
    let (status, _) = get_request("", "/orders/5", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    let (status, body) = get_request(&customer_token(7), "/orders/99", configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "Order #99 does not exist");
}

#[actix_web::test]
async fn malformed_order_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(7), "/orders/abc", configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Could not read request path"));
}

#[actix_web::test]
async fn audit_log_requires_admin() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(7), "/orders/3/audit", configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_message(&body), "Insufficient Permissions. Insufficient permissions.");

    let (status, _) = get_request("", "/orders/3/audit", configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn audit_log_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, Some(8)))));
    db.expect_fetch_audit_log().with(eq(3)).returning(|id| {
        Ok(vec![AuditLogEntry {
            id: 1,
            entity: "order".into(),
            entity_id: id,
            action: "CREATED".into(),
            old_value: None,
            new_value: Some("PENDING".into()),
            actor: "user:8".into(),
            created_at: Utc::now(),
        }])
    });
    let (status, body) = get_request(&admin_token(), "/orders/3/audit", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let entries: Vec<AuditLogEntry> = serde_json::from_str(&body).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "CREATED");
}
