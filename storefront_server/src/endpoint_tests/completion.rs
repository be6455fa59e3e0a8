use actix_web::{http::StatusCode, web, web::ServiceConfig};
use order_engine::{
    db_types::{Cents, NewProduct, Order, OrderStatusType, PaymentGateway, PaymentStatus, Product},
    events::EventProducers,
    order_objects::{CheckoutLine, CheckoutRequest},
    traits::{CatalogManagement, OrderManagement},
    CatalogApi,
    OrderFlowApi,
    SqliteDatabase,
    VerificationError,
    VerifiedPayment,
};

use super::{
    helpers::{customer_token, drop_test_db, error_message, patch_request, test_db},
    mocks::MockVerifier,
};
use crate::{data_objects::OrderCompletionResponse, routes::CompleteOrderRoute};

fn configure(db: SqliteDatabase, verifier: MockVerifier) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
            .app_data(web::Data::new(verifier))
            .service(CompleteOrderRoute::<SqliteDatabase, MockVerifier>::new());
    }
}

/// Creates a product and a pending order for `quantity` units of it.
async fn place_order(db: &SqliteDatabase, user_id: Option<i64>, price: i64, quantity: i64) -> (Product, Order) {
    let catalog = CatalogApi::new(db.clone());
    let product =
        NewProduct { name: "Shirt".into(), sku: None, price: Cents::from(price), currency: "NGN".into(), stock: 10 };
    let product = catalog.create_product(product).await.expect("Error creating product");
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let request = CheckoutRequest {
        user_id,
        items: vec![CheckoutLine { product_id: product.id, variant_id: None, quantity }],
        ..Default::default()
    };
    let order = api.create_order(request).await.expect("Error creating order");
    (product, order)
}

fn verifier_reporting(amount: i64, currency: &'static str, successful: bool) -> MockVerifier {
    let mut verifier = MockVerifier::new();
    verifier.expect_verify_payment().times(1).returning(move |gateway, reference| {
        Ok(VerifiedPayment {
            gateway,
            reference: reference.to_string(),
            successful,
            status: if successful { "success".into() } else { "abandoned".into() },
            amount: Cents::from(amount),
            currency: currency.to_string(),
        })
    });
    verifier
}

fn unused_verifier() -> MockVerifier {
    let mut verifier = MockVerifier::new();
    verifier.expect_verify_payment().never();
    verifier
}

fn paystack_body(reference: &str) -> String {
    format!(r#"{{"paymentReference":"{reference}","paymentGateway":"paystack"}}"#)
}

async fn stock_of(db: &SqliteDatabase, product_id: i64) -> i64 {
    db.fetch_product(product_id).await.unwrap().unwrap().stock
}

#[actix_web::test]
async fn verified_payment_completes_the_order() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, Some(7), 4999, 1).await;
    assert_eq!(order.total, Cents::from(4999));
    let path = format!("/orders/{}/complete", order.id);
    let verifier = verifier_reporting(4999, "NGN", true);
    let (status, body) =
        patch_request(&customer_token(7), &path, &paystack_body("ref_4999"), configure(db.clone(), verifier)).await;
    assert_eq!(status, StatusCode::OK);
    let response: OrderCompletionResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert_eq!(response.message, "Order completed");
    assert_eq!(response.order.status, OrderStatusType::Processing);
    assert_eq!(response.order.payment_status, PaymentStatus::Paid);
    assert_eq!(response.order.payment_reference.as_deref(), Some("ref_4999"));
    assert_eq!(response.order.payment_gateway, Some(PaymentGateway::Paystack));
    assert_eq!(stock_of(&db, shirt.id).await, 9);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn completing_a_paid_order_is_idempotent() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, None, 2500, 2).await;
    let path = format!("/orders/{}/complete", order.id);
    let body = paystack_body("ref_5000");
    let verifier = verifier_reporting(5000, "NGN", true);
    let (status, _) = patch_request("", &path, &body, configure(db.clone(), verifier)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock_of(&db, shirt.id).await, 8);

    let (status, body) = patch_request("", &path, &body, configure(db.clone(), unused_verifier())).await;
    assert_eq!(status, StatusCode::OK);
    let response: OrderCompletionResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert_eq!(response.message, "Order already paid");
    assert_eq!(stock_of(&db, shirt.id).await, 8);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn amount_mismatch_leaves_the_order_untouched() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, Some(7), 5000, 1).await;
    let path = format!("/orders/{}/complete", order.id);
    let verifier = verifier_reporting(4500, "NGN", true);
    let (status, body) =
        patch_request(&customer_token(7), &path, &paystack_body("ref_4500"), configure(db.clone(), verifier)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Amount mismatch"));
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(stock_of(&db, shirt.id).await, 10);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn unsuccessful_charge_is_rejected() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (_, order) = place_order(&db, None, 1000, 1).await;
    let path = format!("/orders/{}/complete", order.id);
    let verifier = verifier_reporting(1000, "NGN", false);
    let (status, body) = patch_request("", &path, &paystack_body("ref_1000"), configure(db.clone(), verifier)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Payment was not successful. The gateway reported 'abandoned'");
    drop_test_db(db).await;
}

#[actix_web::test]
async fn gateway_errors_are_reported() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (_, order) = place_order(&db, None, 1000, 1).await;
    let path = format!("/orders/{}/complete", order.id);
    let mut verifier = MockVerifier::new();
    verifier
        .expect_verify_payment()
        .times(1)
        .returning(|gateway, _| Err(VerificationError::NotConfigured(gateway)));
    let (status, body) = patch_request("", &path, &paystack_body("ref_1000"), configure(db.clone(), verifier)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Payment verification failed."));
    drop_test_db(db).await;
}

#[actix_web::test]
async fn ownership_is_enforced() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (_, order) = place_order(&db, Some(7), 1000, 1).await;
    let path = format!("/orders/{}/complete", order.id);
    let body = paystack_body("ref_1000");
    let (status, _) = patch_request("", &path, &body, configure(db.clone(), unused_verifier())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = patch_request(&customer_token(8), &path, &body, configure(db.clone(), unused_verifier())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn bad_requests_are_rejected_before_verification() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (_, order) = place_order(&db, None, 1000, 1).await;
    let path = format!("/orders/{}/complete", order.id);

    let body = r#"{"paymentReference":"   ","paymentGateway":"paystack"}"#;
    let (status, body) = patch_request("", &path, body, configure(db.clone(), unused_verifier())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Could not read request body: paymentReference is required");

    let body = r#"{"paymentReference":"ref_1000","paymentGateway":"paypal"}"#;
    let (status, body) = patch_request("", &path, body, configure(db.clone(), unused_verifier())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("paypal is not a supported payment gateway"));

    let (status, _) = patch_request("", &path, "not json", configure(db.clone(), unused_verifier())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        patch_request("", "/orders/9999/complete", &paystack_body("ref_1000"), configure(db.clone(), unused_verifier()))
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn a_payment_reference_cannot_pay_for_two_orders() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, first) = place_order(&db, None, 4999, 1).await;
    let (hat, second) = place_order(&db, None, 4999, 1).await;
    let body = paystack_body("ref_once");
    let path = format!("/orders/{}/complete", first.id);
    let verifier = verifier_reporting(4999, "NGN", true);
    let (status, _) = patch_request("", &path, &body, configure(db.clone(), verifier)).await;
    assert_eq!(status, StatusCode::OK);

    let path = format!("/orders/{}/complete", second.id);
    let (status, response) = patch_request("", &path, &body, configure(db.clone(), unused_verifier())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_message(&response), "Payment reference ref_once has already been used for another order");
    let second = db.fetch_order(second.id).await.unwrap().unwrap();
    assert_eq!(second.payment_status, PaymentStatus::Pending);
    assert!(second.payment_reference.is_none());
    assert_eq!(stock_of(&db, shirt.id).await, 9);
    assert_eq!(stock_of(&db, hat.id).await, 10);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn cancelled_orders_cannot_be_completed() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, Some(7), 1000, 1).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    api.modify_order_status(order.id, OrderStatusType::Cancelled, "user:1").await.unwrap();
    let path = format!("/orders/{}/complete", order.id);
    let (status, body) =
        patch_request(&customer_token(7), &path, &paystack_body("ref_late"), configure(db.clone(), unused_verifier()))
            .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_message(&body), "Order cannot be paid while it is CANCELLED");
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(stock_of(&db, shirt.id).await, 10);
    drop_test_db(db).await;
}
