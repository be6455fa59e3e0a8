use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use gateway_tools::signatures::{paystack_signature, stripe_signature, PAYSTACK_SIGNATURE_HEADER, STRIPE_SIGNATURE_HEADER};
use order_engine::{
    db_types::{Cents, NewProduct, Order, OrderStatusType, PaymentStatus, Product},
    events::EventProducers,
    order_objects::{CheckoutLine, CheckoutRequest},
    traits::{CatalogManagement, OrderManagement},
    OrderFlowApi,
    SqliteDatabase,
};
use sf_common::Secret;

use super::helpers::{drop_test_db, error_message, send_request, test_db};
use crate::{
    data_objects::JsonResponse,
    middleware::{SignatureScheme, WebhookSignatureFactory},
    webhook_routes::{PaystackWebhookRoute, StripeWebhookRoute},
};

const PAYSTACK_SECRET: &str = "sk_test_endpoint_webhooks";
const STRIPE_SECRET: &str = "whsec_endpoint_webhooks";

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let paystack = SignatureScheme::Paystack { secret: Secret::new(PAYSTACK_SECRET.to_string()) };
        let stripe = SignatureScheme::Stripe { secret: Secret::new(STRIPE_SECRET.to_string()), tolerance_secs: 300 };
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
            .service(
                web::scope("/webhooks/paystack")
                    .wrap(WebhookSignatureFactory::new(paystack, true))
                    .service(PaystackWebhookRoute::<SqliteDatabase>::new()),
            )
            .service(
                web::scope("/webhooks/stripe")
                    .wrap(WebhookSignatureFactory::new(stripe, true))
                    .service(StripeWebhookRoute::<SqliteDatabase>::new()),
            );
    }
}

async fn place_order(db: &SqliteDatabase, price: i64, reference: Option<&str>) -> (Product, Order) {
    let product =
        NewProduct { name: "Shirt".into(), sku: None, price: Cents::from(price), currency: "NGN".into(), stock: 10 };
    let product = db.insert_product(product).await.expect("Error creating product");
    let request = CheckoutRequest {
        user_id: Some(7),
        items: vec![CheckoutLine { product_id: product.id, variant_id: None, quantity: 1 }],
        payment_reference: reference.map(String::from),
        ..Default::default()
    };
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(request).await.expect("Error creating order");
    (product, order)
}

fn paystack_event(event: &str, reference: &str, amount: i64) -> String {
    format!(
        r#"{{"event":"{event}","data":{{"reference":"{reference}","status":"{}","amount":{amount},"currency":"NGN","gateway_response":"Declined"}}}}"#,
        if event == "charge.success" { "success" } else { "failed" }
    )
}

async fn post_paystack(db: &SqliteDatabase, body: &str, signature: Option<String>) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri("/webhooks/paystack").set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header((PAYSTACK_SIGNATURE_HEADER, sig));
    }
    send_request(req, configure(db.clone())).await
}

async fn post_signed_paystack(db: &SqliteDatabase, body: &str) -> (StatusCode, String) {
    let signature = paystack_signature(PAYSTACK_SECRET, body.as_bytes()).unwrap();
    post_paystack(db, body, Some(signature)).await
}

async fn post_stripe(db: &SqliteDatabase, body: &str, timestamp: i64) -> (StatusCode, String) {
    let signature = stripe_signature(STRIPE_SECRET, timestamp, body.as_bytes()).unwrap();
    let req = TestRequest::post()
        .uri("/webhooks/stripe")
        .insert_header((STRIPE_SIGNATURE_HEADER, format!("t={timestamp},v1={signature}")))
        .set_payload(body.to_string());
    send_request(req, configure(db.clone())).await
}

async fn reload(db: &SqliteDatabase, order_id: i64) -> Order {
    db.fetch_order(order_id).await.unwrap().unwrap()
}

async fn stock_of(db: &SqliteDatabase, product_id: i64) -> i64 {
    db.fetch_product(product_id).await.unwrap().unwrap().stock
}

#[actix_web::test]
async fn paystack_charge_success_completes_the_order() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, 4999, Some("ps_ref_1")).await;
    let (status, body) = post_signed_paystack(&db, &paystack_event("charge.success", "ps_ref_1", 4999)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "{}", response.message);
    let order = reload(&db, order.id).await;
    assert_eq!(order.status, OrderStatusType::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(stock_of(&db, shirt.id).await, 9);

    // A second delivery of the same event is acknowledged but changes nothing
    let (status, body) = post_signed_paystack(&db, &paystack_event("charge.success", "ps_ref_1", 4999)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert!(response.message.ends_with("was already paid"));
    assert_eq!(stock_of(&db, shirt.id).await, 9);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn invalid_signature_causes_no_writes() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, 4999, Some("ps_ref_2")).await;
    let body = paystack_event("charge.success", "ps_ref_2", 4999);
    let forged = paystack_signature("not-the-secret", body.as_bytes()).unwrap();
    let (status, body) = post_paystack(&db, &body, Some(forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(error_message(&body).starts_with("Authentication Error. Webhook signature check failed."));

    let (status, _) = post_paystack(&db, &paystack_event("charge.success", "ps_ref_2", 4999), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reloaded = reload(&db, order.id).await;
    assert_eq!(reloaded.status, OrderStatusType::Pending);
    assert_eq!(reloaded.payment_status, PaymentStatus::Pending);
    assert_eq!(stock_of(&db, shirt.id).await, 10);
    let audit = db.fetch_audit_log(order.id).await.unwrap();
    assert_eq!(audit.len(), 1);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn malformed_payload_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (status, body) = post_signed_paystack(&db, r#"{"event":"charge.success"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("Invalid Paystack webhook payload"));
    drop_test_db(db).await;
}

#[actix_web::test]
async fn amount_mismatch_is_acknowledged_without_changes() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, 5000, Some("ps_ref_3")).await;
    let (status, body) = post_signed_paystack(&db, &paystack_event("charge.success", "ps_ref_3", 4500)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);
    assert!(response.message.starts_with("Amount mismatch"));
    let order = reload(&db, order.id).await;
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(stock_of(&db, shirt.id).await, 10);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn payment_for_a_cancelled_order_is_not_applied() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, 5000, Some("ps_ref_cancelled")).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    api.modify_order_status(order.id, OrderStatusType::Cancelled, "system").await.unwrap();
    let (status, body) = post_signed_paystack(&db, &paystack_event("charge.success", "ps_ref_cancelled", 5000)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);
    assert_eq!(response.message, format!("Order {} is CANCELLED and cannot be paid", order.order_number));
    let order = reload(&db, order.id).await;
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(stock_of(&db, shirt.id).await, 10);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn charge_failure_marks_payment_failed() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (_, order) = place_order(&db, 5000, Some("ps_ref_4")).await;
    let (status, body) = post_signed_paystack(&db, &paystack_event("charge.failed", "ps_ref_4", 5000)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    let order = reload(&db, order.id).await;
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn stripe_payment_intent_falls_back_to_metadata() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let (shirt, order) = place_order(&db, 4999, None).await;
    let body = format!(
        r#"{{"id":"evt_1","type":"payment_intent.succeeded","data":{{"object":{{"id":"pi_123","amount":4999,"amount_received":4999,"currency":"ngn","status":"succeeded","metadata":{{"order_id":"{}"}}}}}}}}"#,
        order.id
    );
    let (status, body) = post_stripe(&db, &body, Utc::now().timestamp()).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "{}", response.message);
    let order = reload(&db, order.id).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.payment_reference.as_deref(), Some("pi_123"));
    assert_eq!(stock_of(&db, shirt.id).await, 9);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn stale_stripe_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let body = r#"{"id":"evt_2","type":"customer.created","data":{"object":{}}}"#;
    let (status, _) = post_stripe(&db, body, Utc::now().timestamp() - 600).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    drop_test_db(db).await;
}

#[actix_web::test]
async fn unhandled_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let body = r#"{"id":"evt_3","type":"customer.created","data":{"object":{}}}"#;
    let (status, body) = post_stripe(&db, body, Utc::now().timestamp()).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert_eq!(response.message, "Event customer.created ignored");
    drop_test_db(db).await;
}
