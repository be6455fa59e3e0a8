#![allow(dead_code)]
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
};

use chrono::Utc;
use order_engine::{
    db_types::{
        Cents,
        NewProduct,
        NewVariant,
        PaymentCompletion,
        PaymentGateway,
        PaymentMetadata,
        Product,
        ProductVariant,
    },
    events::EventProducers,
    order_objects::{CheckoutLine, CheckoutRequest},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    CatalogManagement,
    OrderFlowApi,
    PaymentGatewayDatabase,
    PaymentVerifier,
    SqliteDatabase,
    VerificationError,
    VerifiedPayment,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn setup() -> OrderFlowApi<SqliteDatabase> {
    setup_with_producers(EventProducers::default()).await
}

pub async fn setup_with_producers(producers: EventProducers) -> OrderFlowApi<SqliteDatabase> {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    OrderFlowApi::new(db, producers)
}

pub async fn tear_down(api: OrderFlowApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    api.db().pool().close().await;
    let _ = Sqlite::drop_database(&url).await;
}

pub async fn product(db: &SqliteDatabase, name: &str, price: i64, stock: i64) -> Product {
    let product =
        NewProduct { name: name.into(), sku: None, price: Cents::from(price), currency: "NGN".into(), stock };
    db.insert_product(product).await.expect("Error creating product")
}

pub async fn variant(db: &SqliteDatabase, product_id: i64, name: &str, price: i64, stock: i64) -> ProductVariant {
    let variant = NewVariant { name: name.into(), sku: None, price: Cents::from(price), stock };
    db.insert_variant(product_id, variant).await.expect("Error creating variant")
}

pub fn line(product_id: i64, variant_id: Option<i64>, quantity: i64) -> CheckoutLine {
    CheckoutLine { product_id, variant_id, quantity }
}

pub fn checkout(user_id: Option<i64>, items: Vec<CheckoutLine>) -> CheckoutRequest {
    CheckoutRequest { user_id, items, ..Default::default() }
}

/// A settlement request straight to the store, as if verification had already passed.
pub fn paystack_completion(order_id: i64, reference: &str, amount: i64) -> PaymentCompletion {
    let metadata = PaymentMetadata {
        gateway: PaymentGateway::Paystack,
        reference: reference.to_string(),
        amount: Cents::from(amount),
        currency: "NGN".into(),
        source: "completion".into(),
        verified_at: Utc::now(),
    };
    PaymentCompletion {
        order_id,
        reference: reference.to_string(),
        gateway: PaymentGateway::Paystack,
        metadata,
        billing_address: None,
        promo_code: None,
        actor: "guest".into(),
    }
}

pub async fn stock_of(db: &SqliteDatabase, product_id: i64) -> i64 {
    db.fetch_product(product_id).await.unwrap().unwrap().stock
}

pub async fn variant_stock_of(db: &SqliteDatabase, variant_id: i64) -> i64 {
    db.fetch_variant(variant_id).await.unwrap().unwrap().stock
}

/// A verifier that answers from a fixed table of references, and counts how often it was asked.
#[derive(Clone, Default)]
pub struct FixedVerifier {
    payments: Arc<Mutex<HashMap<String, VerifiedPayment>>>,
    calls: Arc<AtomicUsize>,
}

impl FixedVerifier {
    pub fn with_payment(self, reference: &str, amount: i64, currency: &str, successful: bool) -> Self {
        let payment = VerifiedPayment {
            gateway: PaymentGateway::Paystack,
            reference: reference.to_string(),
            successful,
            status: if successful { "success".into() } else { "abandoned".into() },
            amount: Cents::from(amount),
            currency: currency.to_string(),
        };
        self.payments.lock().unwrap().insert(reference.to_string(), payment);
        self
    }

    /// Registers a payment that the gateway reports under another reference, the way a Stripe checkout session
    /// resolves to its payment intent.
    pub fn with_resolved_payment(self, presented: &str, resolved: &str, amount: i64, currency: &str) -> Self {
        let payment = VerifiedPayment {
            gateway: PaymentGateway::Stripe,
            reference: resolved.to_string(),
            successful: true,
            status: "paid".into(),
            amount: Cents::from(amount),
            currency: currency.to_string(),
        };
        self.payments.lock().unwrap().insert(presented.to_string(), payment);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PaymentVerifier for FixedVerifier {
    async fn verify_payment(
        &self,
        gateway: PaymentGateway,
        reference: &str,
    ) -> Result<VerifiedPayment, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payments
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| VerificationError::Rejected(gateway, format!("Transaction reference {reference} not found")))
    }
}
