//! Data types that are stored in, or read from, the order engine database.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
pub use sf_common::Cents;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($text),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ConversionError(format!("Invalid {}: {other}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------     OrderStatusType     ---------------------------------------------------------
/// Fulfilment state of an order. Payment state is tracked separately in [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been created at checkout and is awaiting payment.
    Pending,
    /// Payment has been verified and stock has been allocated.
    Processing,
    Shipped,
    Delivered,
    /// The order was cancelled by an admin, or expired without being paid.
    Cancelled,
}

string_enum!(OrderStatusType {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

impl OrderStatusType {
    /// Whether an admin may move an order from `self` to `to`.
    pub fn can_transition_to(self, to: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, to),
            (Pending, Cancelled) | (Processing, Shipped) | (Processing, Cancelled) | (Shipped, Delivered)
        )
    }
}

//--------------------------------------      PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

//--------------------------------------      PaymentGateway     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentGateway {
    Paystack,
    Flutterwave,
    Stripe,
}

string_enum!(PaymentGateway {
    Paystack => "PAYSTACK",
    Flutterwave => "FLUTTERWAVE",
    Stripe => "STRIPE",
});

//--------------------------------------          Role           ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------          Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    /// `None` for guest checkouts.
    pub user_id: Option<i64>,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub payment_gateway: Option<PaymentGateway>,
    pub subtotal: Cents,
    pub total: Cents,
    pub currency: String,
    pub shipping_address: Option<Json<Value>>,
    pub billing_address: Option<Json<Value>>,
    pub promo_code: Option<String>,
    pub payment_metadata: Option<Json<PaymentMetadata>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn is_guest_order(&self) -> bool {
        self.user_id.is_none()
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order {} (#{}) [{}/{}] {} {}", self.order_number, self.id, self.status, self.payment_status, self.total, self.currency)
    }
}

//--------------------------------------        OrderItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    /// Price per unit at the time the order was placed.
    pub unit_price: Cents,
}

impl OrderItem {
    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

//--------------------------------------         NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Option<i64>,
    pub currency: String,
    pub shipping_address: Option<Value>,
    pub billing_address: Option<Value>,
    pub payment_gateway: Option<PaymentGateway>,
    pub payment_reference: Option<String>,
    pub promo_code: Option<String>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new(order_number: String, user_id: Option<i64>, currency: String) -> Self {
        Self {
            order_number,
            user_id,
            currency,
            shipping_address: None,
            billing_address: None,
            payment_gateway: None,
            payment_reference: None,
            promo_code: None,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: NewOrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn subtotal(&self) -> Cents {
        self.items.iter().map(|i| i.unit_price * i.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub unit_price: Cents,
}

/// Generates an order number of the form `ORD-YYYYMMDD-XXXXXX`.
pub fn new_order_number() -> String {
    use rand::{distributions::Alphanumeric, Rng};
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .filter(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        .take(6)
        .map(char::from)
        .collect();
    format!("ORD-{}-{suffix}", Utc::now().format("%Y%m%d"))
}

//--------------------------------------     PaymentMetadata     ---------------------------------------------------------
/// What the gateway told us about the payment, stored on the order when it is marked as paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMetadata {
    pub gateway: PaymentGateway,
    /// The reference the payment was looked up with. This can differ from the order's payment reference, e.g. a
    /// Stripe checkout session that resolves to its payment intent.
    pub reference: String,
    pub amount: Cents,
    pub currency: String,
    /// `completion` for client-driven completion, `webhook` for gateway callbacks.
    pub source: String,
    pub verified_at: DateTime<Utc>,
}

/// Everything the database needs to settle an order in one transaction.
#[derive(Debug, Clone)]
pub struct PaymentCompletion {
    pub order_id: i64,
    pub reference: String,
    pub gateway: PaymentGateway,
    pub metadata: PaymentMetadata,
    pub billing_address: Option<Value>,
    pub promo_code: Option<String>,
    pub actor: String,
}

//--------------------------------------     Product/Variant     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub price: Cents,
    pub currency: String,
    pub stock: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub price: Cents,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub sku: Option<String>,
    pub price: Cents,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariant {
    pub name: String,
    pub sku: Option<String>,
    pub price: Cents,
    #[serde(default)]
    pub stock: i64,
}

fn default_currency() -> String {
    sf_common::DEFAULT_CURRENCY_CODE.to_string()
}

//--------------------------------------        PromoCode        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: i64,
    pub code: String,
    pub usage_count: i64,
    pub max_uses: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromoCode {
    pub code: String,
    pub max_uses: Option<i64>,
}

//--------------------------------------      AuditLogEntry      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub entity: String,
    pub entity_id: i64,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Notification       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
}

impl NewNotification {
    pub fn new<S1: Into<String>, S2: Into<String>>(user_id: i64, title: S1, message: S2) -> Self {
        Self { user_id, title: title.into(), message: message.into() }
    }
}
