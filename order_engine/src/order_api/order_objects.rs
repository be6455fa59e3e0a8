use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_common::Cents;

use crate::{
    db_types::{Order, OrderItem, PaymentGateway, Product, ProductVariant, Role},
    order_api::errors::OrderFlowError,
};

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn new(user_id: i64, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn actor(&self) -> String {
        format!("user:{}", self.user_id)
    }
}

/// Guest orders are open to anyone holding the order id. Owned orders are open to their owner and to admins.
pub fn check_order_access(order: &Order, caller: Option<&Caller>) -> Result<(), OrderFlowError> {
    let Some(owner) = order.user_id else {
        return Ok(());
    };
    match caller {
        None => Err(OrderFlowError::Unauthenticated),
        Some(c) if c.user_id == owner || c.is_admin() => Ok(()),
        Some(_) => Err(OrderFlowError::Forbidden),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: Option<i64>,
    pub items: Vec<CheckoutLine>,
    pub currency: Option<String>,
    pub shipping_address: Option<Value>,
    pub billing_address: Option<Value>,
    pub payment_gateway: Option<PaymentGateway>,
    pub payment_reference: Option<String>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOrderRequest {
    pub payment_reference: String,
    pub payment_gateway: PaymentGateway,
    pub billing_address: Option<Value>,
    pub promo_code: Option<String>,
}

impl CompleteOrderRequest {
    pub fn new<S: Into<String>>(payment_reference: S, payment_gateway: PaymentGateway) -> Self {
        Self { payment_reference: payment_reference.into(), payment_gateway, billing_address: None, promo_code: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

//--------------------------------------     Gateway events      ---------------------------------------------------------
/// A charge notification from a payment gateway, after signature verification and vendor-specific parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeEvent {
    pub gateway: PaymentGateway,
    pub reference: String,
    /// An order id or order number embedded in the payment metadata, used when the reference is not on file.
    pub order_hint: Option<String>,
    pub amount: Option<Cents>,
    pub currency: Option<String>,
    pub reason: Option<String>,
}

impl ChargeEvent {
    pub fn new<S: Into<String>>(gateway: PaymentGateway, reference: S) -> Self {
        Self { gateway, reference: reference.into(), order_hint: None, amount: None, currency: None, reason: None }
    }

    pub fn with_order_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.order_hint = Some(hint.into());
        self
    }

    pub fn with_amount(mut self, amount: Cents, currency: Option<String>) -> Self {
        self.amount = Some(amount);
        self.currency = currency;
        self
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayEvent {
    ChargeSucceeded(ChargeEvent),
    ChargeFailed(ChargeEvent),
    /// Any event type we do not act on. Carries the vendor's event name.
    Ignored(String),
}

/// What happened as a result of a webhook delivery. All of these are acknowledged to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Completed(Order),
    AlreadyPaid(Order),
    MarkedFailed(Order),
    /// A failure event for an order that is already paid.
    FailureIgnored(Order),
    OrderNotFound(String),
    AmountMismatch { order: Order, reported: Cents },
    CurrencyMismatch { order: Order, reported: String },
    InsufficientStock { order: Order, reason: String },
    /// The order is bound to a different payment reference, or this reference already settled another order.
    ReferenceMismatch { order: Order, reported: String },
    /// The order was cancelled before the payment arrived.
    NotPayable(Order),
    Ignored(String),
}

impl WebhookOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            WebhookOutcome::Completed(_) |
                WebhookOutcome::AlreadyPaid(_) |
                WebhookOutcome::MarkedFailed(_) |
                WebhookOutcome::FailureIgnored(_) |
                WebhookOutcome::Ignored(_)
        )
    }
}

impl Display for WebhookOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookOutcome::Completed(o) => write!(f, "Order {} has been paid", o.order_number),
            WebhookOutcome::AlreadyPaid(o) => write!(f, "Order {} was already paid", o.order_number),
            WebhookOutcome::MarkedFailed(o) => write!(f, "Payment for order {} marked as failed", o.order_number),
            WebhookOutcome::FailureIgnored(o) => {
                write!(f, "Order {} is already paid. Failure event ignored", o.order_number)
            },
            WebhookOutcome::OrderNotFound(r) => write!(f, "No order found for payment reference {r}"),
            WebhookOutcome::AmountMismatch { order, reported } => {
                write!(f, "Amount mismatch for order {}: expected {}, got {reported}", order.order_number, order.total)
            },
            WebhookOutcome::CurrencyMismatch { order, reported } => write!(
                f,
                "Amount mismatch for order {}: expected currency {}, got {reported}",
                order.order_number, order.currency
            ),
            WebhookOutcome::InsufficientStock { order, reason } => {
                write!(f, "Order {} could not be completed. {reason}", order.order_number)
            },
            WebhookOutcome::ReferenceMismatch { order, reported } => {
                write!(f, "Payment reference {reported} cannot settle order {}", order.order_number)
            },
            WebhookOutcome::NotPayable(o) => write!(f, "Order {} is {} and cannot be paid", o.order_number, o.status),
            WebhookOutcome::Ignored(name) => write!(f, "Event {name} ignored"),
        }
    }
}
