use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderStatusType, PaymentCompletion},
    traits::{data_objects::OrderChanged, CompletionResult, OrderManagement},
};

/// This trait defines the highest level of behaviour for backends supporting the order engine.
///
/// This behaviour includes:
/// * Storing provisional orders created at checkout
/// * Settling verified payments, atomically with the stock decrement for every line item
/// * Recording failed charges
/// * Order fulfilment status changes and expiry of unpaid orders
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order and its line items in a single transaction. `subtotal` and `total` are computed from the
    /// line items. An audit entry is written for the new order.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    /// Settles an order in one atomic transaction:
    /// * marks the order as `PAID` / `PROCESSING`, storing the reference, gateway, metadata and the optional billing
    ///   address and promo code. This update only applies to a `PENDING`, unpaid order that has no payment reference
    ///   yet or already carries this one. Otherwise [`OrderStoreError::OrderNotPayable`] or
    ///   [`OrderStoreError::ReferenceMismatch`] is returned. A reference that is recorded on another order fails with
    ///   [`OrderStoreError::PaymentReferenceInUse`].
    /// * decrements stock for every line item, failing with [`OrderStoreError::InsufficientStock`] if any item
    ///   cannot be covered. Nothing is written in that case.
    /// * increments the usage counter of the promo code, if any. A code that is new on this completion must be
    ///   usable, or the transaction fails with [`OrderStoreError::PromoCodeUnavailable`].
    /// * writes an audit entry
    ///
    /// If the order was already paid (including by a concurrent call that won the race), nothing is changed and
    /// [`CompletionResult::AlreadyPaid`] is returned.
    async fn complete_payment(&self, completion: PaymentCompletion) -> Result<CompletionResult, OrderStoreError>;

    /// Marks the payment for the order as `FAILED`, leaving the order status alone so that the customer can retry.
    /// Only orders whose payment is `PENDING` or `FAILED` are affected; `None` is returned otherwise.
    async fn mark_payment_failed(
        &self,
        order_id: i64,
        reference: &str,
        actor: &str,
    ) -> Result<Option<Order>, OrderStoreError>;

    /// Sets the payment reference on an order that does not have one yet. Returns `false` if the order already
    /// carried a reference. Fails with [`OrderStoreError::PaymentReferenceInUse`] if another order holds it.
    async fn set_payment_reference(&self, order_id: i64, reference: &str) -> Result<bool, OrderStoreError>;

    /// Moves an order from `from` to `to`, writing an audit entry. Cancelling a `PROCESSING` order returns the
    /// line items to stock in the same transaction.
    ///
    /// Fails with [`OrderStoreError::StatusChanged`] if the order is no longer in the `from` status.
    async fn update_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
        actor: &str,
    ) -> Result<OrderChanged, OrderStoreError>;

    /// Cancels every `PENDING` order with an unpaid (`PENDING` or `FAILED`) payment that was created before
    /// `cutoff`. Returns the cancelled orders.
    async fn expire_unpaid_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, OrderStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("Insufficient stock for product #{product_id} (variant {variant_id:?}) to cover {quantity} units")]
    InsufficientStock { product_id: i64, variant_id: Option<i64>, quantity: i64 },
    #[error("Order #{id} is no longer {expected}")]
    StatusChanged { id: i64, expected: OrderStatusType },
    #[error("Order number {0} is already in use")]
    DuplicateOrderNumber(String),
    #[error("Promo code {0} already exists")]
    DuplicatePromoCode(String),
    #[error("Payment reference {0} is already recorded against another order")]
    PaymentReferenceInUse(String),
    #[error("Order #{id} is {status} and can no longer be paid")]
    OrderNotPayable { id: i64, status: OrderStatusType },
    #[error("Order #{0} carries a different payment reference")]
    ReferenceMismatch(i64),
    #[error("Promo code {0} is not valid")]
    PromoCodeUnavailable(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}
