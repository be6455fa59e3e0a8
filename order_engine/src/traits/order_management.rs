use crate::{
    db_types::{AuditLogEntry, Order, OrderItem},
    traits::OrderStoreError,
};

/// The `OrderManagement` trait defines the behaviour for querying information about orders in the database backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderStoreError>;

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderStoreError>;

    /// Returns the most recent order carrying the given payment reference, if any.
    async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, OrderStoreError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderStoreError>;

    /// Orders placed by the given user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError>;

    /// The audit trail for the given order, oldest first.
    async fn fetch_audit_log(&self, order_id: i64) -> Result<Vec<AuditLogEntry>, OrderStoreError>;
}
