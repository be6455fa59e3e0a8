use std::fmt::Debug;

use crate::{
    db_types::{AuditLogEntry, Order},
    order_api::{
        errors::OrderFlowError,
        order_objects::{check_order_access, Caller, OrderWithItems},
    },
    traits::OrderManagement,
};

/// Read-only access to orders, their line items and their audit trail.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches an order and its line items, subject to the same access rules as order completion.
    pub async fn order_with_items(&self, order_id: i64, caller: Option<&Caller>) -> Result<OrderWithItems, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        check_order_access(&order, caller)?;
        let items = self.db.fetch_order_items(order_id).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        Ok(orders)
    }

    pub async fn audit_log(&self, order_id: i64) -> Result<Vec<AuditLogEntry>, OrderFlowError> {
        if self.db.fetch_order(order_id).await?.is_none() {
            return Err(OrderFlowError::OrderNotFound(order_id));
        }
        let entries = self.db.fetch_audit_log(order_id).await?;
        Ok(entries)
    }
}
