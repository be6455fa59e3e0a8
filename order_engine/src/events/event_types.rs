use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// Published after a payment completion has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published when a gateway reports a failed charge for an unpaid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order: Order,
    pub reason: String,
}

impl PaymentFailedEvent {
    pub fn new(order: Order, reason: String) -> Self {
        Self { order, reason }
    }
}

/// Published when an order is cancelled, either by an admin or because it expired unpaid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    PaymentFailed(PaymentFailedEvent),
    OrderAnnulled(OrderAnnulledEvent),
}
