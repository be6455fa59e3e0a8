use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// The result of trying to settle an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompletionResult {
    /// The order was marked as paid and stock was decremented by this call.
    Completed(Order),
    /// The order was already paid. Nothing was changed.
    AlreadyPaid(Order),
}

impl CompletionResult {
    pub fn order(&self) -> &Order {
        match self {
            CompletionResult::Completed(o) | CompletionResult::AlreadyPaid(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            CompletionResult::Completed(o) | CompletionResult::AlreadyPaid(o) => o,
        }
    }

    pub fn is_new_completion(&self) -> bool {
        matches!(self, CompletionResult::Completed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderChanged {
    pub old_order: Order,
    pub new_order: Order,
}

impl OrderChanged {
    pub fn new(old_order: Order, new_order: Order) -> Self {
        Self { old_order, new_order }
    }

    pub fn old_status(&self) -> OrderStatusType {
        self.old_order.status
    }
}
