use sf_common::Cents;
use thiserror::Error;

use crate::{db_types::OrderStatusType, traits::OrderStoreError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("Authentication is required to access this order")]
    Unauthenticated,
    #[error("You do not have permission to access this order")]
    Forbidden,
    #[error("The payment reference does not match the one recorded for this order")]
    ReferenceMismatch,
    #[error("Payment reference {0} has already been used for another order")]
    ReferenceInUse(String),
    #[error("Order cannot be paid while it is {0}")]
    OrderNotPayable(OrderStatusType),
    #[error("Payment verification failed. {0}")]
    VerificationFailed(String),
    #[error("Payment was not successful. The gateway reported '{0}'")]
    PaymentNotSuccessful(String),
    #[error("Amount mismatch")]
    AmountMismatch { expected: Cents, actual: Cents },
    #[error("Amount mismatch. Expected a payment in {expected}, but the gateway reported {actual}")]
    CurrencyMismatch { expected: String, actual: String },
    #[error("Insufficient stock to fulfil this order. {0}")]
    InsufficientStock(String),
    #[error("The order is already {0}")]
    StatusUnchanged(OrderStatusType),
    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            OrderStoreError::ProductNotFound(id) => Self::ProductNotFound(id),
            e @ OrderStoreError::InsufficientStock { .. } => Self::InsufficientStock(e.to_string()),
            e @ OrderStoreError::StatusChanged { .. } => Self::Conflict(e.to_string()),
            e @ OrderStoreError::DuplicatePromoCode(_) => Self::Conflict(e.to_string()),
            e @ OrderStoreError::DuplicateOrderNumber(_) => Self::Conflict(e.to_string()),
            OrderStoreError::PaymentReferenceInUse(r) => Self::ReferenceInUse(r),
            OrderStoreError::OrderNotPayable { status, .. } => Self::OrderNotPayable(status),
            OrderStoreError::ReferenceMismatch(_) => Self::ReferenceMismatch,
            e @ OrderStoreError::PromoCodeUnavailable(_) => Self::ValidationError(e.to_string()),
            OrderStoreError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}
