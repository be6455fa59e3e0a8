//! Storefront Order Engine
//!
//! This library holds the core logic for taking payment on storefront orders. It is HTTP- and gateway-agnostic.
//!
//! The library is divided into three main sections:
//! 1. Database contracts ([`traits`]) and the SQLite backend that implements them. Callers never need to talk to the
//!    database directly; the data types it stores are public in [`db_types`].
//! 2. The public API ([`order_api`]): checkout, payment completion, gateway webhook events, admin status changes and
//!    expiry of unpaid orders. Payment verification is delegated to a [`PaymentVerifier`] supplied by the caller.
//! 3. Events ([`events`]) that hooks can subscribe to, e.g. to notify a customer when their order is paid.
pub mod db_types;
pub mod events;
pub mod order_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

/// Helpers for tests that need a real, migrated database.
#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use order_api::{
    catalog_api::CatalogApi,
    errors::OrderFlowError,
    notification_api::NotificationApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    order_query_api::OrderQueryApi,
    verifier::{PaymentVerifier, VerificationError, VerifiedPayment},
};
pub use traits::{
    CatalogManagement,
    CompletionResult,
    NotificationManagement,
    OrderChanged,
    OrderManagement,
    OrderStoreError,
    PaymentGatewayDatabase,
};
