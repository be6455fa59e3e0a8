//! # Database backend contracts
//!
//! This module defines the behaviour that a database backend needs to expose in order to drive the order engine.
//! The SQLite backend in [`crate::SqliteDatabase`] implements all of them.
//!
//! * [`PaymentGatewayDatabase`] is the highest-level contract. It covers order creation, the atomic payment
//!   completion (status flip, stock decrement, promo usage and audit trail in one transaction), failed charges,
//!   admin status changes and expiry of unpaid orders.
//! * [`OrderManagement`] provides read-only queries for orders, their line items and their audit trail.
//! * [`CatalogManagement`] manages products, variants and promo codes.
//! * [`NotificationManagement`] manages the per-user notification inbox.
mod catalog_management;
mod data_objects;
mod notification_management;
mod order_management;
mod payment_gateway_database;

pub use catalog_management::CatalogManagement;
pub use data_objects::{CompletionResult, OrderChanged};
pub use notification_management::NotificationManagement;
pub use order_management::OrderManagement;
pub use payment_gateway_database::{OrderStoreError, PaymentGatewayDatabase};
