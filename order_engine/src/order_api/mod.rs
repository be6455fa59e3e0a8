//! # Order engine public API
//!
//! The API is modular, so that clients can pick and choose the functionality they want. Each API object wraps a
//! database backend that implements the backend traits it needs.
//!
//! * [`order_flow_api`] drives the payment flow: checkout, completion, webhook events, status changes and expiry.
//! * [`order_query_api`] provides read access to orders and their audit trail.
//! * [`catalog_api`] manages products, variants and promo codes.
//! * [`notification_api`] manages the per-user notification inbox.
//!
//! ```rust,ignore
//! use order_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/storefront.db", 5).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let result = api.complete_order(&verifier, order_id, Some(&caller), request).await?;
//! ```
pub mod catalog_api;
pub mod errors;
pub mod notification_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;
pub mod verifier;
