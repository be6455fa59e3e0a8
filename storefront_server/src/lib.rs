//! # Storefront server
//! This crate hosts the HTTP server for the storefront's order and payment flow. It is responsible for:
//! * Accepting checkouts and creating provisional orders.
//! * Completing orders once the customer has paid, after verifying the payment with the gateway.
//! * Receiving signed webhook events from Paystack and Stripe and applying them to orders.
//! * Admin operations on orders and the catalog.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders`: Checkout (`POST`) and the caller's own orders (`GET`).
//! * `/api/orders/{id}`: A single order with its line items.
//! * `/api/orders/{id}/complete`: Payment completion.
//! * `/api/orders/{id}/status`, `/api/orders/{id}/audit`: Admin order management.
//! * `/api/products`, `/api/products/{id}`, `/api/products/{id}/variants`, `/api/promo_codes`: Catalog.
//! * `/api/notifications`: The caller's notification inbox.
//! * `/api/webhooks/paystack`, `/api/webhooks/stripe`: Gateway webhooks. These require a valid signature.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
