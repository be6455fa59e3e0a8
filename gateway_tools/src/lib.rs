//! Server-to-server helpers for the payment gateways the storefront accepts.
//!
//! Each gateway has a small REST client that looks up a payment by its reference and reports it as a
//! [`VerifiedCharge`], plus the payload types for its webhooks. [`signatures`] holds the webhook signature schemes.
mod config;
mod data_objects;
mod error;
mod flutterwave;
mod paystack;
mod rest;
pub mod signatures;
mod stripe;

pub use config::{FlutterwaveConfig, PaystackConfig, StripeConfig, DEFAULT_STRIPE_TOLERANCE_SECS};
pub use data_objects::VerifiedCharge;
pub use error::GatewayApiError;
pub use flutterwave::FlutterwaveApi;
pub use paystack::{PaystackApi, PaystackChargeData, PaystackEvent};
pub use stripe::{StripeApi, StripeCheckoutSession, StripeEvent, StripeEventData, StripePaymentIntent};
