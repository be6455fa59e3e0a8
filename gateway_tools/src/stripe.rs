use std::collections::HashMap;

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_common::Cents;

use crate::{rest::RestClient, GatewayApiError, StripeConfig, VerifiedCharge};

#[derive(Clone)]
pub struct StripeApi {
    client: RestClient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

impl StripeEvent {
    pub fn payment_intent(&self) -> Result<StripePaymentIntent, GatewayApiError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| GatewayApiError::JsonError(e.to_string()))
    }

    pub fn checkout_session(&self) -> Result<StripeCheckoutSession, GatewayApiError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| GatewayApiError::JsonError(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_received: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<Value>,
}

impl StripePaymentIntent {
    pub fn is_successful(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn order_hint(&self) -> Option<String> {
        self.metadata.get("order_id").cloned()
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.last_payment_error.as_ref().and_then(|e| e["message"].as_str()).map(String::from)
    }

    pub fn into_verified_charge(self) -> VerifiedCharge {
        VerifiedCharge {
            successful: self.is_successful(),
            amount: Cents::from(self.amount_received),
            currency: self.currency.to_ascii_uppercase(),
            reference: self.id,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    pub payment_status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
}

impl StripeCheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Orders paid through a checkout session are keyed on the underlying payment intent when there is one.
    pub fn reference(&self) -> String {
        self.payment_intent.clone().unwrap_or_else(|| self.id.clone())
    }

    pub fn order_hint(&self) -> Option<String> {
        self.metadata.get("order_id").cloned().or_else(|| self.client_reference_id.clone())
    }

    pub fn into_verified_charge(self) -> VerifiedCharge {
        VerifiedCharge {
            successful: self.is_paid(),
            reference: self.reference(),
            amount: Cents::from(self.amount_total.unwrap_or_default()),
            currency: self.currency.map(|c| c.to_ascii_uppercase()).unwrap_or_default(),
            status: self.payment_status,
        }
    }
}

impl StripeApi {
    pub fn new(config: &StripeConfig) -> Result<Self, GatewayApiError> {
        let client = RestClient::new(&config.base_url, &config.secret_key)?;
        Ok(Self { client })
    }

    /// Looks up a payment by reference. Checkout session ids (`cs_...`) are resolved through the sessions API,
    /// anything else is treated as a payment intent id.
    pub async fn verify_payment(&self, reference: &str) -> Result<VerifiedCharge, GatewayApiError> {
        debug!("💳️ Verifying Stripe payment {reference}");
        let charge = if reference.starts_with("cs_") {
            self.fetch_checkout_session(reference).await?.into_verified_charge()
        } else {
            self.fetch_payment_intent(reference).await?.into_verified_charge()
        };
        info!("💳️ Stripe reports {reference} as '{}' for {} {}", charge.status, charge.amount, charge.currency);
        Ok(charge)
    }

    pub async fn fetch_payment_intent(&self, id: &str) -> Result<StripePaymentIntent, GatewayApiError> {
        self.client.get::<StripePaymentIntent>(&["v1", "payment_intents", id], &[]).await
    }

    pub async fn fetch_checkout_session(&self, id: &str) -> Result<StripeCheckoutSession, GatewayApiError> {
        self.client.get::<StripeCheckoutSession>(&["v1", "checkout", "sessions", id], &[]).await
    }
}
