use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_common::Cents;

use crate::{rest::RestClient, GatewayApiError, PaystackConfig, VerifiedCharge};

#[derive(Clone)]
pub struct PaystackApi {
    client: RestClient,
}

#[derive(Debug, Clone, Deserialize)]
struct VerifyResponse {
    status: bool,
    message: String,
    data: Option<PaystackChargeData>,
}

/// The `data` object of Paystack's transaction verification response and of its `charge.*` webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaystackChargeData {
    pub reference: String,
    pub status: String,
    /// In the currency's minor unit (kobo for NGN)
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl PaystackChargeData {
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }

    /// The order id embedded in the payment metadata at checkout, if any.
    pub fn order_hint(&self) -> Option<String> {
        self.metadata.as_ref().and_then(|m| match &m["order_id"] {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn into_verified_charge(self) -> VerifiedCharge {
        VerifiedCharge {
            successful: self.is_successful(),
            amount: Cents::from(self.amount),
            currency: self.currency.to_ascii_uppercase(),
            reference: self.reference,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaystackEvent {
    pub event: String,
    pub data: PaystackChargeData,
}

impl PaystackApi {
    pub fn new(config: &PaystackConfig) -> Result<Self, GatewayApiError> {
        let client = RestClient::new(&config.base_url, &config.secret_key)?;
        Ok(Self { client })
    }

    /// Calls `GET /transaction/verify/{reference}`.
    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifiedCharge, GatewayApiError> {
        debug!("💳️ Verifying Paystack transaction {reference}");
        let response = self.client.get::<VerifyResponse>(&["transaction", "verify", reference], &[]).await?;
        if !response.status {
            return Err(GatewayApiError::Rejected(response.message));
        }
        let data = response.data.ok_or_else(|| GatewayApiError::JsonError("Response contains no data".into()))?;
        let charge = data.into_verified_charge();
        info!("💳️ Paystack reports {reference} as '{}' for {} {}", charge.status, charge.amount, charge.currency);
        Ok(charge)
    }
}
