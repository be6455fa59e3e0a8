use log::*;
use serde::Deserialize;
use sf_common::Cents;

use crate::{rest::RestClient, FlutterwaveConfig, GatewayApiError, VerifiedCharge};

#[derive(Clone)]
pub struct FlutterwaveApi {
    client: RestClient,
}

#[derive(Debug, Clone, Deserialize)]
struct VerifyResponse {
    status: String,
    message: String,
    data: Option<FlutterwaveTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
struct FlutterwaveTransaction {
    tx_ref: String,
    status: String,
    /// Flutterwave reports amounts in major units
    amount: f64,
    currency: String,
}

impl FlutterwaveTransaction {
    fn into_verified_charge(self) -> Result<VerifiedCharge, GatewayApiError> {
        let amount =
            Cents::from_major(self.amount).map_err(|e| GatewayApiError::InvalidCurrencyAmount(e.to_string()))?;
        Ok(VerifiedCharge {
            successful: self.status == "successful",
            amount,
            currency: self.currency.to_ascii_uppercase(),
            reference: self.tx_ref,
            status: self.status,
        })
    }
}

impl FlutterwaveApi {
    pub fn new(config: &FlutterwaveConfig) -> Result<Self, GatewayApiError> {
        let client = RestClient::new(&config.base_url, &config.secret_key)?;
        Ok(Self { client })
    }

    /// Calls `GET /v3/transactions/verify_by_reference?tx_ref={reference}`.
    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifiedCharge, GatewayApiError> {
        debug!("💳️ Verifying Flutterwave transaction {reference}");
        let response = self
            .client
            .get::<VerifyResponse>(&["v3", "transactions", "verify_by_reference"], &[("tx_ref", reference)])
            .await?;
        if response.status != "success" {
            return Err(GatewayApiError::Rejected(response.message));
        }
        let data = response.data.ok_or_else(|| GatewayApiError::JsonError("Response contains no data".into()))?;
        let charge = data.into_verified_charge()?;
        info!("💳️ Flutterwave reports {reference} as '{}' for {} {}", charge.status, charge.amount, charge.currency);
        Ok(charge)
    }
}
