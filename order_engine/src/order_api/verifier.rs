use serde::{Deserialize, Serialize};
use sf_common::Cents;
use thiserror::Error;

use crate::db_types::PaymentGateway;

/// The gateway's own account of a payment, obtained server-to-server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub gateway: PaymentGateway,
    pub reference: String,
    /// True if the gateway reports the charge as settled.
    pub successful: bool,
    /// The gateway's raw status string, e.g. `success` or `abandoned`.
    pub status: String,
    pub amount: Cents,
    pub currency: String,
}

#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("{0} is not configured on this server")]
    NotConfigured(PaymentGateway),
    #[error("Could not reach {0}: {1}")]
    RequestFailed(PaymentGateway, String),
    #[error("{0} rejected the verification request: {1}")]
    Rejected(PaymentGateway, String),
    #[error("Unexpected response from {0}: {1}")]
    InvalidResponse(PaymentGateway, String),
}

/// Verifies a payment reference against the named gateway's server API.
#[allow(async_fn_in_trait)]
pub trait PaymentVerifier {
    async fn verify_payment(
        &self,
        gateway: PaymentGateway,
        reference: &str,
    ) -> Result<VerifiedPayment, VerificationError>;
}
