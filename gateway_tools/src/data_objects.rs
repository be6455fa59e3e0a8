use serde::{Deserialize, Serialize};
use sf_common::Cents;

/// A payment as reported by the gateway's own API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedCharge {
    pub reference: String,
    /// The gateway's status string, verbatim.
    pub status: String,
    /// True if the gateway considers the payment settled.
    pub successful: bool,
    pub amount: Cents,
    /// Upper-case ISO currency code
    pub currency: String,
}
