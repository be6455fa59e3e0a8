use log::*;
use sf_common::Secret;

pub const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
pub const DEFAULT_FLUTTERWAVE_BASE_URL: &str = "https://api.flutterwave.com";
pub const DEFAULT_STRIPE_BASE_URL: &str = "https://api.stripe.com";
pub const DEFAULT_STRIPE_TOLERANCE_SECS: i64 = 300;

fn secret_from_env(var: &str) -> Secret<String> {
    let value = std::env::var(var).unwrap_or_else(|_| {
        warn!("🪛️ {var} is not set. The gateway that uses it will be unavailable.");
        String::default()
    });
    Secret::new(value)
}

fn base_url_from_env(var: &str, default: &str) -> String {
    std::env::var(var).map(|s| s.trim_end_matches('/').to_string()).unwrap_or_else(|_| {
        debug!("🪛️ {var} is not set. Using {default}");
        default.to_string()
    })
}

/// Paystack uses the same secret key for API calls and for signing webhooks.
#[derive(Debug, Clone, Default)]
pub struct PaystackConfig {
    pub secret_key: Secret<String>,
    pub base_url: String,
}

impl PaystackConfig {
    pub fn new<S: Into<String>>(secret_key: S, base_url: &str) -> Self {
        Self { secret_key: Secret::new(secret_key.into()), base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn new_from_env_or_default() -> Self {
        let secret_key = secret_from_env("SF_PAYSTACK_SECRET_KEY");
        let base_url = base_url_from_env("SF_PAYSTACK_BASE_URL", DEFAULT_PAYSTACK_BASE_URL);
        Self { secret_key, base_url }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_blank()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlutterwaveConfig {
    pub secret_key: Secret<String>,
    pub base_url: String,
}

impl FlutterwaveConfig {
    pub fn new<S: Into<String>>(secret_key: S, base_url: &str) -> Self {
        Self { secret_key: Secret::new(secret_key.into()), base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn new_from_env_or_default() -> Self {
        let secret_key = secret_from_env("SF_FLUTTERWAVE_SECRET_KEY");
        let base_url = base_url_from_env("SF_FLUTTERWAVE_BASE_URL", DEFAULT_FLUTTERWAVE_BASE_URL);
        Self { secret_key, base_url }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_blank()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    /// The `whsec_...` secret used to sign webhook deliveries
    pub webhook_secret: Secret<String>,
    pub base_url: String,
    /// Webhook deliveries signed more than this many seconds ago are rejected.
    pub tolerance_secs: i64,
}

impl StripeConfig {
    pub fn new<S: Into<String>>(secret_key: S, webhook_secret: S, base_url: &str) -> Self {
        Self {
            secret_key: Secret::new(secret_key.into()),
            webhook_secret: Secret::new(webhook_secret.into()),
            base_url: base_url.trim_end_matches('/').to_string(),
            tolerance_secs: DEFAULT_STRIPE_TOLERANCE_SECS,
        }
    }

    pub fn new_from_env_or_default() -> Self {
        let secret_key = secret_from_env("SF_STRIPE_SECRET_KEY");
        let webhook_secret = secret_from_env("SF_STRIPE_WEBHOOK_SECRET");
        let base_url = base_url_from_env("SF_STRIPE_BASE_URL", DEFAULT_STRIPE_BASE_URL);
        let tolerance_secs = std::env::var("SF_STRIPE_TOLERANCE_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| {
                        error!("🪛️ Invalid SF_STRIPE_TOLERANCE_SECS value: {s}. {e}");
                    })
                    .ok()
            })
            .unwrap_or(DEFAULT_STRIPE_TOLERANCE_SECS);
        Self { secret_key, webhook_secret, base_url, tolerance_secs }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_blank()
    }
}
