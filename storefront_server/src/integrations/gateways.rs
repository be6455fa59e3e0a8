//! Glue between the gateway clients in `gateway_tools` and the order engine.
//!
//! [`GatewayVerifier`] is the server's [`PaymentVerifier`]: it routes each verification to the client for the named
//! gateway. The `*_event` functions turn vendor webhook payloads into engine [`GatewayEvent`]s.
use gateway_tools::{
    FlutterwaveApi,
    FlutterwaveConfig,
    GatewayApiError,
    PaystackApi,
    PaystackConfig,
    PaystackEvent,
    StripeApi,
    StripeConfig,
    StripeEvent,
    VerifiedCharge,
};
use log::*;
use order_engine::{
    db_types::PaymentGateway,
    order_objects::{ChargeEvent, GatewayEvent},
    PaymentVerifier,
    VerificationError,
    VerifiedPayment,
};
use sf_common::Cents;

#[derive(Clone, Default)]
pub struct GatewayVerifier {
    paystack: Option<PaystackApi>,
    flutterwave: Option<FlutterwaveApi>,
    stripe: Option<StripeApi>,
}

impl GatewayVerifier {
    /// Creates a client for every gateway that has a secret key. The others report `NotConfigured`.
    pub fn new(paystack: &PaystackConfig, flutterwave: &FlutterwaveConfig, stripe: &StripeConfig) -> Self {
        let paystack = client_for(PaymentGateway::Paystack, paystack.is_configured(), || PaystackApi::new(paystack));
        let flutterwave =
            client_for(PaymentGateway::Flutterwave, flutterwave.is_configured(), || FlutterwaveApi::new(flutterwave));
        let stripe = client_for(PaymentGateway::Stripe, stripe.is_configured(), || StripeApi::new(stripe));
        Self { paystack, flutterwave, stripe }
    }
}

fn client_for<T, F>(gateway: PaymentGateway, configured: bool, f: F) -> Option<T>
where F: FnOnce() -> Result<T, GatewayApiError> {
    if !configured {
        info!("💳️ {gateway} is not configured. Payments made with {gateway} cannot be verified.");
        return None;
    }
    f().map_err(|e| error!("💳️ Could not create the {gateway} client. {e}")).ok()
}

fn to_verification_error(gateway: PaymentGateway, e: GatewayApiError) -> VerificationError {
    match e {
        GatewayApiError::NotConfigured => VerificationError::NotConfigured(gateway),
        GatewayApiError::Initialization(s) | GatewayApiError::RestResponseError(s) => {
            VerificationError::RequestFailed(gateway, s)
        },
        GatewayApiError::QueryError { status, message } => {
            VerificationError::Rejected(gateway, format!("HTTP {status}. {message}"))
        },
        GatewayApiError::Rejected(s) => VerificationError::Rejected(gateway, s),
        GatewayApiError::JsonError(s) | GatewayApiError::InvalidCurrencyAmount(s) => {
            VerificationError::InvalidResponse(gateway, s)
        },
    }
}

fn to_verified_payment(gateway: PaymentGateway, charge: VerifiedCharge) -> VerifiedPayment {
    VerifiedPayment {
        gateway,
        reference: charge.reference,
        successful: charge.successful,
        status: charge.status,
        amount: charge.amount,
        currency: charge.currency,
    }
}

impl PaymentVerifier for GatewayVerifier {
    async fn verify_payment(
        &self,
        gateway: PaymentGateway,
        reference: &str,
    ) -> Result<VerifiedPayment, VerificationError> {
        let result = match gateway {
            PaymentGateway::Paystack => match &self.paystack {
                Some(api) => api.verify_transaction(reference).await,
                None => Err(GatewayApiError::NotConfigured),
            },
            PaymentGateway::Flutterwave => match &self.flutterwave {
                Some(api) => api.verify_transaction(reference).await,
                None => Err(GatewayApiError::NotConfigured),
            },
            PaymentGateway::Stripe => match &self.stripe {
                Some(api) => api.verify_payment(reference).await,
                None => Err(GatewayApiError::NotConfigured),
            },
        };
        result.map(|c| to_verified_payment(gateway, c)).map_err(|e| to_verification_error(gateway, e))
    }
}

//--------------------------------------     Webhook payloads     ---------------------------------------------------------

pub fn paystack_event(event: PaystackEvent) -> GatewayEvent {
    let PaystackEvent { event, data } = event;
    let mut charge = ChargeEvent::new(PaymentGateway::Paystack, data.reference.clone())
        .with_amount(Cents::from(data.amount), Some(data.currency.to_ascii_uppercase()));
    if let Some(hint) = data.order_hint() {
        charge = charge.with_order_hint(hint);
    }
    match event.as_str() {
        "charge.success" if data.is_successful() => GatewayEvent::ChargeSucceeded(charge),
        "charge.success" => {
            warn!("🪝️ Paystack sent charge.success for {}, but the status is '{}'", data.reference, data.status);
            GatewayEvent::Ignored(event)
        },
        "charge.failed" => {
            let reason = data.gateway_response.unwrap_or_else(|| data.status.clone());
            GatewayEvent::ChargeFailed(charge.with_reason(reason))
        },
        _ => GatewayEvent::Ignored(event),
    }
}

pub fn stripe_event(event: StripeEvent) -> Result<GatewayEvent, GatewayApiError> {
    let gateway = PaymentGateway::Stripe;
    let result = match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let intent = event.payment_intent()?;
            let mut charge = ChargeEvent::new(gateway, intent.id.clone())
                .with_amount(Cents::from(intent.amount_received), Some(intent.currency.to_ascii_uppercase()));
            if let Some(hint) = intent.order_hint() {
                charge = charge.with_order_hint(hint);
            }
            GatewayEvent::ChargeSucceeded(charge)
        },
        "payment_intent.payment_failed" => {
            let intent = event.payment_intent()?;
            let reason = intent.failure_reason().unwrap_or_else(|| intent.status.clone());
            let mut charge = ChargeEvent::new(gateway, intent.id.clone()).with_reason(reason);
            if let Some(hint) = intent.order_hint() {
                charge = charge.with_order_hint(hint);
            }
            GatewayEvent::ChargeFailed(charge)
        },
        "checkout.session.completed" => {
            let session = event.checkout_session()?;
            if !session.is_paid() {
                debug!("🪝️ Checkout session {} completed with status '{}'", session.id, session.payment_status);
                return Ok(GatewayEvent::Ignored(event.event_type));
            }
            let mut charge = ChargeEvent::new(gateway, session.reference());
            if let Some(amount) = session.amount_total {
                let currency = session.currency.as_ref().map(|c| c.to_ascii_uppercase());
                charge = charge.with_amount(Cents::from(amount), currency);
            }
            if let Some(hint) = session.order_hint() {
                charge = charge.with_order_hint(hint);
            }
            GatewayEvent::ChargeSucceeded(charge)
        },
        _ => GatewayEvent::Ignored(event.event_type),
    };
    Ok(result)
}
