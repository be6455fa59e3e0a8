//! Webhook signature middleware.
//!
//! Payment gateways sign every webhook delivery. This middleware reads the raw request body, checks the signature
//! against it and only then hands the request (with its body restored) to the handler. Requests with a missing or
//! invalid signature are rejected with 401 Unauthorized before any parsing takes place.
//!
//! See [`gateway_tools::signatures`] for the schemes themselves.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use gateway_tools::signatures::{
    verify_paystack_signature,
    verify_stripe_signature,
    SignatureError,
    PAYSTACK_SIGNATURE_HEADER,
    STRIPE_SIGNATURE_HEADER,
};
use log::{trace, warn};
use sf_common::Secret;

use crate::errors::{AuthError, ServerError};

#[derive(Clone, Debug)]
pub enum SignatureScheme {
    /// HMAC-SHA512 of the body, keyed on the Paystack secret key
    Paystack { secret: Secret<String> },
    /// Stripe's timestamped HMAC-SHA256 scheme, keyed on the endpoint's webhook secret
    Stripe { secret: Secret<String>, tolerance_secs: i64 },
}

impl SignatureScheme {
    fn name(&self) -> &'static str {
        match self {
            SignatureScheme::Paystack { .. } => "Paystack",
            SignatureScheme::Stripe { .. } => "Stripe",
        }
    }

    fn header(&self) -> &'static str {
        match self {
            SignatureScheme::Paystack { .. } => PAYSTACK_SIGNATURE_HEADER,
            SignatureScheme::Stripe { .. } => STRIPE_SIGNATURE_HEADER,
        }
    }

    fn verify(&self, body: &[u8], signature: &str) -> Result<(), SignatureError> {
        match self {
            SignatureScheme::Paystack { secret } if !secret.is_blank() => {
                verify_paystack_signature(secret.reveal(), body, signature)
            },
            SignatureScheme::Stripe { secret, tolerance_secs } if !secret.is_blank() => {
                verify_stripe_signature(secret.reveal(), body, signature, *tolerance_secs, Utc::now().timestamp())
            },
            _ => Err(SignatureError::InvalidKey),
        }
    }
}

pub struct WebhookSignatureFactory {
    scheme: SignatureScheme,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl WebhookSignatureFactory {
    pub fn new(scheme: SignatureScheme, enabled: bool) -> Self {
        WebhookSignatureFactory { scheme, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for WebhookSignatureFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WebhookSignatureService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WebhookSignatureService {
            scheme: self.scheme.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct WebhookSignatureService<S> {
    scheme: SignatureScheme,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WebhookSignatureService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let scheme = self.scheme.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            let gateway = scheme.name();
            trace!("🔐️ Checking {gateway} webhook signature");
            if !enabled {
                trace!("🔐️ Webhook signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let signature = req
                .headers()
                .get(scheme.header())
                .and_then(|v| v.to_str().ok())
                .map(String::from)
                .ok_or_else(|| {
                    warn!("🔐️ No {gateway} signature found in request. Denying access.");
                    ServerError::from(AuthError::InvalidSignature(format!("No {gateway} signature found.")))
                })?;
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ServerError::InvalidRequestBody("Failed to extract request data.".into())
            })?;
            match scheme.verify(data.as_ref(), &signature) {
                Ok(()) => {
                    trace!("🔐️ {gateway} signature check for request ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(SignatureError::InvalidKey) => {
                    warn!("🔐️ {gateway} webhook secret is not configured. Denying access.");
                    Err(ServerError::from(AuthError::InvalidSignature(format!("{gateway} webhooks are not configured.")))
                        .into())
                },
                Err(e) => {
                    warn!("🔐️ Invalid {gateway} signature found in request. {e}. Denying access.");
                    Err(ServerError::from(AuthError::InvalidSignature(e.to_string())).into())
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
