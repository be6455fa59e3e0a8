//----------------------------------------------   Webhooks  ----------------------------------------------------
//
// Both handlers sit behind `WebhookSignatureFactory`, so by the time a request gets here its body has been
// authenticated. Business-level outcomes are always acknowledged with a 200 so the gateway does not retry them.

use actix_web::{web, HttpRequest, HttpResponse};
use gateway_tools::{PaystackEvent, StripeEvent};
use log::*;
use order_engine::{order_objects::GatewayEvent, traits::PaymentGatewayDatabase, OrderFlowApi};
use serde::de::DeserializeOwned;

use crate::{
    config::ServerOptions,
    data_objects::JsonResponse,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::gateways::{paystack_event, stripe_event},
    route,
};

fn parse_payload<T: DeserializeOwned>(gateway: &str, body: &[u8]) -> Result<T, ServerError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("🪝️ Could not parse {gateway} webhook payload. {e}");
        ServerError::InvalidRequestBody(format!("Invalid {gateway} webhook payload. {e}"))
    })
}

fn log_origin(gateway: &str, req: &HttpRequest, options: Option<&web::Data<ServerOptions>>) {
    let options = options.map(|o| *o.get_ref()).unwrap_or_default();
    match get_remote_ip(req, options) {
        Some(ip) => debug!("🪝️ Received {gateway} webhook from {ip}"),
        None => debug!("🪝️ Received {gateway} webhook from an unknown address"),
    }
}

async fn handle_event<B: PaymentGatewayDatabase>(
    api: &OrderFlowApi<B>,
    event: GatewayEvent,
) -> Result<HttpResponse, ServerError> {
    let outcome = api.process_gateway_event(event).await?;
    let result = if outcome.is_success() {
        info!("🪝️ {outcome}");
        JsonResponse::success(outcome)
    } else {
        warn!("🪝️ Webhook event was not applied. {outcome}");
        JsonResponse::failure(outcome)
    };
    Ok(HttpResponse::Ok().json(result))
}

route!(paystack_webhook => Post "" impl PaymentGatewayDatabase);
pub async fn paystack_webhook<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
    options: Option<web::Data<ServerOptions>>,
) -> Result<HttpResponse, ServerError> {
    log_origin("Paystack", &req, options.as_ref());
    let payload: PaystackEvent = parse_payload("Paystack", &body)?;
    trace!("🪝️ Paystack event {} for reference {}", payload.event, payload.data.reference);
    handle_event(api.as_ref(), paystack_event(payload)).await
}

route!(stripe_webhook => Post "" impl PaymentGatewayDatabase);
pub async fn stripe_webhook<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
    options: Option<web::Data<ServerOptions>>,
) -> Result<HttpResponse, ServerError> {
    log_origin("Stripe", &req, options.as_ref());
    let payload: StripeEvent = parse_payload("Stripe", &body)?;
    trace!("🪝️ Stripe event {} ({})", payload.id, payload.event_type);
    let event = stripe_event(payload).map_err(|e| {
        warn!("🪝️ Could not read the Stripe event object. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    handle_event(api.as_ref(), event).await
}
