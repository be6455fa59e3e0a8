use std::fmt::Display;

use order_engine::{
    db_types::{Order, OrderStatusType, PaymentGateway},
    order_objects::{CheckoutLine, CheckoutRequest, CompleteOrderRequest},
    CompletionResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

fn parse_gateway(value: &str) -> Result<PaymentGateway, ServerError> {
    value.parse::<PaymentGateway>().map_err(|_| {
        ServerError::InvalidRequestBody(format!("{value} is not a supported payment gateway"))
    })
}

/// Body of `POST /api/orders`. The owner of the order is taken from the access token, never from the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutParams {
    pub items: Vec<CheckoutLine>,
    pub currency: Option<String>,
    pub shipping_address: Option<Value>,
    pub billing_address: Option<Value>,
    pub payment_gateway: Option<String>,
    pub payment_reference: Option<String>,
    pub promo_code: Option<String>,
}

impl CheckoutParams {
    pub fn into_request(self, user_id: Option<i64>) -> Result<CheckoutRequest, ServerError> {
        let payment_gateway = self.payment_gateway.as_deref().map(parse_gateway).transpose()?;
        Ok(CheckoutRequest {
            user_id,
            items: self.items,
            currency: self.currency,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            payment_gateway,
            payment_reference: self.payment_reference,
            promo_code: self.promo_code,
        })
    }
}

/// Body of `PATCH /api/orders/{id}/complete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOrderParams {
    pub payment_reference: Option<String>,
    pub payment_gateway: Option<String>,
    pub billing_address: Option<Value>,
    pub promo_code: Option<String>,
}

impl TryFrom<CompleteOrderParams> for CompleteOrderRequest {
    type Error = ServerError;

    fn try_from(params: CompleteOrderParams) -> Result<Self, Self::Error> {
        let reference = params
            .payment_reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ServerError::InvalidRequestBody("paymentReference is required".into()))?;
        let gateway = params
            .payment_gateway
            .as_deref()
            .map(parse_gateway)
            .transpose()?
            .ok_or_else(|| ServerError::InvalidRequestBody("paymentGateway is required".into()))?;
        let mut request = CompleteOrderRequest::new(reference, gateway);
        request.billing_address = params.billing_address;
        request.promo_code = params.promo_code;
        Ok(request)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCompletionResponse {
    pub success: bool,
    pub message: String,
    pub order: Order,
}

impl From<CompletionResult> for OrderCompletionResponse {
    fn from(result: CompletionResult) -> Self {
        let message = if result.is_new_completion() { "Order completed" } else { "Order already paid" };
        Self { success: true, message: message.to_string(), order: result.into_order() }
    }
}

/// Body of `PATCH /api/orders/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyStatusParams {
    pub status: String,
}

impl ModifyStatusParams {
    pub fn status(&self) -> Result<OrderStatusType, ServerError> {
        self.status
            .parse::<OrderStatusType>()
            .map_err(|_| ServerError::InvalidRequestBody(format!("{} is not a valid order status", self.status)))
    }
}
