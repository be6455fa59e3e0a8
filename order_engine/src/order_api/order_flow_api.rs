use std::{collections::HashMap, fmt::Debug};

use chrono::{Duration, Utc};
use log::*;
use sf_common::{Cents, AMOUNT_TOLERANCE};

use crate::{
    db_types::{new_order_number, NewOrder, NewOrderItem, Order, OrderStatusType, PaymentCompletion, PaymentMetadata},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent, PaymentFailedEvent},
    order_api::{
        errors::OrderFlowError,
        order_objects::{
            check_order_access,
            Caller,
            ChargeEvent,
            CheckoutRequest,
            CompleteOrderRequest,
            GatewayEvent,
            WebhookOutcome,
        },
        verifier::PaymentVerifier,
    },
    traits::{CatalogManagement, CompletionResult, OrderStoreError, PaymentGatewayDatabase},
};

const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// `OrderFlowApi` is the primary API for handling the order and payment flow: checkout, client-driven completion,
/// gateway webhook events, admin status changes and expiry of unpaid orders.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🛒️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_payment_failed_hook(&self, order: &Order, reason: &str) {
        for emitter in &self.producers.payment_failed_producer {
            debug!("🛒️ Notifying payment failed hook subscribers");
            emitter.publish_event(PaymentFailedEvent::new(order.clone(), reason.to_string())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🛒️ Notifying order annulled hook subscribers");
            emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase + CatalogManagement
{
    /// Creates a provisional order at checkout.
    ///
    /// Prices are taken from the catalog at this moment and stored with each line item, so later price changes do
    /// not affect the order. Stock is checked but not reserved; it is only taken when the order is paid.
    pub async fn create_order(&self, request: CheckoutRequest) -> Result<Order, OrderFlowError> {
        if request.items.is_empty() {
            return Err(OrderFlowError::ValidationError("An order must contain at least one item".into()));
        }
        let mut items = Vec::with_capacity(request.items.len());
        let mut requested = HashMap::<(i64, Option<i64>), (i64, i64)>::new();
        let mut catalog_currency: Option<String> = None;
        for line in &request.items {
            if line.quantity <= 0 {
                return Err(OrderFlowError::ValidationError(format!(
                    "Quantity for product #{} must be positive",
                    line.product_id
                )));
            }
            let product = self
                .db
                .fetch_product(line.product_id)
                .await?
                .filter(|p| p.active)
                .ok_or_else(|| OrderFlowError::ValidationError(format!("Product #{} does not exist", line.product_id)))?;
            let (unit_price, stock) = match line.variant_id {
                Some(vid) => {
                    let variant = self
                        .db
                        .fetch_variant(vid)
                        .await?
                        .filter(|v| v.product_id == product.id)
                        .ok_or_else(|| {
                            OrderFlowError::ValidationError(format!(
                                "Variant #{vid} does not exist for product #{}",
                                product.id
                            ))
                        })?;
                    (variant.price, variant.stock)
                },
                None => (product.price, product.stock),
            };
            match &catalog_currency {
                Some(c) if !c.eq_ignore_ascii_case(&product.currency) => {
                    return Err(OrderFlowError::ValidationError("All items must be priced in the same currency".into()));
                },
                Some(_) => {},
                None => catalog_currency = Some(product.currency.clone()),
            }
            let entry = requested.entry((line.product_id, line.variant_id)).or_insert((0, stock));
            entry.0 += line.quantity;
            items.push(NewOrderItem {
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                unit_price,
            });
        }
        for ((product_id, variant_id), (quantity, stock)) in requested {
            if quantity > stock {
                let what = match variant_id {
                    Some(v) => format!("product #{product_id} (variant #{v})"),
                    None => format!("product #{product_id}"),
                };
                return Err(OrderFlowError::ValidationError(format!(
                    "Insufficient stock for {what}. Requested {quantity}, {stock} available"
                )));
            }
        }
        let currency = catalog_currency.unwrap_or_else(|| sf_common::DEFAULT_CURRENCY_CODE.to_string());
        if let Some(c) = &request.currency {
            if !c.eq_ignore_ascii_case(&currency) {
                return Err(OrderFlowError::ValidationError(format!("Products are priced in {currency}, not {c}")));
            }
        }
        let promo_code = request.promo_code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        if let Some(code) = &promo_code {
            let usable = self
                .db
                .fetch_promo_code(code)
                .await?
                .is_some_and(|p| p.active && p.max_uses.map_or(true, |max| p.usage_count < max));
            if !usable {
                return Err(OrderFlowError::ValidationError(format!("Promo code {code} is not valid")));
            }
        }
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = NewOrder::new(new_order_number(), request.user_id, currency.clone());
            order.items = items.clone();
            order.shipping_address = request.shipping_address.clone();
            order.billing_address = request.billing_address.clone();
            order.payment_gateway = request.payment_gateway;
            order.payment_reference =
                request.payment_reference.as_ref().map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
            order.promo_code = promo_code.clone();
            match self.db.insert_order(order).await {
                Ok(order) => {
                    info!("🛒️ New order {} for {} {}", order.order_number, order.total, order.currency);
                    return Ok(order);
                },
                Err(OrderStoreError::DuplicateOrderNumber(n)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    warn!("🛒️ Order number {n} is taken. Generating another.");
                },
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Completes an order after the customer has paid on the gateway's checkout page.
    ///
    /// The payment is verified server-to-server with the gateway named in the request before anything is written.
    /// The verified amount must match the order total to within one minor unit. On success the order is marked as
    /// paid and stock is taken for every line item in a single transaction, and the `OrderPaid` hook is called.
    ///
    /// Calling this for an order that is already paid succeeds without changing anything. Cancelled orders cannot be
    /// completed, and a payment reference can only ever settle one order.
    pub async fn complete_order<V: PaymentVerifier>(
        &self,
        verifier: &V,
        order_id: i64,
        caller: Option<&Caller>,
        request: CompleteOrderRequest,
    ) -> Result<CompletionResult, OrderFlowError> {
        let reference = request.payment_reference.trim().to_string();
        if reference.is_empty() {
            return Err(OrderFlowError::ValidationError("paymentReference is required".into()));
        }
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        check_order_access(&order, caller)?;
        if order.is_paid() {
            debug!("💳️ Order {} is already paid. Completion request is a no-op.", order.order_number);
            return Ok(CompletionResult::AlreadyPaid(order));
        }
        if order.status != OrderStatusType::Pending {
            warn!("💳️ Completion requested for order {}, which is {}", order.order_number, order.status);
            return Err(OrderFlowError::OrderNotPayable(order.status));
        }
        if order.payment_reference.as_ref().is_some_and(|r| r != &reference) {
            warn!("💳️ Completion for order {} used reference {reference}, which does not match", order.order_number);
            return Err(OrderFlowError::ReferenceMismatch);
        }
        self.check_reference_is_free(&order, &reference).await?;
        let gateway = request.payment_gateway;
        let verified = verifier.verify_payment(gateway, &reference).await.map_err(|e| {
            warn!("💳️ Could not verify {gateway} payment {reference}: {e}");
            OrderFlowError::VerificationFailed(e.to_string())
        })?;
        if !verified.successful {
            info!("💳️ {gateway} reports payment {reference} as '{}'", verified.status);
            return Err(OrderFlowError::PaymentNotSuccessful(verified.status));
        }
        check_amount(&order, verified.amount, Some(&verified.currency))?;
        // Store the gateway's own reference so that webhooks and later completions find this order under it
        let canonical = match verified.reference.trim() {
            "" => reference.clone(),
            r => r.to_string(),
        };
        if canonical != reference {
            debug!("💳️ {gateway} resolved {reference} to {canonical}");
            self.check_reference_is_free(&order, &canonical).await?;
        }
        let metadata = PaymentMetadata {
            gateway,
            reference,
            amount: verified.amount,
            currency: verified.currency.clone(),
            source: "completion".into(),
            verified_at: Utc::now(),
        };
        let completion = PaymentCompletion {
            order_id,
            reference: canonical,
            gateway,
            metadata,
            billing_address: request.billing_address,
            promo_code: request.promo_code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            actor: caller.map(Caller::actor).unwrap_or_else(|| "guest".to_string()),
        };
        let result = self.db.complete_payment(completion).await?;
        if let CompletionResult::Completed(order) = &result {
            let number = &order.order_number;
            info!("💳️ Order {number} completed. {} {} verified with {gateway}", verified.amount, verified.currency);
            self.call_order_paid_hook(order).await;
        }
        Ok(result)
    }

    /// Applies a verified gateway webhook event to the matching order.
    ///
    /// Business-level rejections (unknown order, amount mismatch, duplicate deliveries) are reported in the
    /// [`WebhookOutcome`]. Only infrastructure failures are returned as errors.
    pub async fn process_gateway_event(&self, event: GatewayEvent) -> Result<WebhookOutcome, OrderFlowError> {
        match event {
            GatewayEvent::ChargeSucceeded(charge) => self.handle_charge_success(charge).await,
            GatewayEvent::ChargeFailed(charge) => self.handle_charge_failure(charge).await,
            GatewayEvent::Ignored(name) => {
                debug!("🪝️ Ignoring gateway event {name}");
                Ok(WebhookOutcome::Ignored(name))
            },
        }
    }

    async fn handle_charge_success(&self, charge: ChargeEvent) -> Result<WebhookOutcome, OrderFlowError> {
        let Some(order) = self.find_order_for_charge(&charge).await? else {
            warn!("🪝️ {} charge {} does not match any order", charge.gateway, charge.reference);
            return Ok(WebhookOutcome::OrderNotFound(charge.reference));
        };
        if order.is_paid() {
            debug!("🪝️ Duplicate success event for order {}", order.order_number);
            return Ok(WebhookOutcome::AlreadyPaid(order));
        }
        if order.payment_reference.as_ref().is_some_and(|r| r != &charge.reference) {
            warn!("🪝️ Order {} carries a different reference than charge {}", order.order_number, charge.reference);
            return Ok(WebhookOutcome::ReferenceMismatch { order, reported: charge.reference });
        }
        if order.status != OrderStatusType::Pending {
            let number = &order.order_number;
            warn!("🪝️ {} charge {} is for order {number}, which is {}", charge.gateway, charge.reference, order.status);
            return Ok(WebhookOutcome::NotPayable(order));
        }
        if let Some(amount) = charge.amount {
            match check_amount(&order, amount, charge.currency.as_deref()) {
                Ok(()) => {},
                Err(OrderFlowError::CurrencyMismatch { actual, .. }) => {
                    return Ok(WebhookOutcome::CurrencyMismatch { order, reported: actual });
                },
                Err(_) => return Ok(WebhookOutcome::AmountMismatch { order, reported: amount }),
            }
        }
        let metadata = PaymentMetadata {
            gateway: charge.gateway,
            reference: charge.reference.clone(),
            amount: charge.amount.unwrap_or(order.total),
            currency: charge.currency.clone().unwrap_or_else(|| order.currency.clone()),
            source: "webhook".into(),
            verified_at: Utc::now(),
        };
        let completion = PaymentCompletion {
            order_id: order.id,
            reference: charge.reference.clone(),
            gateway: charge.gateway,
            metadata,
            billing_address: None,
            promo_code: None,
            actor: format!("webhook:{}", charge.gateway),
        };
        match self.db.complete_payment(completion).await {
            Ok(CompletionResult::Completed(order)) => {
                info!("🪝️ Order {} paid via {} webhook", order.order_number, charge.gateway);
                self.call_order_paid_hook(&order).await;
                Ok(WebhookOutcome::Completed(order))
            },
            Ok(CompletionResult::AlreadyPaid(order)) => Ok(WebhookOutcome::AlreadyPaid(order)),
            Err(e @ OrderStoreError::InsufficientStock { .. }) => {
                warn!("🪝️ Order {} was paid but cannot be fulfilled: {e}", order.order_number);
                Ok(WebhookOutcome::InsufficientStock { order, reason: e.to_string() })
            },
            Err(OrderStoreError::OrderNotPayable { .. }) => Ok(WebhookOutcome::NotPayable(order)),
            Err(OrderStoreError::ReferenceMismatch(_) | OrderStoreError::PaymentReferenceInUse(_)) => {
                warn!("🪝️ Charge {} cannot settle order {}", charge.reference, order.order_number);
                Ok(WebhookOutcome::ReferenceMismatch { order, reported: charge.reference })
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn handle_charge_failure(&self, charge: ChargeEvent) -> Result<WebhookOutcome, OrderFlowError> {
        let Some(order) = self.find_order_for_charge(&charge).await? else {
            warn!("🪝️ Failed {} charge {} does not match any order", charge.gateway, charge.reference);
            return Ok(WebhookOutcome::OrderNotFound(charge.reference));
        };
        if order.is_paid() {
            info!("🪝️ Ignoring failure event for order {}, which is already paid", order.order_number);
            return Ok(WebhookOutcome::FailureIgnored(order));
        }
        if order.payment_reference.as_ref().is_some_and(|r| r != &charge.reference) {
            let number = &order.order_number;
            warn!("🪝️ Order {number} carries a different reference than failed charge {}", charge.reference);
            return Ok(WebhookOutcome::ReferenceMismatch { order, reported: charge.reference });
        }
        let actor = format!("webhook:{}", charge.gateway);
        match self.db.mark_payment_failed(order.id, &charge.reference, &actor).await? {
            Some(updated) => {
                let reason = charge.reason.as_deref().unwrap_or("Charge failed");
                info!("🪝️ Payment for order {} failed: {reason}", updated.order_number);
                self.call_payment_failed_hook(&updated, reason).await;
                Ok(WebhookOutcome::MarkedFailed(updated))
            },
            None => Ok(WebhookOutcome::FailureIgnored(order)),
        }
    }

    /// Finds the order by payment reference, falling back to the order id or number embedded in the payment
    /// metadata. When the fallback matches an order without a reference, the reference is recorded on the order.
    async fn find_order_for_charge(&self, charge: &ChargeEvent) -> Result<Option<Order>, OrderFlowError> {
        if let Some(order) = self.db.fetch_order_by_reference(&charge.reference).await? {
            return Ok(Some(order));
        }
        let Some(hint) = charge.order_hint.as_deref().map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(None);
        };
        let order = match hint.parse::<i64>() {
            Ok(id) => self.db.fetch_order(id).await?,
            Err(_) => self.db.fetch_order_by_number(hint).await?,
        };
        let Some(mut order) = order else {
            return Ok(None);
        };
        if order.payment_reference.is_none() && self.db.set_payment_reference(order.id, &charge.reference).await? {
            debug!("🪝️ Recorded payment reference {} on order {}", charge.reference, order.order_number);
            order.payment_reference = Some(charge.reference.clone());
        }
        Ok(Some(order))
    }

    async fn check_reference_is_free(&self, order: &Order, reference: &str) -> Result<(), OrderFlowError> {
        match self.db.fetch_order_by_reference(reference).await? {
            Some(other) if other.id != order.id => {
                warn!(
                    "💳️ Reference {reference} offered for order {} already belongs to order {}",
                    order.order_number, other.order_number
                );
                Err(OrderFlowError::ReferenceInUse(reference.to_string()))
            },
            _ => Ok(()),
        }
    }

    /// Changes the fulfilment status of an order.
    ///
    /// | From \ To  | Processing | Shipped | Delivered | Cancelled |
    /// |------------|------------|---------|-----------|-----------|
    /// | Pending    | Err        | Err     | Err       | Ok        |
    /// | Processing | -          | Ok      | Err       | Ok (1)    |
    /// | Shipped    | Err        | -       | Ok        | Err       |
    ///
    /// Delivered and Cancelled orders are final.
    ///
    /// (1) The line items are returned to stock.
    ///
    /// Setting an order to its current status is an error. Cancelling calls the `OrderAnnulled` hook.
    pub async fn modify_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatusType,
        actor: &str,
    ) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let current = order.status;
        if current == new_status {
            return Err(OrderFlowError::StatusUnchanged(current));
        }
        if !current.can_transition_to(new_status) {
            return Err(OrderFlowError::InvalidStatusTransition { from: current, to: new_status });
        }
        let changed = self.db.update_order_status(order_id, current, new_status, actor).await?;
        info!("🛒️ {actor} moved order {} from {current} to {new_status}", changed.new_order.order_number);
        if new_status == OrderStatusType::Cancelled {
            self.call_order_annulled_hook(&changed.new_order).await;
        }
        Ok(changed.new_order)
    }

    /// Cancels pending orders that have not been paid within `timeout` of being created.
    pub async fn expire_unpaid_orders(&self, timeout: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let cutoff = Utc::now() - timeout;
        let expired = self.db.expire_unpaid_orders(cutoff).await?;
        for order in &expired {
            debug!("🛒️ Order {} expired unpaid", order.order_number);
            self.call_order_annulled_hook(order).await;
        }
        Ok(expired)
    }
}

fn check_amount(order: &Order, amount: Cents, currency: Option<&str>) -> Result<(), OrderFlowError> {
    if let Some(c) = currency {
        if !c.eq_ignore_ascii_case(&order.currency) {
            warn!("💳️ Currency mismatch on order {}: expected {}, got {c}", order.order_number, order.currency);
            return Err(OrderFlowError::CurrencyMismatch { expected: order.currency.clone(), actual: c.to_string() });
        }
    }
    if !order.total.is_within(amount, AMOUNT_TOLERANCE) {
        warn!("💳️ Amount mismatch on order {}: expected {}, got {amount}", order.order_number, order.total);
        return Err(OrderFlowError::AmountMismatch { expected: order.total, actual: amount });
    }
    Ok(())
}
