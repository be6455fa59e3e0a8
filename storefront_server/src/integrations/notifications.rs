use std::sync::Arc;

use futures::future::BoxFuture;
use log::*;
use order_engine::{
    db_types::{NewNotification, Order},
    events::{EventHandlers, EventHooks, OrderAnnulledEvent, OrderPaidEvent, PaymentFailedEvent},
    NotificationApi,
    SqliteDatabase,
};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

/// Writes a notification to the customer's inbox for each order event.
///
/// Guest orders have no inbox, so their events are skipped.
pub fn create_notification_handlers(db: SqliteDatabase) -> EventHandlers {
    let api = Arc::new(NotificationApi::new(db));
    let mut hooks = EventHooks::default();
    let paid_api = Arc::clone(&api);
    hooks.on_order_paid(move |ev: OrderPaidEvent| {
        let order = ev.order;
        let message = format!(
            "We have received your payment of {} {} for order {}.",
            order.total, order.currency, order.order_number
        );
        notify(&paid_api, &order, "Payment received", message)
    });
    let failed_api = Arc::clone(&api);
    hooks.on_payment_failed(move |ev: PaymentFailedEvent| {
        let PaymentFailedEvent { order, reason } = ev;
        let message =
            format!("Your payment for order {} did not go through ({reason}). You can try again.", order.order_number);
        notify(&failed_api, &order, "Payment failed", message)
    });
    hooks.on_order_annulled(move |ev: OrderAnnulledEvent| {
        let order = ev.order;
        let message = format!("Order {} has been cancelled.", order.order_number);
        notify(&api, &order, "Order cancelled", message)
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

fn notify(
    api: &Arc<NotificationApi<SqliteDatabase>>,
    order: &Order,
    title: &str,
    message: String,
) -> BoxFuture<'static, ()> {
    let Some(user_id) = order.user_id else {
        trace!("📬️ Order {} is a guest order. No notification sent.", order.order_number);
        return Box::pin(async {});
    };
    let api = Arc::clone(api);
    let notification = NewNotification::new(user_id, title, message);
    let order_number = order.order_number.clone();
    Box::pin(async move {
        match api.notify(notification).await {
            Ok(n) => debug!("📬️ Notification #{} sent to user {user_id} for order {order_number}", n.id),
            Err(e) => error!("📬️ Could not notify user {user_id} about order {order_number}. {e}"),
        }
    })
}
