use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderStatusType, PaymentCompletion, PaymentStatus},
    sqlite::SqliteDatabaseError,
};

/// Inserts a new order and its line items using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    let subtotal = order.subtotal();
    let record: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                subtotal,
                total,
                currency,
                shipping_address,
                billing_address,
                payment_gateway,
                payment_reference,
                promo_code
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(subtotal)
    .bind(subtotal)
    .bind(&order.currency)
    .bind(order.shipping_address.map(Json))
    .bind(order.billing_address.map(Json))
    .bind(order.payment_gateway)
    .bind(order.payment_reference)
    .bind(order.promo_code)
    .fetch_one(&mut *conn)
    .await?;
    if !order.items.is_empty() {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO order_items (order_id, product_id, variant_id, quantity, unit_price) ",
        );
        builder.push_values(order.items.iter(), |mut row, item| {
            row.push_bind(record.id)
                .push_bind(item.product_id)
                .push_bind(item.variant_id)
                .push_bind(item.quantity)
                .push_bind(item.unit_price);
        });
        builder.build().execute(&mut *conn).await?;
    }
    debug!("🗃️ Order {} saved with id {} and {} items", record.order_number, record.id, order.items.len());
    Ok(record)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Returns the last entry in the orders table for the corresponding payment reference
pub async fn fetch_order_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE payment_reference = $1 ORDER BY id DESC LIMIT 1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, SqliteDatabaseError> {
    let items = sqlx::query_as(
        "SELECT id, order_id, product_id, variant_id, quantity, unit_price FROM order_items WHERE order_id = $1 ORDER \
         BY id ASC",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, SqliteDatabaseError> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Flips the order to `PAID` / `PROCESSING`, but only if it is still `PENDING`, not already paid, and has either no
/// payment reference or one of the references this payment is known by. Returns `None` if the order does not exist or
/// any of those conditions fails.
pub(crate) async fn mark_order_paid(
    completion: &PaymentCompletion,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = $1,
                status = $2,
                payment_reference = $3,
                payment_gateway = $4,
                payment_metadata = $5,
                billing_address = COALESCE($6, billing_address),
                promo_code = COALESCE($7, promo_code),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $8
                AND payment_status != $1
                AND status = $9
                AND (payment_reference IS NULL OR payment_reference IN ($3, $10))
            RETURNING *;
        "#,
    )
    .bind(PaymentStatus::Paid)
    .bind(OrderStatusType::Processing)
    .bind(&completion.reference)
    .bind(completion.gateway)
    .bind(Json(&completion.metadata))
    .bind(completion.billing_address.clone().map(Json))
    .bind(completion.promo_code.clone())
    .bind(completion.order_id)
    .bind(OrderStatusType::Pending)
    .bind(&completion.metadata.reference)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub(crate) async fn mark_payment_failed(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND payment_status IN ($3, $1)
            RETURNING *;
        "#,
    )
    .bind(PaymentStatus::Failed)
    .bind(order_id)
    .bind(PaymentStatus::Pending)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub(crate) async fn set_payment_reference(
    order_id: i64,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE orders SET payment_reference = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND payment_reference \
         IS NULL",
    )
    .bind(reference)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves the order from `from` to `to`. Returns `None` if the order is not currently in the `from` state.
pub(crate) async fn update_order_status(
    order_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to)
    .bind(order_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Cancels all pending, unpaid orders created before `cutoff`.
pub(crate) async fn cancel_unpaid_orders(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    // created_at is stored in SQLite's CURRENT_TIMESTAMP format
    let cutoff = cutoff.format("%Y-%m-%d %H:%M:%S").to_string();
    trace!("🗃️ Cancelling unpaid orders created before {cutoff}");
    let orders = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE status = $2 AND payment_status IN ($3, $4) AND created_at < $5
            RETURNING *;
        "#,
    )
    .bind(OrderStatusType::Cancelled)
    .bind(OrderStatusType::Pending)
    .bind(PaymentStatus::Pending)
    .bind(PaymentStatus::Failed)
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
