//! `SqliteDatabase` is a concrete implementation of an order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{
    db::{audit, catalog, db_url, new_pool, notifications, orders},
    SqliteDatabaseError,
};
use crate::{
    db_types::{
        AuditLogEntry,
        NewNotification,
        NewOrder,
        NewProduct,
        NewPromoCode,
        NewVariant,
        Notification,
        Order,
        OrderItem,
        OrderStatusType,
        PaymentCompletion,
        Product,
        ProductVariant,
        PromoCode,
    },
    traits::{
        CatalogManagement,
        CompletionResult,
        NotificationManagement,
        OrderChanged,
        OrderManagement,
        OrderStoreError,
        PaymentGatewayDatabase,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let number = order.order_number.clone();
        let reference = order.payment_reference.clone();
        let order = orders::insert_order(order, &mut tx).await.map_err(|e| match reference {
            Some(r) if e.is_unique_violation_on("payment_reference") => OrderStoreError::PaymentReferenceInUse(r),
            _ if e.is_unique_violation() => OrderStoreError::DuplicateOrderNumber(number),
            _ => e.into(),
        })?;
        let status = order.status.to_string();
        audit::insert_audit_entry(audit::ORDER_ENTITY, order.id, "CREATED", None, Some(status), "checkout", &mut tx)
            .await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn complete_payment(&self, completion: PaymentCompletion) -> Result<CompletionResult, OrderStoreError> {
        let order_id = completion.order_id;
        let old_order = self.fetch_order(order_id).await?.ok_or(OrderStoreError::OrderNotFound(order_id))?;
        // The conditional update must be the first statement so that SQLite takes the write lock before any read.
        let mut tx = self.pool.begin().await?;
        let paid = orders::mark_order_paid(&completion, &mut tx).await.map_err(|e| {
            if e.is_unique_violation_on("payment_reference") {
                OrderStoreError::PaymentReferenceInUse(completion.reference.clone())
            } else {
                OrderStoreError::from(e)
            }
        })?;
        let Some(order) = paid else {
            tx.rollback().await?;
            // Either it was already paid when we looked, a concurrent completion committed first, or the order is no
            // longer payable.
            let current = self.fetch_order(order_id).await?.unwrap_or(old_order);
            return if current.is_paid() {
                debug!("🗃️ Order #{order_id} is already paid. Nothing to do.");
                Ok(CompletionResult::AlreadyPaid(current))
            } else if current.status != OrderStatusType::Pending {
                warn!("🗃️ Order {} is {} and cannot be paid", current.order_number, current.status);
                Err(OrderStoreError::OrderNotPayable { id: order_id, status: current.status })
            } else {
                warn!("🗃️ Order {} carries a different payment reference", current.order_number);
                Err(OrderStoreError::ReferenceMismatch(order_id))
            };
        };
        let items = orders::fetch_order_items(order_id, &mut tx).await?;
        for item in &items {
            let ok = catalog::decrement_stock(item.product_id, item.variant_id, item.quantity, &mut tx).await?;
            if !ok {
                warn!(
                    "🗃️ Not enough stock to cover {} x product #{} (variant {:?}) on order {}. Rolling back.",
                    item.quantity, item.product_id, item.variant_id, order.order_number
                );
                tx.rollback().await?;
                return Err(OrderStoreError::InsufficientStock {
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                });
            }
        }
        if let Some(code) = order.promo_code.as_deref() {
            if !catalog::increment_promo_usage(code, &mut tx).await? {
                // A code applied at checkout was valid then. One supplied only now must be usable.
                let number = &order.order_number;
                if old_order.promo_code.as_deref() != Some(code) {
                    warn!("🗃️ Promo code {code} on order {number} is unknown or exhausted. Rolling back.");
                    tx.rollback().await?;
                    return Err(OrderStoreError::PromoCodeUnavailable(code.to_string()));
                }
                warn!("🗃️ Promo code {code} on order {number} is unknown or exhausted. Usage not recorded.");
            }
        }
        let old = format!("{}/{}", old_order.status, old_order.payment_status);
        let new = format!("{}/{}", order.status, order.payment_status);
        let actor = completion.actor.as_str();
        audit::insert_audit_entry(audit::ORDER_ENTITY, order_id, "PAYMENT_COMPLETED", Some(old), Some(new), actor, &mut tx)
            .await?;
        tx.commit().await?;
        info!(
            "🗃️ Order {} paid via {} [{}]. {} line items taken out of stock.",
            order.order_number,
            completion.gateway,
            completion.reference,
            items.len()
        );
        Ok(CompletionResult::Completed(order))
    }

    async fn mark_payment_failed(
        &self,
        order_id: i64,
        reference: &str,
        actor: &str,
    ) -> Result<Option<Order>, OrderStoreError> {
        let old_order = self.fetch_order(order_id).await?.ok_or(OrderStoreError::OrderNotFound(order_id))?;
        let mut tx = self.pool.begin().await?;
        let result = orders::mark_payment_failed(order_id, &mut tx).await?;
        if let Some(order) = &result {
            let old = Some(old_order.payment_status.to_string());
            let new = Some(format!("{} [{reference}]", order.payment_status));
            audit::insert_audit_entry(audit::ORDER_ENTITY, order_id, "PAYMENT_FAILED", old, new, actor, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn set_payment_reference(&self, order_id: i64, reference: &str) -> Result<bool, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::set_payment_reference(order_id, reference, &mut tx).await.map_err(|e| {
            if e.is_unique_violation_on("payment_reference") {
                OrderStoreError::PaymentReferenceInUse(reference.to_string())
            } else {
                e.into()
            }
        })?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
        actor: &str,
    ) -> Result<OrderChanged, OrderStoreError> {
        let old_order = self.fetch_order(order_id).await?.ok_or(OrderStoreError::OrderNotFound(order_id))?;
        let mut tx = self.pool.begin().await?;
        let new_order = orders::update_order_status(order_id, from, to, &mut tx)
            .await?
            .ok_or(OrderStoreError::StatusChanged { id: order_id, expected: from })?;
        if from == OrderStatusType::Processing && to == OrderStatusType::Cancelled {
            let items = orders::fetch_order_items(order_id, &mut tx).await?;
            for item in &items {
                catalog::restock(item.product_id, item.variant_id, item.quantity, &mut tx).await?;
            }
            debug!("🗃️ {} items from order {} returned to stock", items.len(), new_order.order_number);
        }
        audit::insert_audit_entry(
            audit::ORDER_ENTITY,
            order_id,
            "STATUS_CHANGED",
            Some(from.to_string()),
            Some(to.to_string()),
            actor,
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        Ok(OrderChanged::new(old_order, new_order))
    }

    async fn expire_unpaid_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let expired = orders::cancel_unpaid_orders(cutoff, &mut tx).await?;
        for order in &expired {
            audit::insert_audit_entry(
                audit::ORDER_ENTITY,
                order.id,
                "EXPIRED",
                Some(OrderStatusType::Pending.to_string()),
                Some(order.status.to_string()),
                "system",
                &mut tx,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_reference(reference, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_audit_log(&self, order_id: i64) -> Result<Vec<AuditLogEntry>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit::fetch_audit_log(audit::ORDER_ENTITY, order_id, &mut conn).await?;
        Ok(entries)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let product = catalog::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Product #{} ({}) created with {} units in stock", product.id, product.name, product.stock);
        Ok(product)
    }

    async fn insert_variant(&self, product_id: i64, variant: NewVariant) -> Result<ProductVariant, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if catalog::fetch_product(product_id, &mut tx).await?.is_none() {
            return Err(OrderStoreError::ProductNotFound(product_id));
        }
        let variant = catalog::insert_variant(product_id, variant, &mut tx).await?;
        tx.commit().await?;
        Ok(variant)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_variant(&self, variant_id: i64) -> Result<Option<ProductVariant>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let variant = catalog::fetch_variant(variant_id, &mut conn).await?;
        Ok(variant)
    }

    async fn fetch_variants_for_product(&self, product_id: i64) -> Result<Vec<ProductVariant>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let variants = catalog::fetch_variants_for_product(product_id, &mut conn).await?;
        Ok(variants)
    }

    async fn insert_promo_code(&self, promo: NewPromoCode) -> Result<PromoCode, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let code = promo.code.clone();
        let promo = catalog::insert_promo_code(promo, &mut tx).await.map_err(|e| {
            if e.is_unique_violation() {
                OrderStoreError::DuplicatePromoCode(code)
            } else {
                e.into()
            }
        })?;
        tx.commit().await?;
        Ok(promo)
    }

    async fn fetch_promo_code(&self, code: &str) -> Result<Option<PromoCode>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let promo = catalog::fetch_promo_code(code, &mut conn).await?;
        Ok(promo)
    }
}

impl NotificationManagement for SqliteDatabase {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let result = notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_notifications_for_user(&self, user_id: i64) -> Result<Vec<Notification>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = notifications::fetch_notifications_for_user(user_id, &mut conn).await?;
        Ok(result)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `SF_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date using the migrations embedded in the binary.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
