use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, NewPromoCode, NewVariant, Product, ProductVariant, PromoCode},
    sqlite::SqliteDatabaseError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, SqliteDatabaseError> {
    let product = sqlx::query_as(
        "INSERT INTO products (name, sku, price, currency, stock) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(product.name)
    .bind(product.sku)
    .bind(product.price)
    .bind(product.currency)
    .bind(product.stock)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn insert_variant(
    product_id: i64,
    variant: NewVariant,
    conn: &mut SqliteConnection,
) -> Result<ProductVariant, SqliteDatabaseError> {
    let variant = sqlx::query_as(
        "INSERT INTO product_variants (product_id, name, sku, price, stock) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(product_id)
    .bind(variant.name)
    .bind(variant.sku)
    .bind(variant.price)
    .bind(variant.stock)
    .fetch_one(conn)
    .await?;
    Ok(variant)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, SqliteDatabaseError> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_variant(id: i64, conn: &mut SqliteConnection) -> Result<Option<ProductVariant>, SqliteDatabaseError> {
    let variant = sqlx::query_as("SELECT * FROM product_variants WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(variant)
}

pub async fn fetch_variants_for_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ProductVariant>, SqliteDatabaseError> {
    let variants = sqlx::query_as("SELECT * FROM product_variants WHERE product_id = $1 ORDER BY id ASC")
        .bind(product_id)
        .fetch_all(conn)
        .await?;
    Ok(variants)
}

/// Takes `quantity` units out of stock. Variant stock is used when a variant is given, otherwise the product's own
/// stock. Returns `false`, and changes nothing, if there are not enough units on hand.
pub(crate) async fn decrement_stock(
    product_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = match variant_id {
        Some(vid) => {
            sqlx::query(
                "UPDATE product_variants SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND \
                 product_id = $3 AND stock >= $1",
            )
            .bind(quantity)
            .bind(vid)
            .bind(product_id)
            .execute(conn)
            .await?
        },
        None => {
            sqlx::query(
                "UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND stock >= $1",
            )
            .bind(quantity)
            .bind(product_id)
            .execute(conn)
            .await?
        },
    };
    let ok = result.rows_affected() == 1;
    trace!("🗃️ Stock decrement of {quantity} for product #{product_id} (variant {variant_id:?}): {ok}");
    Ok(ok)
}

pub(crate) async fn restock(
    product_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    match variant_id {
        Some(vid) => {
            sqlx::query(
                "UPDATE product_variants SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND \
                 product_id = $3",
            )
            .bind(quantity)
            .bind(vid)
            .bind(product_id)
            .execute(conn)
            .await?
        },
        None => {
            sqlx::query("UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
                .bind(quantity)
                .bind(product_id)
                .execute(conn)
                .await?
        },
    };
    Ok(())
}

pub async fn insert_promo_code(promo: NewPromoCode, conn: &mut SqliteConnection) -> Result<PromoCode, SqliteDatabaseError> {
    let promo = sqlx::query_as("INSERT INTO promo_codes (code, max_uses) VALUES ($1, $2) RETURNING *")
        .bind(promo.code)
        .bind(promo.max_uses)
        .fetch_one(conn)
        .await?;
    Ok(promo)
}

pub async fn fetch_promo_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<PromoCode>, SqliteDatabaseError> {
    let promo = sqlx::query_as("SELECT * FROM promo_codes WHERE code = $1").bind(code).fetch_optional(conn).await?;
    Ok(promo)
}

/// Bumps the usage counter of an active promo code. Returns `false` if the code is unknown, inactive or used up.
pub(crate) async fn increment_promo_usage(code: &str, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE promo_codes SET usage_count = usage_count + 1 WHERE code = $1 AND active AND (max_uses IS NULL OR \
         usage_count < max_uses)",
    )
    .bind(code)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
