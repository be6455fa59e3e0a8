use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, NewPromoCode, NewVariant, Product, ProductVariant, PromoCode},
    order_api::{errors::OrderFlowError, order_objects::ProductWithVariants},
    traits::CatalogManagement,
};

/// Catalog administration: products, their variants and promo codes.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, OrderFlowError> {
        if product.name.trim().is_empty() {
            return Err(OrderFlowError::ValidationError("Product name cannot be empty".into()));
        }
        check_price_and_stock(product.price.value(), product.stock)?;
        let product = self.db.insert_product(product).await?;
        info!("🛍️ Product #{} ({}) created", product.id, product.name);
        Ok(product)
    }

    pub async fn add_variant(&self, product_id: i64, variant: NewVariant) -> Result<ProductVariant, OrderFlowError> {
        if variant.name.trim().is_empty() {
            return Err(OrderFlowError::ValidationError("Variant name cannot be empty".into()));
        }
        check_price_and_stock(variant.price.value(), variant.stock)?;
        let variant = self.db.insert_variant(product_id, variant).await?;
        info!("🛍️ Variant #{} ({}) added to product #{product_id}", variant.id, variant.name);
        Ok(variant)
    }

    pub async fn product_with_variants(&self, product_id: i64) -> Result<ProductWithVariants, OrderFlowError> {
        let product = self.db.fetch_product(product_id).await?.ok_or(OrderFlowError::ProductNotFound(product_id))?;
        let variants = self.db.fetch_variants_for_product(product_id).await?;
        Ok(ProductWithVariants { product, variants })
    }

    pub async fn create_promo_code(&self, mut promo: NewPromoCode) -> Result<PromoCode, OrderFlowError> {
        promo.code = promo.code.trim().to_string();
        if promo.code.is_empty() {
            return Err(OrderFlowError::ValidationError("Promo code cannot be empty".into()));
        }
        if promo.max_uses.is_some_and(|m| m <= 0) {
            return Err(OrderFlowError::ValidationError("maxUses must be positive".into()));
        }
        let promo = self.db.insert_promo_code(promo).await?;
        info!("🛍️ Promo code {} created", promo.code);
        Ok(promo)
    }
}

fn check_price_and_stock(price: i64, stock: i64) -> Result<(), OrderFlowError> {
    if price < 0 {
        return Err(OrderFlowError::ValidationError("Price cannot be negative".into()));
    }
    if stock < 0 {
        return Err(OrderFlowError::ValidationError("Stock cannot be negative".into()));
    }
    Ok(())
}
