use crate::{
    db_types::{NewProduct, NewPromoCode, NewVariant, Product, ProductVariant, PromoCode},
    traits::OrderStoreError,
};

#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, OrderStoreError>;

    /// Adds a variant to an existing product. Returns [`OrderStoreError::ProductNotFound`] if the product does not
    /// exist.
    async fn insert_variant(&self, product_id: i64, variant: NewVariant) -> Result<ProductVariant, OrderStoreError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, OrderStoreError>;

    async fn fetch_variant(&self, variant_id: i64) -> Result<Option<ProductVariant>, OrderStoreError>;

    async fn fetch_variants_for_product(&self, product_id: i64) -> Result<Vec<ProductVariant>, OrderStoreError>;

    async fn insert_promo_code(&self, promo: NewPromoCode) -> Result<PromoCode, OrderStoreError>;

    async fn fetch_promo_code(&self, code: &str) -> Result<Option<PromoCode>, OrderStoreError>;
}
