use mockall::mock;
use order_engine::{
    db_types::{
        AuditLogEntry,
        NewProduct,
        NewPromoCode,
        NewVariant,
        Order,
        OrderItem,
        PaymentGateway,
        Product,
        ProductVariant,
        PromoCode,
    },
    traits::{CatalogManagement, OrderManagement, OrderStoreError},
    PaymentVerifier,
    VerificationError,
    VerifiedPayment,
};

mock! {
    pub OrderManager {}
    impl OrderManagement for OrderManager {
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_reference(&self, reference: &str) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderStoreError>;
        async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError>;
        async fn fetch_audit_log(&self, order_id: i64) -> Result<Vec<AuditLogEntry>, OrderStoreError>;
    }
}

mock! {
    pub CatalogManager {}
    impl CatalogManagement for CatalogManager {
        async fn insert_product(&self, product: NewProduct) -> Result<Product, OrderStoreError>;
        async fn insert_variant(&self, product_id: i64, variant: NewVariant) -> Result<ProductVariant, OrderStoreError>;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, OrderStoreError>;
        async fn fetch_variant(&self, variant_id: i64) -> Result<Option<ProductVariant>, OrderStoreError>;
        async fn fetch_variants_for_product(&self, product_id: i64) -> Result<Vec<ProductVariant>, OrderStoreError>;
        async fn insert_promo_code(&self, promo: NewPromoCode) -> Result<PromoCode, OrderStoreError>;
        async fn fetch_promo_code(&self, code: &str) -> Result<Option<PromoCode>, OrderStoreError>;
    }
}

mock! {
    pub Verifier {}
    impl PaymentVerifier for Verifier {
        async fn verify_payment(
            &self,
            gateway: PaymentGateway,
            reference: &str,
        ) -> Result<VerifiedPayment, VerificationError>;
    }
}
