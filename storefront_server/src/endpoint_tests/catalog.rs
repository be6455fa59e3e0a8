use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use mockall::predicate::eq;
use order_engine::{
    db_types::{Cents, Product, ProductVariant, PromoCode},
    CatalogApi,
};
use serde_json::Value;

use super::{
    helpers::{admin_token, customer_token, error_message, get_request, post_request},
    mocks::MockCatalogManager,
};
use crate::routes::{AddVariantRoute, CreateProductRoute, CreatePromoCodeRoute, ProductByIdRoute};

fn configure(db: MockCatalogManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CatalogApi::new(db)))
            .service(CreateProductRoute::<MockCatalogManager>::new())
            .service(AddVariantRoute::<MockCatalogManager>::new())
            .service(ProductByIdRoute::<MockCatalogManager>::new())
            .service(CreatePromoCodeRoute::<MockCatalogManager>::new());
    }
}

fn shirt(id: i64) -> Product {
    Product {
        id,
        name: "Shirt".into(),
        sku: Some("SH-01".into()),
        price: Cents::from(2999),
        currency: "NGN".into(),
        stock: 10,
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn size(id: i64, product_id: i64, name: &str) -> ProductVariant {
    ProductVariant {
        id,
        product_id,
        name: name.into(),
        sku: None,
        price: Cents::from(3499),
        stock: 4,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[actix_web::test]
async fn create_product_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCatalogManager::new();
    db.expect_insert_product()
        .withf(|p| p.name == "Shirt" && p.price == Cents::from(2999) && p.currency == "NGN" && p.stock == 10)
        .times(1)
        .returning(|_| Ok(shirt(1)));
    let body = r#"{"name":"Shirt","sku":"SH-01","price":2999,"stock":10}"#;
    let (status, body) = post_request(&admin_token(), "/products", body, configure(db)).await;
    assert_eq!(status, StatusCode::CREATED);
    let product: Product = serde_json::from_str(&body).unwrap();
    assert_eq!(product.id, 1);
}

#[actix_web::test]
async fn create_product_requires_admin() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"name":"Shirt","price":2999}"#;
    let (status, _) = post_request(&customer_token(7), "/products", body, configure(MockCatalogManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = post_request("", "/products", body, configure(MockCatalogManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_product_with_negative_price() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCatalogManager::new();
    db.expect_insert_product().never();
    let body = r#"{"name":"Shirt","price":-1}"#;
    let (status, body) = post_request(&admin_token(), "/products", body, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Price cannot be negative");
}

#[actix_web::test]
async fn malformed_product_body() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&admin_token(), "/products", r#"{"name":"#, configure(MockCatalogManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Could not read request body"));
}

#[actix_web::test]
async fn add_variant_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCatalogManager::new();
    db.expect_insert_variant()
        .withf(|product_id, v| *product_id == 1 && v.name == "XL")
        .times(1)
        .returning(|product_id, v| Ok(size(5, product_id, &v.name)));
    let body = r#"{"name":"XL","price":3499,"stock":4}"#;
    let (status, body) = post_request(&admin_token(), "/products/1/variants", body, configure(db)).await;
    assert_eq!(status, StatusCode::CREATED);
    let variant: ProductVariant = serde_json::from_str(&body).unwrap();
    assert_eq!(variant.id, 5);
    assert_eq!(variant.product_id, 1);
}

#[actix_web::test]
async fn fetch_product_is_public() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCatalogManager::new();
    db.expect_fetch_product().with(eq(1)).returning(|id| Ok(Some(shirt(id))));
    db.expect_fetch_variants_for_product()
        .with(eq(1))
        .returning(|id| Ok(vec![size(5, id, "L"), size(6, id, "XL")]));
    let (status, body) = get_request("", "/products/1", configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["name"], "Shirt");
    assert_eq!(value["variants"].as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn fetch_unknown_product() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCatalogManager::new();
    db.expect_fetch_product().returning(|_| Ok(None));
    let (status, body) = get_request("", "/products/42", configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "Product #42 does not exist");
}

#[actix_web::test]
async fn create_promo_code() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCatalogManager::new();
    db.expect_insert_promo_code().withf(|p| p.code == "WELCOME10" && p.max_uses == Some(100)).returning(|p| {
        Ok(PromoCode {
            id: 1,
            code: p.code,
            usage_count: 0,
            max_uses: p.max_uses,
            active: true,
            created_at: Utc::now(),
        })
    });
    let body = r#"{"code":"  WELCOME10 ","maxUses":100}"#;
    let (status, body) = post_request(&admin_token(), "/promo_codes", body, configure(db)).await;
    assert_eq!(status, StatusCode::CREATED);
    let promo: PromoCode = serde_json::from_str(&body).unwrap();
    assert_eq!(promo.code, "WELCOME10");
    assert_eq!(promo.usage_count, 0);
}
