use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use order_engine::{events::EventProducers, CatalogApi, NotificationApi, OrderFlowApi, OrderQueryApi, SqliteDatabase};

use crate::{
    auth::TokenValidator,
    config::{ServerConfig, ServerOptions},
    errors::{json_config, path_config, ServerError},
    expiry_worker::start_expiry_worker,
    integrations::{gateways::GatewayVerifier, notifications::create_notification_handlers},
    middleware::{SignatureScheme, WebhookSignatureFactory},
    routes::{
        health,
        AddVariantRoute,
        CompleteOrderRoute,
        CreateOrderRoute,
        CreateProductRoute,
        CreatePromoCodeRoute,
        MyNotificationsRoute,
        MyOrdersRoute,
        OrderAuditLogRoute,
        OrderByIdRoute,
        ProductByIdRoute,
        UpdateOrderStatusRoute,
    },
    webhook_routes::{PaystackWebhookRoute, StripeWebhookRoute},
};

const MAX_DB_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = if config.database_url.is_empty() {
        SqliteDatabase::new(MAX_DB_CONNECTIONS).await
    } else {
        SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS).await
    }
    .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers(db.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    // The worker runs for the lifetime of the process
    let _expiry_worker = start_expiry_worker(db.clone(), producers.clone(), config.unpaid_order_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let verifier = GatewayVerifier::new(&config.paystack, &config.flutterwave, &config.stripe);
    let paystack_scheme = SignatureScheme::Paystack { secret: config.paystack.secret_key.clone() };
    let stripe_scheme = SignatureScheme::Stripe {
        secret: config.stripe.webhook_secret.clone(),
        tolerance_secs: config.stripe.tolerance_secs,
    };
    let check_signatures = config.webhook_signature_checks;
    let options = ServerOptions::from_config(&config);
    let auth = config.auth.clone();
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let notification_api = NotificationApi::new(db.clone());
        let validator = TokenValidator::new(&auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sf::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(notification_api))
            .app_data(web::Data::new(verifier.clone()))
            .app_data(web::Data::new(validator))
            .app_data(web::Data::new(options))
            .app_data(json_config())
            .app_data(path_config());
        // Webhook scopes must be registered before the general /api scope, which would otherwise swallow them
        let paystack_scope = web::scope("/api/webhooks/paystack")
            .wrap(WebhookSignatureFactory::new(paystack_scheme.clone(), check_signatures))
            .service(PaystackWebhookRoute::<SqliteDatabase>::new());
        let stripe_scope = web::scope("/api/webhooks/stripe")
            .wrap(WebhookSignatureFactory::new(stripe_scheme.clone(), check_signatures))
            .service(StripeWebhookRoute::<SqliteDatabase>::new());
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CompleteOrderRoute::<SqliteDatabase, GatewayVerifier>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(OrderAuditLogRoute::<SqliteDatabase>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(AddVariantRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(CreatePromoCodeRoute::<SqliteDatabase>::new())
            .service(MyNotificationsRoute::<SqliteDatabase>::new());
        app.service(health).service(paystack_scope).service(stripe_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Storefront server listening on {}:{}", config.host, config.port);
    Ok(srv)
}
