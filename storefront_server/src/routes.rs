//! Request handler definitions
//!
//! Define each route and its handler here. Webhook handlers live in [`crate::webhook_routes`].
//!
//! Handlers are generic over the database backend (and, for completion, the payment verifier) so that they can be
//! exercised against mocks. Since each worker thread processes its requests sequentially, handlers must never block:
//! all I/O goes through the async engine APIs.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use order_engine::{
    db_types::{NewProduct, NewPromoCode, NewVariant, Role},
    order_objects::CompleteOrderRequest,
    traits::{CatalogManagement, NotificationManagement, OrderManagement, PaymentGatewayDatabase},
    CatalogApi,
    NotificationApi,
    OrderFlowApi,
    OrderQueryApi,
    PaymentVerifier,
};

use crate::{
    auth::JwtClaims,
    data_objects::{CheckoutParams, CompleteOrderParams, ModifyStatusParams, OrderCompletionResponse},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    // One backend type that must implement all the listed traits
    ($name:ident => $method:ident $path:literal impl $first:ident $(+ $rest:ident)+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $first $(+ $rest)+ + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    // One type parameter per trait, in the order given
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/orders" impl PaymentGatewayDatabase + CatalogManagement);
/// Route handler for checkout.
///
/// Creates a provisional order from the cart lines in the body. Prices are snapshotted from the catalog and the
/// totals are computed here, never taken from the client. If a valid access token is supplied, the order belongs to
/// that user. Otherwise it is a guest order.
pub async fn create_order<B>(
    claims: Option<JwtClaims>,
    body: web::Json<CheckoutParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase + CatalogManagement,
{
    let user_id = claims.map(|c| c.sub);
    debug!("💻️ POST create_order for {}", user_id.map_or_else(|| "guest".to_string(), |u| format!("user {u}")));
    let request = body.into_inner().into_request(user_id)?;
    let order = api.create_order(request).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderManagement);
/// Route handler for the orders endpoint
///
/// Authenticated users fetch their own orders, newest first.
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for user {}", claims.sub);
    let orders = api.orders_for_user(claims.sub).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement);
/// Route handler for `/orders/{order_id}`. Returns the order and its line items.
///
/// Owned orders are visible to their owner and to admins. Guest orders are visible to anyone holding the id.
pub async fn order_by_id<B: OrderManagement>(
    claims: Option<JwtClaims>,
    path: web::Path<i64>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id}");
    let caller = claims.map(|c| c.caller());
    let order = api.order_with_items(order_id, caller.as_ref()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(complete_order => Patch "/orders/{order_id}/complete" impl PaymentGatewayDatabase, PaymentVerifier);
/// Route handler for order completion.
///
/// Called by the storefront once the customer returns from the gateway's payment page. The body names the gateway
/// and the payment reference. The payment is verified with the gateway before the order is marked as paid and stock
/// is taken. Completing an order that is already paid is a no-op that still succeeds.
pub async fn complete_order<B, V>(
    claims: Option<JwtClaims>,
    path: web::Path<i64>,
    body: web::Json<CompleteOrderParams>,
    api: web::Data<OrderFlowApi<B>>,
    verifier: web::Data<V>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    V: PaymentVerifier,
{
    let order_id = path.into_inner();
    debug!("💻️ PATCH complete_order for order {order_id}");
    let request = CompleteOrderRequest::try_from(body.into_inner())?;
    let caller = claims.map(|c| c.caller());
    let result = api.complete_order(verifier.as_ref(), order_id, caller.as_ref(), request).await?;
    Ok(HttpResponse::Ok().json(OrderCompletionResponse::from(result)))
}

route!(update_order_status => Patch "/orders/{order_id}/status" impl PaymentGatewayDatabase where requires [Role::Admin]);
/// Admin route to move an order along its fulfilment lifecycle, or to cancel it.
pub async fn update_order_status<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ModifyStatusParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let status = body.status()?;
    info!("💻️ User {} is setting order {order_id} to {status}", claims.sub);
    let order = api.modify_order_status(order_id, status, &claims.caller().actor()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_audit_log => Get "/orders/{order_id}/audit" impl OrderManagement where requires [Role::Admin]);
pub async fn order_audit_log<B: OrderManagement>(
    path: web::Path<i64>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET audit log for order {order_id}");
    let entries = api.audit_log(order_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

//----------------------------------------------   Catalog  ----------------------------------------------------

route!(create_product => Post "/products" impl CatalogManagement where requires [Role::Admin]);
pub async fn create_product<B: CatalogManagement>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST create_product");
    let product = api.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(add_variant => Post "/products/{product_id}/variants" impl CatalogManagement where requires [Role::Admin]);
pub async fn add_variant<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<NewVariant>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ POST add_variant for product {product_id}");
    let variant = api.add_variant(product_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(variant))
}

route!(product_by_id => Get "/products/{product_id}" impl CatalogManagement);
/// Public route. Returns the product with all its variants.
pub async fn product_by_id<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ GET product {product_id}");
    let product = api.product_with_variants(product_id).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(create_promo_code => Post "/promo_codes" impl CatalogManagement where requires [Role::Admin]);
pub async fn create_promo_code<B: CatalogManagement>(
    body: web::Json<NewPromoCode>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST create_promo_code");
    let promo = api.create_promo_code(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(promo))
}

//----------------------------------------------   Notifications  ----------------------------------------------------

route!(my_notifications => Get "/notifications" impl NotificationManagement);
pub async fn my_notifications<B: NotificationManagement>(
    claims: JwtClaims,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET notifications for user {}", claims.sub);
    let notifications = api.notifications_for_user(claims.sub).await?;
    Ok(HttpResponse::Ok().json(notifications))
}
