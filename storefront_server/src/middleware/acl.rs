//! Access control list middleware.
//! This middleware can be placed on any route or service.
//!
//! It validates the request's bearer token and then checks the roles in the token against the roles the route
//! requires. Requests without a valid token are rejected with 401 Unauthorized, and requests from users without the
//! required roles with 403 Forbidden. The validated claims are stored in the request extensions for the handler.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;
use order_engine::db_types::Role;

use crate::{auth::JwtClaims, errors::ServerError};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let claims = req.extract::<JwtClaims>().await.map_err(|e| {
                debug!("🔐️ Denying access to {}. {e}", req.path());
                e
            })?;
            if required_roles.iter().all(|role| claims.roles.contains(role)) {
                req.extensions_mut().insert(claims);
                service.call(req).await
            } else {
                warn!("🔐️ User {} does not have the roles required for {}", claims.sub, req.path());
                Err(ServerError::InsufficientPermissions("Insufficient permissions.".into()).into())
            }
        })
    }
}
