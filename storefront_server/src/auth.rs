//! Bearer-token authentication.
//!
//! Access tokens are HS256 JWTs issued by the marketplace's login service and signed with the shared
//! `SF_JWT_SECRET`. The subject is the user id, and the `roles` claim carries the user's roles.
//!
//! [`JwtClaims`] is an actix extractor. Handlers that require a login take `JwtClaims` and fail with a 401 if no valid
//! token is present. Handlers that serve guests as well take `Option<JwtClaims>`.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use order_engine::{db_types::Role, order_objects::Caller};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(24);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id
    pub sub: i64,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn caller(&self) -> Caller {
        Caller::new(self.sub, self.roles.clone())
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // The ACL middleware may already have validated the token
        if let Some(claims) = req.extensions().get::<JwtClaims>() {
            return ready(Ok(claims.clone()));
        }
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let header = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".into()))?;
    let validator = req.app_data::<web::Data<TokenValidator>>().ok_or_else(|| {
        error!("🔐️ No token validator has been registered with the server");
        ServerError::InitializeError("Token validator is not configured".into())
    })?;
    let claims = validator.validate(token)?;
    trace!("🔐️ Access token validated for user {}", claims.sub);
    Ok(claims)
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes()), validation: validation() }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("🔐️ Rejected access token. {e}");
            AuthError::ValidationError(e.to_string())
        })?;
        Ok(data.claims)
    }
}

/// Signs access tokens with the shared secret. Production tokens come from the login service; this is used by
/// tooling and tests that need to act as a given user.
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    pub fn issue_token(&self, user_id: i64, roles: Vec<Role>, lifetime: Option<Duration>) -> Result<String, AuthError> {
        let now = Utc::now();
        let lifetime = lifetime.unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let claims = JwtClaims { sub: user_id, roles, iat: now.timestamp(), exp: (now + lifetime).timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::CouldNotIssueToken(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("an-hs256-test-secret-that-is-long-enough")
    }

    #[test]
    fn issue_and_validate() {
        let token = TokenIssuer::new(&config()).issue_token(42, vec![Role::Admin], None).unwrap();
        let claims = TokenValidator::new(&config()).validate(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert!(claims.caller().is_admin());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = TokenIssuer::new(&config()).issue_token(42, vec![], Some(Duration::seconds(-120))).unwrap();
        let err = TokenValidator::new(&config()).validate(&token).unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = AuthConfig::new("some-other-secret-for-some-other-service");
        let token = TokenIssuer::new(&other).issue_token(42, vec![Role::Customer], None).unwrap();
        assert!(TokenValidator::new(&config()).validate(&token).is_err());
    }
}
