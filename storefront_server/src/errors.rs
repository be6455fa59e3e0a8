use actix_web::{
    error::{JsonPayloadError, PathError, ResponseError},
    http::{header::ContentType, StatusCode},
    web,
    HttpRequest,
    HttpResponse,
};
use log::debug;
use order_engine::OrderFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    OrderFlowError(#[from] OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
                AuthError::CouldNotIssueToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::OrderFlowError(e) => match e {
                OrderFlowError::ValidationError(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::ReferenceMismatch => StatusCode::BAD_REQUEST,
                OrderFlowError::ReferenceInUse(_) => StatusCode::CONFLICT,
                OrderFlowError::OrderNotPayable(_) => StatusCode::CONFLICT,
                OrderFlowError::VerificationFailed(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::PaymentNotSuccessful(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
                OrderFlowError::CurrencyMismatch { .. } => StatusCode::BAD_REQUEST,
                OrderFlowError::StatusUnchanged(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::Unauthenticated => StatusCode::UNAUTHORIZED,
                OrderFlowError::Forbidden => StatusCode::FORBIDDEN,
                OrderFlowError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::InsufficientStock(_) => StatusCode::CONFLICT,
                OrderFlowError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
                OrderFlowError::Conflict(_) => StatusCode::CONFLICT,
                OrderFlowError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Webhook signature check failed. {0}")]
    InvalidSignature(String),
    #[error("Could not issue access token. {0}")]
    CouldNotIssueToken(String),
}

/// Routes JSON body extraction failures into the standard error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        debug!("💻️ Rejecting request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

/// Routes path parameter failures (e.g. a non-numeric order id) into the standard error envelope.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err: PathError, _req: &HttpRequest| {
        debug!("💻️ Rejecting request path. {err}");
        ServerError::InvalidRequestPath(err.to_string()).into()
    })
}
