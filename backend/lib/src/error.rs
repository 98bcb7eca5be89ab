use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Not a registered user of the service")]
    AuthorizationDenied,

    #[error("Authorization registry unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::Auth(AuthError::Signing(msg)) => {
                error!(target: "error::into_response", error = %msg, "Token signing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
            Error::Auth(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Error::AuthorizationDenied => (
                StatusCode::BAD_REQUEST,
                "Not a registered user of the service".to_string(),
            ),
            Error::CollaboratorUnavailable(msg) => {
                // logged, never returned
                error!(target: "error::into_response", error = %msg, "Registry lookup failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Authorization registry unavailable".to_string(),
                )
            }
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Config(msg) => {
                error!(target: "error::into_response", error = %msg, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
            Error::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
