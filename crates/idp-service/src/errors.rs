use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdpError {
    #[error("Malformed token request")]
    MalformedRequest,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("The access token is invalid or expired")]
    InvalidToken(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Authenticator unavailable: {0}")]
    AuthenticatorUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdpError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IdpError::MalformedRequest => StatusCode::BAD_REQUEST,
            IdpError::InvalidCredentials | IdpError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            IdpError::AuthenticatorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            IdpError::Signing(_) | IdpError::Configuration(_) | IdpError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error responses carry a status and an empty body.
impl IntoResponse for IdpError {
    fn into_response(self) -> Response {
        self.status_code().into_response()
    }
}
