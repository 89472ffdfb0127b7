use crate::actors::AuthenticatorHandle;
use crate::config::IssuerConfig;
use crate::crypto::JwtSigner;
use crate::errors::IdpError;
use crate::models::{AuthenticationRequest, TokenResponse};
use crate::observability::metrics;
use crate::services::token_service;
use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use common::secret::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Form body of a token request.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub authenticator: AuthenticatorHandle,
    pub signer: Arc<JwtSigner>,
    pub issuer: IssuerConfig,
}

/// Handle a client-credentials token request
///
/// POST /api/oauth2/token
///
/// A body that does not decode as a form with `client_id` and
/// `client_secret` is rejected with 400 before the authenticator is asked.
pub async fn handle_token(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, IdpError> {
    let start = Instant::now();

    let result = match form {
        Ok(Form(payload)) => {
            let request = AuthenticationRequest {
                client_id: payload.client_id,
                client_secret: payload.client_secret,
            };
            token_service::authenticate_and_issue(
                &state.authenticator,
                &state.signer,
                &state.issuer,
                request,
            )
            .await
        }
        Err(rejection) => {
            debug!(target: "idp.token", reason = %rejection, "Malformed token request");
            Err(IdpError::MalformedRequest)
        }
    };

    metrics::record_token_issuance(outcome_label(&result), start.elapsed());

    result.map(Json)
}

/// Metric label for a token request outcome.
fn outcome_label(result: &Result<TokenResponse, IdpError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(IdpError::MalformedRequest) => "malformed",
        Err(IdpError::InvalidCredentials) => "denied",
        Err(IdpError::AuthenticatorUnavailable(_)) => "unavailable",
        Err(_) => "error",
    }
}
