//! Token issuance.
//!
//! One call per token request: ask the authenticator for a verdict, build a
//! fresh claim set for granted clients and sign it. Nothing here is retried;
//! every failure is reported to the caller once.

use crate::actors::AuthenticatorHandle;
use crate::config::IssuerConfig;
use crate::crypto::JwtSigner;
use crate::errors::IdpError;
use crate::models::{AuthenticationRequest, AuthenticationResult, TokenResponse};
use crate::observability::hash_for_correlation;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use common::jwt::IdpClaims;
use tracing::{debug, error, info, instrument, warn};

/// `token_type` of every issued token.
pub const TOKEN_TYPE: &str = "bearer";

/// Build the claim set for an authenticated subject.
///
/// `iat` and `nbf` are `now`; `exp` is `now` plus the configured lifetime.
/// All three are epoch seconds, independent of the offset carried by `now`.
///
/// # Errors
///
/// `Internal` if the expiry instant is not representable.
pub fn build_claims(
    issuer: &IssuerConfig,
    subject: &str,
    roles: Vec<String>,
    now: DateTime<FixedOffset>,
) -> Result<IdpClaims, IdpError> {
    let issued_at = now.timestamp();
    let expires_at = Duration::try_seconds(issuer.expires_in_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            IdpError::Internal(format!(
                "token lifetime {}s overflows the expiry time",
                issuer.expires_in_seconds
            ))
        })?;

    Ok(IdpClaims {
        iss: issuer.issuer_claim.clone(),
        sub: subject.to_string(),
        iat: issued_at,
        nbf: issued_at,
        exp: expires_at.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
        roles,
    })
}

/// Current instant in the issuer's configured zone.
pub fn issuer_now(issuer: &IssuerConfig) -> DateTime<FixedOffset> {
    issuer.time_zone.localize(Utc::now())
}

/// Sign a token for an authentication verdict.
///
/// A denied verdict yields `InvalidCredentials`.
#[instrument(skip_all)]
pub fn issue_token(
    signer: &JwtSigner,
    issuer: &IssuerConfig,
    verdict: AuthenticationResult,
) -> Result<TokenResponse, IdpError> {
    if !verdict.authenticated {
        return Err(IdpError::InvalidCredentials);
    }

    let now = issuer_now(issuer);
    let claims = build_claims(
        issuer,
        &verdict.subject,
        verdict.roles.unwrap_or_default(),
        now,
    )?;

    let access_token = signer.sign(&claims)?;

    let expires_in = u64::try_from(issuer.expires_in_seconds).map_err(|_| {
        IdpError::Internal(format!(
            "token lifetime {} does not fit expires_in",
            issuer.expires_in_seconds
        ))
    })?;

    info!(
        target: "idp.token",
        client_id_hash = %hash_for_correlation(&claims.sub),
        jti = %claims.jti,
        issued_at = %now.to_rfc3339(),
        time_zone = %issuer.time_zone.name(),
        expires_in = expires_in,
        "Issued token"
    );

    Ok(TokenResponse {
        access_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in,
    })
}

/// Full issuance pipeline for one token request.
pub async fn authenticate_and_issue(
    authenticator: &AuthenticatorHandle,
    signer: &JwtSigner,
    issuer: &IssuerConfig,
    request: AuthenticationRequest,
) -> Result<TokenResponse, IdpError> {
    let client_hash = hash_for_correlation(&request.client_id);
    debug!(target: "idp.token", client_id_hash = %client_hash, "Authenticating client");

    let verdict = authenticator.authenticate(request).await.map_err(|e| {
        error!(
            target: "idp.token",
            client_id_hash = %client_hash,
            error = %e,
            "No verdict from authenticator"
        );
        e
    })?;

    if !verdict.authenticated {
        warn!(target: "idp.token", client_id_hash = %client_hash, "Token request denied");
        return Err(IdpError::InvalidCredentials);
    }

    issue_token(signer, issuer, verdict).map_err(|e| {
        error!(
            target: "idp.token",
            client_id_hash = %client_hash,
            error = %e,
            "Token issuance failed"
        );
        e
    })
}
