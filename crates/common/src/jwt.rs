//! JWT types and helpers shared between the issuer and relying parties.
//!
//! This module provides:
//! - The claim set carried by every issued bearer token
//! - Size limits for DoS prevention
//! - Clock skew constants for iat validation
//! - Decoding of PEM key bodies into DER bytes
//!
//! # Time Representation
//!
//! All numeric time claims (`iat`, `nbf`, `exp`) are integer seconds since the
//! Unix epoch (RFC 7519 `NumericDate`). Milliseconds and ISO-8601 strings are
//! never emitted.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected before any parsing or signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during JWT validation.
///
/// Messages are intentionally generic to prevent information leakage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claim set carried by a bearer token issued to an authenticated client.
///
/// # Fields
///
/// - `iss`: Issuer, taken from configuration
/// - `sub`: Subject (the authenticated `client_id`), redacted in Debug output
/// - `iat`: Issued-at timestamp (Unix epoch seconds)
/// - `nbf`: Not-before timestamp (Unix epoch seconds), equal to `iat`
/// - `exp`: Expiration timestamp (Unix epoch seconds)
/// - `jti`: Unique token identifier (random UUID)
/// - `roles`: Roles registered for the client, omitted when empty
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (client identifier) - redacted in Debug output.
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Unique token identifier.
    pub jti: String,

    /// Roles granted to the subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl fmt::Debug for IdpClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdpClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .field("roles", &self.roles)
            .finish()
    }
}

impl IdpClaims {
    /// Check if the token grants a specific role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Lifetime of the token in seconds (`exp - iat`).
    #[must_use]
    pub fn lifetime_seconds(&self) -> i64 {
        self.exp - self.iat
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Validate the `iat` (issued-at) claim against the current time.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Reject tokens above [`MAX_JWT_SIZE_BYTES`] before any parsing.
///
/// # Errors
///
/// Returns `JwtValidationError::TokenTooLarge` for oversized tokens.
pub fn check_token_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

/// Decode the base64 body of a PEM key into DER bytes.
///
/// Accepts either a full PEM document or an armor-free body. Lines starting
/// with `-----` are skipped and the remaining lines are concatenated before
/// decoding.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64 content cannot be decoded.
pub fn decode_pem_body(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let b64: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();

    STANDARD.decode(b64)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_claims() -> IdpClaims {
        IdpClaims {
            iss: "https://idp.example.com".to_string(),
            sub: "client-secret-id".to_string(),
            iat: 1_700_000_000,
            nbf: 1_700_000_000,
            exp: 1_700_003_600,
            jti: "0f8fad5b-d9cb-469f-a165-70867728950e".to_string(),
            roles: vec!["admin".to_string(), "reader".to_string()],
        }
    }

    #[test]
    fn test_default_clock_skew_is_5_minutes() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let debug = format!("{:?}", sample_claims());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("client-secret-id"));
        assert!(debug.contains("https://idp.example.com"));
    }

    #[test]
    fn test_claims_serialize_time_as_epoch_seconds() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(json["iat"], 1_700_000_000);
        assert_eq!(json["nbf"], 1_700_000_000);
        assert_eq!(json["exp"], 1_700_003_600);
        assert!(json["iat"].is_i64());
    }

    #[test]
    fn test_claims_without_roles_omit_field() {
        let mut claims = sample_claims();
        claims.roles.clear();
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("roles").is_none());

        let parsed: IdpClaims = serde_json::from_value(json).unwrap();
        assert!(parsed.roles.is_empty());
    }

    #[test]
    fn test_has_role() {
        let claims = sample_claims();
        assert!(claims.has_role("admin"));
        assert!(!claims.has_role("writer"));
        assert_eq!(claims.lifetime_seconds(), 3600);
    }

    #[test]
    fn test_validate_iat_within_skew() {
        let now = 1_700_000_000;
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());
        assert!(validate_iat_at(now - 10_000, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_past_skew_rejected() {
        let now = 1_700_000_000;
        assert_eq!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_check_token_size() {
        assert!(check_token_size(&"a".repeat(MAX_JWT_SIZE_BYTES)).is_ok());
        assert_eq!(
            check_token_size(&"a".repeat(MAX_JWT_SIZE_BYTES + 1)),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_decode_pem_body_with_and_without_armor() {
        let body = STANDARD.encode(b"key-bytes-for-test");
        let armored = format!("-----BEGIN PUBLIC KEY-----\n{body}\n-----END PUBLIC KEY-----");

        assert_eq!(decode_pem_body(&armored).unwrap(), b"key-bytes-for-test");
        assert_eq!(decode_pem_body(&body).unwrap(), b"key-bytes-for-test");
    }

    #[test]
    fn test_decode_pem_body_multiline() {
        let body = STANDARD.encode([7u8; 96]);
        let (first, second) = body.split_at(64);
        let multiline = format!("{first}\n{second}");
        assert_eq!(decode_pem_body(&multiline).unwrap(), vec![7u8; 96]);
    }

    #[test]
    fn test_decode_pem_body_invalid_base64() {
        assert!(decode_pem_body("!!!not-base64!!!").is_err());
    }
}
