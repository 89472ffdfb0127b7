//! Custom test assertions for expressive tests
//!
//! Inspects issued tokens without verifying signatures. Use
//! `JwtSigner::verify` when the signature itself is under test.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::IdpClaims;

/// Decode the claim set of a JWT without checking its signature.
pub fn decode_claims_unverified(token: &str) -> IdpClaims {
    let payload = token
        .split('.')
        .nth(1)
        .unwrap_or_else(|| panic!("token has no payload segment: {token}"));
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .expect("JWT payload should be base64url");
    serde_json::from_slice(&bytes).expect("JWT payload should be an IdP claim set")
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt("RS256")
///     .assert_for_subject("c1")
///     .assert_has_role("admin")
///     .assert_expires_in(3600);
/// ```
pub trait TokenAssertions {
    /// Assert three segments and a header with the given `alg` and `typ: JWT`
    fn assert_valid_jwt(&self, algorithm: &str) -> &Self;

    fn assert_for_subject(&self, subject: &str) -> &Self;

    fn assert_issued_by(&self, issuer: &str) -> &Self;

    fn assert_has_role(&self, role: &str) -> &Self;

    /// Assert `exp - iat` and `nbf == iat`
    fn assert_expires_in(&self, seconds: i64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self, algorithm: &str) -> &Self {
        let parts: Vec<_> = self.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts.len()
        );

        let header = jsonwebtoken::decode_header(self)
            .unwrap_or_else(|e| panic!("Failed to decode JWT header: {e}"));
        assert_eq!(
            format!("{:?}", header.alg),
            algorithm,
            "Unexpected signing algorithm"
        );
        assert_eq!(header.typ.as_deref(), Some("JWT"), "Expected JWT type");

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = decode_claims_unverified(self);
        assert_eq!(claims.sub, subject, "Token subject mismatch");
        self
    }

    fn assert_issued_by(&self, issuer: &str) -> &Self {
        let claims = decode_claims_unverified(self);
        assert_eq!(claims.iss, issuer, "Token issuer mismatch");
        self
    }

    fn assert_has_role(&self, role: &str) -> &Self {
        let claims = decode_claims_unverified(self);
        assert!(
            claims.has_role(role),
            "Token roles {:?} do not include '{}'",
            claims.roles,
            role
        );
        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let claims = decode_claims_unverified(self);
        assert_eq!(claims.nbf, claims.iat, "nbf should equal iat");
        assert_eq!(
            claims.lifetime_seconds(),
            seconds,
            "Token lifetime mismatch"
        );
        self
    }
}
