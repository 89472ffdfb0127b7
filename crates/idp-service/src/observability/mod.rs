//! Observability module for the IdP service
//!
//! # Privacy by Default
//!
//! Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (enums, outcomes, roles)
//! - **HASHED**: Must be SHA-256 hashed for correlation (client_id)
//! - **NEVER**: Must never appear in logs (secrets, tokens, keys)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Used for `client_id`, which needs correlation across log entries but
/// should not be stored in plaintext.
///
/// This is NOT cryptographically secure for secrets - it's a one-way hash
/// for correlation purposes only.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    // 4 bytes of digest
    hex::encode(result.get(..4).unwrap_or_default())
}
