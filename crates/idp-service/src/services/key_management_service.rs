//! Signer construction at startup.
//!
//! Loading keys reads files and bundled resources and the probe signature is
//! CPU bound, so the whole sequence runs on the blocking pool. The listener
//! must not start until this returns `Ok`.

use crate::config::{Config, KeySettings};
use crate::crypto::JwtSigner;
use crate::errors::IdpError;
use crate::keys::{self, KeyType};
use crate::observability::metrics;
use jsonwebtoken::Algorithm;
use tracing::{error, info, instrument};

/// Load both keys, build the signer and run its probe off the event loop.
#[instrument(skip_all, fields(algorithm = ?config.issuer.algorithm))]
pub async fn initialize_signer(config: &Config) -> Result<JwtSigner, IdpError> {
    let key_settings = config.keys.clone();
    let algorithm = config.issuer.algorithm;
    let issuer_claim = config.issuer.issuer_claim.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        build_signer(&key_settings, algorithm, &issuer_claim)
    })
    .await
    .map_err(|e| IdpError::Internal(format!("signer initialization task failed: {}", e)))?;

    match outcome {
        Ok(signer) => {
            metrics::record_signer_initialization("success");
            info!(target: "idp.startup", "Token signer initialized");
            Ok(signer)
        }
        Err(e) => {
            metrics::record_signer_initialization("error");
            error!(target: "idp.startup", error = %e, "Token signer initialization failed");
            Err(e.into())
        }
    }
}

/// Synchronous signer construction: load private then public key, bind them
/// to `algorithm`, and prove the pair works.
pub fn build_signer(
    key_settings: &KeySettings,
    algorithm: Algorithm,
    issuer_claim: &str,
) -> Result<JwtSigner, crate::config::ConfigError> {
    let private_key = keys::load_key(KeyType::Private, key_settings)?;
    let public_key = keys::load_key(KeyType::Public, key_settings)?;

    let signer = JwtSigner::from_keys(&private_key, &public_key, algorithm)?;
    signer.self_test(issuer_claim)?;

    Ok(signer)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, KeyConfig};
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ALT_PUBLIC: &str = include_str!("../../../idp-test-utils/fixtures/alt-public.pem");

    fn config_json(keys: &str) -> String {
        format!(
            r#"{{
                "bind-port": 0,
                "claims-config": {{ "iss": "https://idp.test", "expires-in": 300 }},
                "keys": {}
            }}"#,
            keys
        )
    }

    fn embedded_keys() -> KeySettings {
        KeySettings {
            inline: Some(KeyConfig {
                public: Some("resource:keys/idp-public.pem".to_string()),
                private: Some("resource:keys/idp-private.pem".to_string()),
            }),
            config_file: None,
        }
    }

    #[tokio::test]
    async fn test_initialize_signer_with_embedded_keys() {
        let config = crate::config::Config::from_json(
            &config_json(
                r#"{ "public": "resource:keys/idp-public.pem",
                     "private": "resource:keys/idp-private.pem" }"#,
            ),
            &HashMap::new(),
        )
        .unwrap();

        let signer = initialize_signer(&config).await.unwrap();
        assert_eq!(signer.algorithm(), Algorithm::RS256);
    }

    #[tokio::test]
    async fn test_initialize_signer_missing_private_entry() {
        let config = crate::config::Config::from_json(
            &config_json(r#"{ "public": "resource:keys/idp-public.pem" }"#),
            &HashMap::new(),
        )
        .unwrap();

        let result = initialize_signer(&config).await;
        assert!(matches!(
            result,
            Err(IdpError::Configuration(ConfigError::KeyEntryMissing(
                KeyType::Private
            )))
        ));
    }

    #[test]
    fn test_build_signer_rejects_mismatched_pair() {
        let mut public_file = NamedTempFile::new().unwrap();
        public_file.write_all(ALT_PUBLIC.as_bytes()).unwrap();

        let settings = KeySettings {
            inline: Some(KeyConfig {
                public: Some(public_file.path().display().to_string()),
                private: Some("resource:keys/idp-private.pem".to_string()),
            }),
            config_file: None,
        };

        let result = build_signer(&settings, Algorithm::RS256, "https://idp.test");
        assert!(matches!(result, Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn test_build_signer_rejects_key_family_mismatch() {
        // RSA keys cannot back an EdDSA signer.
        let result = build_signer(&embedded_keys(), Algorithm::EdDSA, "https://idp.test");
        assert!(result.is_err());
    }
}
