//! Token signing.
//!
//! [`JwtSigner`] binds the loaded key pair to the configured JWS algorithm.
//! RSA algorithms (`RS*`, `PS*`) take a PKCS#1 or PKCS#8 private key and a
//! PKCS#1 `RSAPublicKey` or SPKI public key. `EdDSA` takes a PKCS#8 private
//! key and a raw or SPKI-wrapped Ed25519 public key.
//!
//! Key bytes are not validated when the signer is built, so
//! [`JwtSigner::self_test`] signs and verifies a throwaway claim set once at
//! startup.

use crate::config::ConfigError;
use crate::errors::IdpError;
use crate::keys::{KeyMaterial, KeyType};
use common::jwt::{check_token_size, validate_iat, IdpClaims, DEFAULT_CLOCK_SKEW};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use tracing::instrument;

/// Subject used by the startup probe token.
const PROBE_SUBJECT: &str = "idp-startup-probe";

/// Length of an Ed25519 SubjectPublicKeyInfo DER document.
const ED25519_SPKI_LEN: usize = 44;

/// Length of a raw Ed25519 public key.
const ED25519_RAW_LEN: usize = 32;

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;

/// rsaEncryption, 1.2.840.113549.1.1.1
const RSA_ENCRYPTION_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Rsa,
    Ed25519,
}

impl KeyFamily {
    fn for_algorithm(algorithm: Algorithm) -> Result<Self, ConfigError> {
        match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Ok(KeyFamily::Rsa),
            Algorithm::EdDSA => Ok(KeyFamily::Ed25519),
            other => Err(ConfigError::InvalidValue {
                field: "idp-algorithm".to_string(),
                reason: format!("{:?} cannot be used with PEM key material", other),
            }),
        }
    }
}

/// Signing capability bound to one key pair and one algorithm.
#[derive(Clone)]
pub struct JwtSigner {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &self.algorithm)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

impl JwtSigner {
    /// Build a signer from loaded key material.
    ///
    /// # Errors
    ///
    /// - `InvalidValue` if `algorithm` is not an RSA or EdDSA algorithm
    /// - `InvalidKey` if the keys are passed in the wrong slots or their
    ///   bodies are not valid base64
    #[instrument(skip_all, fields(algorithm = ?algorithm))]
    pub fn from_keys(
        private_key: &KeyMaterial,
        public_key: &KeyMaterial,
        algorithm: Algorithm,
    ) -> Result<Self, ConfigError> {
        if private_key.key_type() != KeyType::Private || public_key.key_type() != KeyType::Public
        {
            return Err(ConfigError::InvalidKey(
                "signer requires one private and one public key".to_string(),
            ));
        }

        let family = KeyFamily::for_algorithm(algorithm)?;
        let private_der = private_key.to_der()?;
        let public_der = public_key.to_der()?;

        let (encoding_key, decoding_key) = match family {
            KeyFamily::Rsa => (
                EncodingKey::from_rsa_der(rsa_private_key(&private_der)?),
                DecodingKey::from_rsa_der(rsa_public_key(&public_der)?),
            ),
            KeyFamily::Ed25519 => (
                EncodingKey::from_ed_der(&private_der),
                DecodingKey::from_ed_der(ed25519_public_key(&public_der)?),
            ),
        };

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign a claim set.
    #[instrument(skip_all)]
    pub fn sign(&self, claims: &IdpClaims) -> Result<String, IdpError> {
        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| IdpError::Signing(format!("JWT signing operation failed: {}", e)))
    }

    /// Verify a token issued by this signer.
    ///
    /// Validates size, signature, `iss`, `exp`, `nbf` and rejects `iat`
    /// values beyond the allowed clock skew.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str, issuer: &str) -> Result<IdpClaims, IdpError> {
        check_token_size(token).map_err(|e| {
            tracing::debug!(
                target: "idp.crypto",
                token_size = token.len(),
                "Token rejected: size exceeds maximum allowed"
            );
            IdpError::InvalidToken(e.to_string())
        })?;

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);

        let token_data = decode::<IdpClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "idp.crypto", error = %e, "Token verification failed");
            IdpError::InvalidToken(e.to_string())
        })?;

        validate_iat(token_data.claims.iat, DEFAULT_CLOCK_SKEW)
            .map_err(|e| IdpError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }

    /// Sign and verify a short-lived probe token.
    ///
    /// Catches malformed key bytes and mismatched pairs, which only surface
    /// when the keys are first used.
    #[instrument(skip_all)]
    pub fn self_test(&self, issuer: &str) -> Result<(), ConfigError> {
        let now = chrono::Utc::now().timestamp();
        let claims = IdpClaims {
            iss: issuer.to_string(),
            sub: PROBE_SUBJECT.to_string(),
            iat: now,
            nbf: now,
            exp: now + 60,
            jti: uuid::Uuid::new_v4().to_string(),
            roles: Vec::new(),
        };

        let token = self
            .sign(&claims)
            .map_err(|e| ConfigError::InvalidKey(format!("private key unusable: {}", e)))?;

        let verified = self.verify(&token, issuer).map_err(|e| {
            ConfigError::InvalidKey(format!("public key does not verify probe token: {}", e))
        })?;

        if verified.jti != claims.jti {
            return Err(ConfigError::InvalidKey(
                "probe token round trip returned different claims".to_string(),
            ));
        }

        Ok(())
    }
}

/// Accept a raw Ed25519 public key or strip the SPKI wrapper.
fn ed25519_public_key(der: &[u8]) -> Result<&[u8], ConfigError> {
    match der.len() {
        ED25519_RAW_LEN => Ok(der),
        ED25519_SPKI_LEN => der
            .get(ED25519_SPKI_LEN - ED25519_RAW_LEN..)
            .ok_or_else(|| ConfigError::InvalidKey("truncated Ed25519 public key".to_string())),
        other => Err(ConfigError::InvalidKey(format!(
            "Ed25519 public key must be {} or {} bytes, got {}",
            ED25519_RAW_LEN, ED25519_SPKI_LEN, other
        ))),
    }
}

/// Split one DER element into its tag, contents and the bytes after it.
fn der_element(input: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    let (&tag, rest) = input.split_first()?;
    let (&first, rest) = rest.split_first()?;

    let (len, rest) = if first < 0x80 {
        (usize::from(first), rest)
    } else {
        let count = usize::from(first & 0x7f);
        if count == 0 || count > 4 {
            return None;
        }
        let len = rest
            .get(..count)?
            .iter()
            .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));
        (len, rest.get(count..)?)
    };

    Some((tag, rest.get(..len)?, rest.get(len..)?))
}

fn is_rsa_algorithm(algorithm_identifier: &[u8]) -> bool {
    matches!(
        der_element(algorithm_identifier),
        Some((TAG_OID, oid, _)) if oid == RSA_ENCRYPTION_OID
    )
}

/// PKCS#1 `RSAPrivateKey` from a PKCS#1 or PKCS#8 document.
///
/// Anything that is not a PKCS#8 wrapper is passed through; malformed keys
/// are caught by the startup probe.
fn rsa_private_key(der: &[u8]) -> Result<&[u8], ConfigError> {
    let Some((TAG_SEQUENCE, body, _)) = der_element(der) else {
        return Ok(der);
    };
    let Some((TAG_INTEGER, _, rest)) = der_element(body) else {
        return Ok(der);
    };
    // PKCS#1 continues with the modulus, PKCS#8 with an AlgorithmIdentifier.
    let Some((TAG_SEQUENCE, algorithm, rest)) = der_element(rest) else {
        return Ok(der);
    };

    if !is_rsa_algorithm(algorithm) {
        return Err(ConfigError::InvalidKey(
            "PKCS#8 private key is not an RSA key".to_string(),
        ));
    }

    match der_element(rest) {
        Some((TAG_OCTET_STRING, inner, _)) => Ok(inner),
        _ => Err(ConfigError::InvalidKey(
            "PKCS#8 private key carries no key octets".to_string(),
        )),
    }
}

/// PKCS#1 `RSAPublicKey` from a PKCS#1 or SubjectPublicKeyInfo document.
fn rsa_public_key(der: &[u8]) -> Result<&[u8], ConfigError> {
    let Some((TAG_SEQUENCE, body, _)) = der_element(der) else {
        return Ok(der);
    };
    // PKCS#1 starts with the modulus, SPKI with an AlgorithmIdentifier.
    let Some((TAG_SEQUENCE, algorithm, rest)) = der_element(body) else {
        return Ok(der);
    };

    if !is_rsa_algorithm(algorithm) {
        return Err(ConfigError::InvalidKey(
            "public key is not an RSA key".to_string(),
        ));
    }

    match der_element(rest) {
        Some((TAG_BIT_STRING, bits, _)) => match bits.split_first() {
            Some((&0, key)) => Ok(key),
            _ => Err(ConfigError::InvalidKey(
                "SPKI public key bit string is not byte aligned".to_string(),
            )),
        },
        _ => Err(ConfigError::InvalidKey(
            "SPKI public key carries no key bits".to_string(),
        )),
    }
}
