//! Deterministic key fixtures for testing
//!
//! - The development RSA pair bundled with the service (`resource:` paths)
//! - A second RSA pair that does not match it, for mismatch tests, in both
//!   PKCS#1 and PKCS#8/SPKI encodings
//! - Seeded Ed25519 pairs in PEM form
//! - Helpers that write key material to a temporary directory

use base64::engine::general_purpose;
use base64::Engine;
use ring::signature::{Ed25519KeyPair, KeyPair};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

/// Resource path of the bundled development private key.
pub const DEV_PRIVATE_KEY: &str = "resource:keys/idp-private.pem";

/// Resource path of the bundled development public key.
pub const DEV_PUBLIC_KEY: &str = "resource:keys/idp-public.pem";

/// PKCS#1 RSA private key unrelated to the development pair.
pub const ALT_RSA_PRIVATE_PEM: &str = include_str!("../fixtures/alt-private.pem");

/// PKCS#1 RSA public key matching [`ALT_RSA_PRIVATE_PEM`].
pub const ALT_RSA_PUBLIC_PEM: &str = include_str!("../fixtures/alt-public.pem");

/// [`ALT_RSA_PRIVATE_PEM`] as a PKCS#8 `PRIVATE KEY`, as `openssl genpkey`
/// writes it.
pub const ALT_RSA_PKCS8_PRIVATE_PEM: &str = include_str!("../fixtures/alt-private-pkcs8.pem");

/// [`ALT_RSA_PUBLIC_PEM`] as an SPKI `PUBLIC KEY`.
pub const ALT_RSA_SPKI_PUBLIC_PEM: &str = include_str!("../fixtures/alt-public-spki.pem");

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Fixture I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// PEM text of a key pair.
#[derive(Debug, Clone)]
pub struct PemPair {
    pub private_pem: String,
    pub public_pem: String,
}

/// The alternate RSA pair.
pub fn alt_rsa_pair() -> PemPair {
    PemPair {
        private_pem: ALT_RSA_PRIVATE_PEM.to_string(),
        public_pem: ALT_RSA_PUBLIC_PEM.to_string(),
    }
}

/// The alternate RSA pair in PKCS#8 / SPKI encoding.
pub fn alt_rsa_pkcs8_pair() -> PemPair {
    PemPair {
        private_pem: ALT_RSA_PKCS8_PRIVATE_PEM.to_string(),
        public_pem: ALT_RSA_SPKI_PUBLIC_PEM.to_string(),
    }
}

/// Generate a deterministic Ed25519 key pair for testing.
///
/// The same seed always produces the same pair. The private key is a PKCS#8
/// document and the public key is the raw 32-byte key, both PEM armored.
pub fn test_ed25519_pair(seed: u8) -> Result<PemPair, FixtureError> {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }

    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    let pkcs8 = build_pkcs8_from_seed(&seed_bytes);

    Ok(PemPair {
        private_pem: armor("PRIVATE KEY", &pkcs8),
        public_pem: armor("PUBLIC KEY", key_pair.public_key().as_ref()),
    })
}

/// PKCS#8 v1 document wrapping an Ed25519 seed (RFC 8410).
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);
    // SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // version INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier { id-Ed25519 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey OCTET STRING { OCTET STRING seed }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);
    pkcs8
}

/// PEM-armor DER bytes, wrapping the body at 64 columns.
pub fn armor(label: &str, der: &[u8]) -> String {
    let body = general_purpose::STANDARD.encode(der);
    let mut pem = format!("-----BEGIN {}-----\n", label);
    for chunk in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {}-----\n", label));
    pem
}

/// Key files written to a temporary directory that lives as long as this
/// value.
pub struct KeyFiles {
    dir: TempDir,
    pub private_path: PathBuf,
    pub public_path: PathBuf,
}

impl KeyFiles {
    /// Write both halves of `pair` as `private.pem` and `public.pem`.
    pub fn write(pair: &PemPair) -> Result<Self, FixtureError> {
        let dir = TempDir::new()?;
        let private_path = dir.path().join("private.pem");
        let public_path = dir.path().join("public.pem");
        fs::write(&private_path, &pair.private_pem)?;
        fs::write(&public_path, &pair.public_pem)?;

        Ok(Self {
            dir,
            private_path,
            public_path,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write an external key-config file naming these keys and return its
    /// path. `None` omits that entry.
    pub fn write_key_config(
        &self,
        public: Option<&str>,
        private: Option<&str>,
    ) -> Result<PathBuf, FixtureError> {
        let mut entries = serde_json::Map::new();
        if let Some(public) = public {
            entries.insert("public".to_string(), public.into());
        }
        if let Some(private) = private {
            entries.insert("private".to_string(), private.into());
        }

        let path = self.dir.path().join("key-config.json");
        // Pretty printed so the file spans several lines.
        let text = serde_json::to_string_pretty(&serde_json::Value::Object(entries))
            .map_err(|e| FixtureError::Crypto(format!("Failed to encode key config: {}", e)))?;
        fs::write(&path, text)?;
        Ok(path)
    }

    pub fn private_path_str(&self) -> String {
        self.private_path.display().to_string()
    }

    pub fn public_path_str(&self) -> String {
        self.public_path.display().to_string()
    }
}
