//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Client secrets
//! provisioned from configuration, secrets presented on the token endpoint and
//! the keystore password are all carried as [`SecretString`].
//!
//! `SecretString` implements `Debug` with redaction, so a struct that derives
//! `Debug` while holding one is safe to log with `{:?}` or through tracing.
//! Secrets are zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct TokenRequest {
//!     client_id: String,
//!     client_secret: SecretString,
//! }
//!
//! let req = TokenRequest {
//!     client_id: "reporting".to_string(),
//!     client_secret: SecretString::from("hunter2"),
//! };
//!
//! // Safe: the secret is redacted
//! println!("{:?}", req);
//!
//! // Comparing against a stored secret requires an explicit expose
//! let presented: &str = req.client_secret.expose_secret();
//! ```
//!
//! # Serde Integration
//!
//! ```rust
//! use serde::Deserialize;
//! use common::secret::SecretString;
//!
//! #[derive(Debug, Deserialize)]
//! struct ClientEntry {
//!     id: String,
//!     secret: SecretString,
//! }
//!
//! let json = r#"{"id": "reporting", "secret": "s3cr3t"}"#;
//! let entry: ClientEntry = serde_json::from_str(json).unwrap();
//! println!("{:?}", entry);
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
