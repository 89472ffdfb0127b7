//! Builder patterns for test configuration
//!
//! Produces the same JSON document an operator would write, so tests go
//! through the real parsing and validation path.

use crate::crypto_fixtures::{DEV_PRIVATE_KEY, DEV_PUBLIC_KEY};
use idp_service::config::{Config, ConfigError};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Issuer claim used by default in test configurations.
pub const TEST_ISSUER: &str = "https://idp.test";

/// Builder for creating test service configurations
///
/// Defaults: port 0, [`TEST_ISSUER`], one hour lifetime, the bundled
/// development key pair and no clients.
///
/// # Example
/// ```rust,ignore
/// let config = TestConfigBuilder::new()
///     .with_client("c1", "s1", &["admin"])
///     .expires_in(600)
///     .build()?;
/// ```
pub struct TestConfigBuilder {
    document: Map<String, Value>,
    clients: Vec<Value>,
    keys: Map<String, Value>,
}

impl TestConfigBuilder {
    /// Create a new config builder with defaults
    pub fn new() -> Self {
        let mut document = Map::new();
        document.insert("bind-port".to_string(), json!(0));
        document.insert(
            "claims-config".to_string(),
            json!({ "iss": TEST_ISSUER, "expires-in": 3600 }),
        );

        let mut keys = Map::new();
        keys.insert("public".to_string(), json!(DEV_PUBLIC_KEY));
        keys.insert("private".to_string(), json!(DEV_PRIVATE_KEY));

        Self {
            document,
            clients: Vec::new(),
            keys,
        }
    }

    /// Register a client
    pub fn with_client(mut self, id: &str, secret: &str, roles: &[&str]) -> Self {
        self.clients
            .push(json!({ "id": id, "secret": secret, "roles": roles }));
        self
    }

    /// Add a raw client entry, e.g. one missing `id` or `secret`
    pub fn with_client_entry(mut self, entry: Value) -> Self {
        self.clients.push(entry);
        self
    }

    /// Set the token lifetime in seconds
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.document.insert(
            "claims-config".to_string(),
            json!({ "iss": self.issuer(), "expires-in": seconds }),
        );
        self
    }

    /// Set the issuer claim
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        let expires_in = self
            .document
            .get("claims-config")
            .and_then(|c| c.get("expires-in"))
            .cloned()
            .unwrap_or(json!(3600));
        self.document.insert(
            "claims-config".to_string(),
            json!({ "iss": issuer, "expires-in": expires_in }),
        );
        self
    }

    pub fn with_algorithm(mut self, algorithm: &str) -> Self {
        self.document
            .insert("idp-algorithm".to_string(), json!(algorithm));
        self
    }

    pub fn with_time_zone(mut self, time_zone: &str) -> Self {
        self.document
            .insert("idp-timezone".to_string(), json!(time_zone));
        self
    }

    pub fn with_authn_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.document
            .insert("authn-timeout-ms".to_string(), json!(timeout_ms));
        self
    }

    /// Replace the inline key paths. `None` drops that entry.
    pub fn with_inline_keys(mut self, public: Option<&str>, private: Option<&str>) -> Self {
        self.keys.clear();
        if let Some(public) = public {
            self.keys.insert("public".to_string(), json!(public));
        }
        if let Some(private) = private {
            self.keys.insert("private".to_string(), json!(private));
        }
        self
    }

    /// Point `idp-config-file` at an external key-config file
    pub fn with_key_config_file(mut self, path: &Path) -> Self {
        self.document.insert(
            "idp-config-file".to_string(),
            json!(path.display().to_string()),
        );
        self
    }

    /// Render the configuration document
    pub fn to_json(&self) -> String {
        let mut document = self.document.clone();
        document.insert("client-config".to_string(), Value::Array(self.clients.clone()));
        document.insert("keys".to_string(), Value::Object(self.keys.clone()));
        Value::Object(document).to_string()
    }

    /// Parse and validate the document without environment overrides
    pub fn build(&self) -> Result<Config, ConfigError> {
        Config::from_json(&self.to_json(), &HashMap::new())
    }

    fn issuer(&self) -> Value {
        self.document
            .get("claims-config")
            .and_then(|c| c.get("iss"))
            .cloned()
            .unwrap_or(json!(TEST_ISSUER))
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
