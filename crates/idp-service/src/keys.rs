//! Key Loader.
//!
//! Loads PEM key material for the token signer. Key paths come from the
//! resolved key configuration: the inline `keys` object, or an external
//! key-config file that replaces it wholesale. A path prefixed with
//! [`RESOURCE_SCHEME`] is read from the resources compiled into the binary,
//! anything else from the local filesystem.
//!
//! The loaded text is normalized to the bare base64 body: blank lines, armor
//! lines (`--`) and encryption headers (`Proc-Type`, `DEK-Info`) are dropped.

use crate::config::{ConfigError, KeyConfig, KeySettings};
use std::fmt;
use std::path::Path;
use tracing::{debug, instrument};

/// Path prefix selecting a key bundled with the binary.
pub const RESOURCE_SCHEME: &str = "resource:";

/// Resources compiled into the binary, addressed by `resource:<name>`.
const EMBEDDED_RESOURCES: &[(&str, &str)] = &[
    (
        "keys/idp-private.pem",
        include_str!("../resources/keys/idp-private.pem"),
    ),
    (
        "keys/idp-public.pem",
        include_str!("../resources/keys/idp-public.pem"),
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Public,
    Private,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Public => "public",
            KeyType::Private => "private",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized key material. Loaded once at startup and never reloaded.
///
/// Debug output never includes the key body.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    key_type: KeyType,
    pem_text: String,
}

impl KeyMaterial {
    pub fn new(key_type: KeyType, pem_text: String) -> Self {
        Self { key_type, pem_text }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Armor-free base64 body, lines joined with `\n`.
    pub fn pem_text(&self) -> &str {
        &self.pem_text
    }

    /// Decode the body into DER bytes.
    pub fn to_der(&self) -> Result<Vec<u8>, ConfigError> {
        common::jwt::decode_pem_body(&self.pem_text).map_err(|e| {
            ConfigError::InvalidKey(format!("{} key is not valid base64: {}", self.key_type, e))
        })
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_type", &self.key_type)
            .field("pem_text", &"[REDACTED]")
            .finish()
    }
}

/// Load and normalize the key of the requested type.
///
/// Fails with a `ConfigError` if the resolved key configuration has no entry
/// for `key_type`, or if the referenced file or resource cannot be read.
#[instrument(skip_all, fields(key_type = %key_type))]
pub fn load_key(key_type: KeyType, settings: &KeySettings) -> Result<KeyMaterial, ConfigError> {
    debug!(target: "idp.keys", "Loading key");

    let key_config = resolve_key_config(settings)?;
    let path = key_config
        .path_for(key_type)
        .ok_or(ConfigError::KeyEntryMissing(key_type))?;

    let contents = read_key_source(path)?;
    let pem_text = normalize_pem(contents.lines());

    debug!(
        target: "idp.keys",
        source = %path,
        body_lines = pem_text.lines().count(),
        "Successfully loaded key"
    );

    Ok(KeyMaterial::new(key_type, pem_text))
}

/// Resolve the effective key configuration.
///
/// An external key-config file, when named, replaces the inline object
/// entirely: entries present only inline are not visible afterwards.
pub fn resolve_key_config(settings: &KeySettings) -> Result<KeyConfig, ConfigError> {
    match &settings.config_file {
        Some(path) => {
            debug!(
                target: "idp.keys",
                path = %path.display(),
                "Reading key configuration from file"
            );
            read_key_config_file(path)
        }
        None => settings
            .inline
            .clone()
            .ok_or_else(|| ConfigError::MissingField("keys".to_string())),
    }
}

fn read_key_config_file(path: &Path) -> Result<KeyConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::KeyConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let joined = text.lines().collect::<Vec<_>>().join(" ");
    serde_json::from_str::<KeyConfig>(&joined).map_err(|e| ConfigError::KeyConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn read_key_source(path: &str) -> Result<String, ConfigError> {
    if let Some(name) = path.strip_prefix(RESOURCE_SCHEME) {
        return embedded_resource(name)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::ResourceNotFound(name.to_string()));
    }

    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })
}

/// Look up a resource compiled into the binary.
pub fn embedded_resource(name: &str) -> Option<&'static str> {
    EMBEDDED_RESOURCES
        .iter()
        .find(|(resource, _)| *resource == name)
        .map(|(_, contents)| *contents)
}

/// Strip PEM armor and encryption headers, keeping the remaining lines in order.
///
/// Dropped lines: empty, starting with `--`, or starting (case-insensitive)
/// with `proc` or `dek`. Survivors are joined with a single `\n`.
pub fn normalize_pem<'a, I>(lines: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            !line.is_empty()
                && !line.starts_with("--")
                && !lower.starts_with("proc")
                && !lower.starts_with("dek")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
