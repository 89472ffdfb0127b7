//! Service configuration.
//!
//! Configuration is a JSON document (kebab-case keys) read once at startup and
//! validated into a strongly-typed [`Config`]. A handful of fields can be
//! overridden through environment variables so containers can adjust a
//! deployment without rewriting the file.

use crate::keys::KeyType;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use common::secret::SecretString;
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "conf/idp-jwt-config.json";

/// Time zone used when `idp-timezone` is absent.
pub const DEFAULT_TIME_ZONE: &str = "UTC";

/// Signing algorithm used when `idp-algorithm` is absent.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::RS256;

/// Upper bound on the authenticator round trip when `authn-timeout-ms` is absent.
pub const DEFAULT_AUTHN_TIMEOUT_MS: u64 = 5000;

/// Environment variable naming the configuration document.
pub const CONFIG_PATH_VAR: &str = "IDP_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unable to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Provided configuration does not contain a {0} key entry")]
    KeyEntryMissing(KeyType),

    #[error("Unable to locate embedded resource '{0}'")]
    ResourceNotFound(String),

    #[error("Unable to read key configuration from file {}: {reason}", path.display())]
    KeyConfigFile { path: PathBuf, reason: String },

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_port: u16,
    pub issuer: IssuerConfig,
    pub clients: Vec<ClientEntry>,
    pub keys: KeySettings,
    pub tls: Option<TlsConfig>,
    pub authn_timeout: Duration,
}

/// Settings that drive claim construction and signing.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    pub issuer_claim: String,
    pub expires_in_seconds: i64,
    pub algorithm: Algorithm,
    pub time_zone: IssuerTimeZone,
}

/// A client registry entry as provisioned in configuration.
///
/// Fields are optional because registry population skips incomplete entries
/// with a warning instead of failing startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEntry {
    pub id: Option<String>,
    pub secret: Option<SecretString>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

/// Key path configuration, inline or loaded from an external key-config file.
///
/// A `null` entry is treated the same as an absent one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeyConfig {
    #[serde(default)]
    pub public: Option<String>,
    #[serde(default)]
    pub private: Option<String>,
}

impl KeyConfig {
    /// Path entry for the requested key type, if present.
    pub fn path_for(&self, key_type: KeyType) -> Option<&str> {
        match key_type {
            KeyType::Public => self.public.as_deref(),
            KeyType::Private => self.private.as_deref(),
        }
    }
}

/// Where key paths come from before resolution.
#[derive(Debug, Clone, Default)]
pub struct KeySettings {
    /// Inline `keys` object from the top-level configuration.
    pub inline: Option<KeyConfig>,
    /// External key-config file that replaces `inline` wholesale when set.
    pub config_file: Option<PathBuf>,
}

/// TLS keystore settings. TLS is terminated in front of this service; the
/// values are carried so a misrouted deployment is visible in the logs.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub keystore_path: PathBuf,
    pub keystore_password: Option<SecretString>,
}

/// Time zone in which issuance instants are taken.
///
/// Epoch-second claims are zone independent; the zone determines how
/// issuance times are rendered in logs. Region ids such as
/// `Europe/Berlin` follow daylight saving, so their offset depends on the
/// instant being rendered.
#[derive(Clone, PartialEq, Eq)]
pub enum IssuerTimeZone {
    Fixed { name: String, offset: FixedOffset },
    Region(Tz),
}

impl IssuerTimeZone {
    /// UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self::Fixed {
            name: DEFAULT_TIME_ZONE.to_string(),
            offset: Utc.fix(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Fixed { name, .. } => name,
            Self::Region(tz) => tz.name(),
        }
    }

    /// UTC offset in effect at `instant`.
    pub fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        match self {
            Self::Fixed { offset, .. } => *offset,
            Self::Region(tz) => instant.with_timezone(tz).offset().fix(),
        }
    }

    /// `instant` expressed in this zone.
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset_at(instant))
    }
}

impl fmt::Debug for IssuerTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed { name, offset } => write!(f, "{} ({})", name, offset),
            Self::Region(tz) => write!(f, "{}", tz.name()),
        }
    }
}

impl FromStr for IssuerTimeZone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if matches!(trimmed.to_ascii_uppercase().as_str(), "UTC" | "Z" | "GMT") {
            return Ok(Self::utc());
        }

        if let Ok(offset) = trimmed.parse::<FixedOffset>() {
            return Ok(Self::Fixed {
                name: trimmed.to_string(),
                offset,
            });
        }

        trimmed
            .parse::<Tz>()
            .map(Self::Region)
            .map_err(|_| ConfigError::InvalidValue {
                field: "idp-timezone".to_string(),
                reason: format!(
                    "'{}' is not UTC, a fixed offset such as +02:00 or a region id such as Europe/Berlin",
                    s
                ),
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    bind_port: Option<u16>,
    idp_timezone: Option<String>,
    idp_algorithm: Option<String>,
    claims_config: Option<RawClaimsConfig>,
    idp_keystore: Option<PathBuf>,
    idp_keystore_password: Option<SecretString>,
    client_config: Option<Vec<ClientEntry>>,
    keys: Option<KeyConfig>,
    idp_config_file: Option<PathBuf>,
    authn_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawClaimsConfig {
    iss: Option<String>,
    expires_in: Option<i64>,
}

impl Config {
    /// Load configuration from the file named by `IDP_CONFIG_PATH` (or the
    /// default path), with environment overrides applied.
    pub fn load() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        let path = vars
            .get(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self::from_file(&path, &vars)
    }

    /// Load configuration from a file with the given override variables.
    pub fn from_file(path: &Path, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&text, vars)
    }

    /// Parse and validate a configuration document.
    ///
    /// Recognized overrides: `IDP_BIND_PORT`, `IDP_TIMEZONE`, `IDP_ALGORITHM`,
    /// `IDP_CONFIG_FILE`, `IDP_AUTHN_TIMEOUT_MS`.
    pub fn from_json(text: &str, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;

        let bind_port = match vars.get("IDP_BIND_PORT") {
            Some(port) => parse_number::<u16>("IDP_BIND_PORT", port)?,
            None => raw
                .bind_port
                .ok_or_else(|| ConfigError::MissingField("bind-port".to_string()))?,
        };

        let time_zone = vars
            .get("IDP_TIMEZONE")
            .cloned()
            .or(raw.idp_timezone)
            .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string())
            .parse::<IssuerTimeZone>()?;

        let algorithm = match vars.get("IDP_ALGORITHM").cloned().or(raw.idp_algorithm) {
            Some(name) => parse_algorithm(&name)?,
            None => DEFAULT_ALGORITHM,
        };

        let claims = raw.claims_config.unwrap_or_default();
        let issuer_claim = claims
            .iss
            .filter(|iss| !iss.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("claims-config.iss".to_string()))?;
        let expires_in_seconds = claims
            .expires_in
            .ok_or_else(|| ConfigError::MissingField("claims-config.expires-in".to_string()))?;
        if expires_in_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "claims-config.expires-in".to_string(),
                reason: format!("must be positive, got {}", expires_in_seconds),
            });
        }

        let config_file = vars
            .get("IDP_CONFIG_FILE")
            .map(PathBuf::from)
            .or(raw.idp_config_file);

        let authn_timeout_ms = match vars.get("IDP_AUTHN_TIMEOUT_MS") {
            Some(ms) => parse_number::<u64>("IDP_AUTHN_TIMEOUT_MS", ms)?,
            None => raw.authn_timeout_ms.unwrap_or(DEFAULT_AUTHN_TIMEOUT_MS),
        };
        if authn_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "authn-timeout-ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let tls = raw.idp_keystore.map(|keystore_path| TlsConfig {
            keystore_path,
            keystore_password: raw.idp_keystore_password,
        });

        Ok(Config {
            bind_port,
            issuer: IssuerConfig {
                issuer_claim,
                expires_in_seconds,
                algorithm,
                time_zone,
            },
            clients: raw.client_config.unwrap_or_default(),
            keys: KeySettings {
                inline: raw.keys,
                config_file,
            },
            tls,
            authn_timeout: Duration::from_millis(authn_timeout_ms),
        })
    }
}

/// Parse a JWS algorithm name, accepting only the asymmetric algorithms the
/// signer can construct from PEM key material.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(name.trim()).map_err(|_| ConfigError::InvalidValue {
        field: "idp-algorithm".to_string(),
        reason: format!("unknown algorithm '{}'", name),
    })?;

    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512
        | Algorithm::EdDSA => Ok(algorithm),
        other => Err(ConfigError::InvalidValue {
            field: "idp-algorithm".to_string(),
            reason: format!("{:?} is not a supported asymmetric signing algorithm", other),
        }),
    }
}

fn parse_number<T: FromStr>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: e.to_string(),
        })
}
