use common::secret::SecretString;
use serde::{Deserialize, Serialize};

/// Credential check sent from the issuer to the authenticator.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Verdict returned by the authenticator.
///
/// `roles` is only populated on success, so an unknown client and a wrong
/// secret produce results of the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResult {
    pub subject: String,
    #[serde(rename = "authn")]
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl AuthenticationResult {
    pub fn granted(subject: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            authenticated: true,
            roles: Some(roles),
        }
    }

    pub fn denied(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            authenticated: false,
            roles: None,
        }
    }
}

/// Token response body (OAuth 2.0 client credentials)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}
