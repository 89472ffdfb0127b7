//! Identity Provider Service Library
//!
//! Authenticates OAuth 2.0 client credentials and issues signed JWT bearer
//! tokens.
//!
//! # Modules
//!
//! - `actors` - Authenticator actor owning the client registry
//! - `config` - Service configuration
//! - `crypto` - JWT signing and verification
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `keys` - PEM key loading and normalization
//! - `models` - Request, verdict and response types
//! - `repositories` - In-memory client registry
//! - `services` - Signer startup and token issuance

pub mod actors;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;

use actors::AuthenticatorHandle;
use config::Config;
use errors::IdpError;
use handlers::auth_handler::AppState;
use repositories::clients::ClientRegistry;
use std::sync::Arc;

/// Run the startup sequence and return the state the router serves.
///
/// The signer is built first; if it fails nothing else is started and the
/// caller must not bind a listener.
pub async fn initialize(config: &Config) -> Result<Arc<AppState>, IdpError> {
    let signer = services::key_management_service::initialize_signer(config).await?;

    let registry = ClientRegistry::from_entries(&config.clients);
    observability::metrics::set_registered_clients(registry.len());
    let authenticator = AuthenticatorHandle::new(registry, config.authn_timeout);

    Ok(Arc::new(AppState {
        authenticator,
        signer: Arc::new(signer),
        issuer: config.issuer.clone(),
    }))
}
