//! Credential Store.
//!
//! In-memory registry of known clients, populated once from configuration at
//! startup. The registry is owned by the authenticator actor and is never
//! shared with the issuer.

use crate::config::ClientEntry;
use crate::models::AuthenticationResult;
use crate::observability::hash_for_correlation;
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A registered client. Immutable once registered.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub client_id: String,
    pub secret: SecretString,
    pub roles: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, ClientRecord>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate a registry from configured client entries.
    ///
    /// Entries without an `id` or a `secret` are skipped with a warning.
    pub fn from_entries(entries: &[ClientEntry]) -> Self {
        debug!(target: "idp.clients", "Registering clients");

        let mut registry = Self::new();
        for (index, entry) in entries.iter().enumerate() {
            match (&entry.id, &entry.secret) {
                (Some(id), Some(secret)) => {
                    registry.register(
                        id.clone(),
                        secret.clone(),
                        entry.roles.clone().unwrap_or_default(),
                    );
                }
                _ => {
                    warn!(
                        target: "idp.clients",
                        entry = index,
                        "Client entries must have 'id' and 'secret' fields; entry skipped"
                    );
                }
            }
        }

        if registry.is_empty() {
            warn!(target: "idp.clients", "No clients are registered");
        } else {
            info!(
                target: "idp.clients",
                registered = registry.len(),
                "Client registry populated"
            );
        }

        registry
    }

    /// Insert or replace a client. Last write wins.
    pub fn register(&mut self, client_id: String, secret: SecretString, roles: Vec<String>) {
        debug!(
            target: "idp.clients",
            client_id_hash = %hash_for_correlation(&client_id),
            roles = ?roles,
            "Registered client"
        );

        self.clients.insert(
            client_id.clone(),
            ClientRecord {
                client_id,
                secret,
                roles,
            },
        );
    }

    /// Verify a client's secret.
    ///
    /// Unknown clients and wrong secrets yield the same denied result.
    // TODO: compare secrets in constant time (ring::constant_time or subtle)
    pub fn authenticate(&self, client_id: &str, client_secret: &str) -> AuthenticationResult {
        let client_hash = hash_for_correlation(client_id);

        match self.clients.get(client_id) {
            Some(record) if record.secret.expose_secret() == client_secret => {
                debug!(
                    target: "idp.clients",
                    client_id_hash = %client_hash,
                    "Successfully authenticated client"
                );
                AuthenticationResult::granted(client_id, record.roles.clone())
            }
            Some(_) => {
                warn!(
                    target: "idp.clients",
                    client_id_hash = %client_hash,
                    "Client attempted to authenticate with invalid credentials; request denied"
                );
                AuthenticationResult::denied(client_id)
            }
            None => {
                info!(
                    target: "idp.clients",
                    client_id_hash = %client_hash,
                    "Unable to authenticate unknown client"
                );
                AuthenticationResult::denied(client_id)
            }
        }
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
