//! `AuthenticatorActor` - owns the client registry and verifies credentials.
//!
//! The token issuer never reads the registry directly. It holds an
//! [`AuthenticatorHandle`] and sends one `Authenticate` message per token
//! request, suspending until the reply arrives.
//!
//! # Reply Timeout
//!
//! Every round trip is bounded by the handle's reply timeout. A request that
//! cannot be delivered, or whose reply never comes, fails with
//! `IdpError::AuthenticatorUnavailable` instead of hanging the HTTP request.

use super::messages::AuthenticatorMessage;
use crate::errors::IdpError;
use crate::models::{AuthenticationRequest, AuthenticationResult};
use crate::observability::metrics;
use crate::repositories::clients::ClientRegistry;

use common::secret::ExposeSecret;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Channel buffer size for the authenticator mailbox.
const AUTHENTICATOR_CHANNEL_BUFFER: usize = 256;

/// Handle to the `AuthenticatorActor`.
///
/// Cheap to clone; every clone talks to the same actor task.
#[derive(Clone)]
pub struct AuthenticatorHandle {
    sender: mpsc::Sender<AuthenticatorMessage>,
    cancel_token: CancellationToken,
    reply_timeout: Duration,
}

impl AuthenticatorHandle {
    /// Spawn an `AuthenticatorActor` that owns `registry` and return a handle
    /// to it.
    #[must_use]
    pub fn new(registry: ClientRegistry, reply_timeout: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(AUTHENTICATOR_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let actor = AuthenticatorActor::new(registry, receiver, cancel_token.clone());
        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
            reply_timeout,
        }
    }

    /// Ask the actor to verify a client's credentials.
    ///
    /// A denied verdict is a normal `Ok` result. Errors mean no verdict was
    /// obtained within the reply timeout.
    pub async fn authenticate(
        &self,
        request: AuthenticationRequest,
    ) -> Result<AuthenticationResult, IdpError> {
        let round_trip = async {
            let (tx, rx) = oneshot::channel();
            self.sender
                .send(AuthenticatorMessage::Authenticate {
                    request,
                    respond_to: tx,
                })
                .await
                .map_err(|e| {
                    IdpError::AuthenticatorUnavailable(format!("channel send failed: {e}"))
                })?;

            rx.await.map_err(|e| {
                IdpError::AuthenticatorUnavailable(format!("response receive failed: {e}"))
            })
        };

        match tokio::time::timeout(self.reply_timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    target: "idp.actor.authenticator",
                    timeout_ms = self.reply_timeout.as_millis() as u64,
                    "Authenticator did not reply in time"
                );
                Err(IdpError::AuthenticatorUnavailable(format!(
                    "no reply within {}ms",
                    self.reply_timeout.as_millis()
                )))
            }
        }
    }

    /// Stop the actor. Pending and future requests fail as unavailable.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Handle wired to a caller-owned mailbox, with no actor behind it.
    #[cfg(test)]
    pub(crate) fn detached(
        reply_timeout: Duration,
    ) -> (Self, mpsc::Receiver<AuthenticatorMessage>) {
        let (sender, receiver) = mpsc::channel(AUTHENTICATOR_CHANNEL_BUFFER);
        let handle = Self {
            sender,
            cancel_token: CancellationToken::new(),
            reply_timeout,
        };
        (handle, receiver)
    }
}

/// The `AuthenticatorActor` implementation.
///
/// Owns the registry and runs the message loop until cancelled or until
/// every handle has been dropped.
pub struct AuthenticatorActor {
    registry: ClientRegistry,
    receiver: mpsc::Receiver<AuthenticatorMessage>,
    cancel_token: CancellationToken,
}

impl AuthenticatorActor {
    fn new(
        registry: ClientRegistry,
        receiver: mpsc::Receiver<AuthenticatorMessage>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            registry,
            receiver,
            cancel_token,
        }
    }

    /// Run the actor message loop.
    pub async fn run(mut self) {
        info!(
            target: "idp.actor.authenticator",
            registered_clients = self.registry.len(),
            "AuthenticatorActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "idp.actor.authenticator",
                        "AuthenticatorActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            info!(
                                target: "idp.actor.authenticator",
                                "AuthenticatorActor channel closed"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "idp.actor.authenticator",
            "AuthenticatorActor stopped"
        );
    }

    fn handle_message(&self, message: AuthenticatorMessage) {
        match message {
            AuthenticatorMessage::Authenticate {
                request,
                respond_to,
            } => {
                let result = self
                    .registry
                    .authenticate(&request.client_id, request.client_secret.expose_secret());
                metrics::record_authentication(result.authenticated);

                if respond_to.send(result).is_err() {
                    debug!(
                        target: "idp.actor.authenticator",
                        "Requester went away before the verdict was delivered"
                    );
                }
            }
        }
    }
}
