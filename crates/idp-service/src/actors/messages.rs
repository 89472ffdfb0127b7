//! Message types for the authenticator actor.

use crate::models::{AuthenticationRequest, AuthenticationResult};
use tokio::sync::oneshot;

/// Messages accepted by the `AuthenticatorActor`.
///
/// Every request carries its own reply channel; the actor answers exactly
/// once.
#[derive(Debug)]
pub enum AuthenticatorMessage {
    /// Verify a client's credentials.
    Authenticate {
        request: AuthenticationRequest,
        respond_to: oneshot::Sender<AuthenticationResult>,
    },
}
