//! Actors for the IdP service.
//!
//! The authenticator owns the client registry and answers credential checks
//! sent by the token issuer over a request/reply channel. Nothing outside the
//! actor task touches the registry once startup population is done.

pub mod authenticator;
pub mod messages;

pub use authenticator::{AuthenticatorActor, AuthenticatorHandle};
pub use messages::AuthenticatorMessage;
