//! Common utilities and types shared across the identity provider crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT claims and key decoding helpers
pub mod jwt;
