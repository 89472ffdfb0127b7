//! # IdP Test Utilities
//!
//! Shared test utilities for the identity provider service.
//!
//! This crate provides:
//! - Deterministic key fixtures (bundled dev pair, alternate RSA pair,
//!   seeded Ed25519 pairs)
//! - A configuration builder that goes through real parsing
//! - Server test harness (`TestIdpServer` for E2E tests)
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use idp_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let config = TestConfigBuilder::new()
//!         .with_client("c1", "s1", &["admin"])
//!         .build()?;
//!     let server = TestIdpServer::spawn(config).await?;
//!
//!     let response = server.request_token("c1", "s1").await?;
//!     let token: String = response.json::<serde_json::Value>().await?["access_token"]
//!         .as_str()
//!         .unwrap()
//!         .to_string();
//!
//!     token.assert_valid_jwt("RS256").assert_has_role("admin");
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod config_builders;
pub mod crypto_fixtures;
pub mod server_harness;

// Re-export commonly used items
pub use assertions::*;
pub use config_builders::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
