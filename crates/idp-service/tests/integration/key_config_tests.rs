//! Startup tests for key configuration resolution
//!
//! Key problems must stop startup before a listener exists; a server that
//! comes up must be able to sign with whichever keys resolution selected.

use idp_service::config::ConfigError;
use idp_service::crypto::JwtSigner;
use idp_service::errors::IdpError;
use idp_service::keys::{KeyMaterial, KeyType};
use idp_service::models::TokenResponse;
use idp_test_utils::{
    alt_rsa_pair, alt_rsa_pkcs8_pair, KeyFiles, TestConfigBuilder, TestIdpServer,
    DEV_PRIVATE_KEY, DEV_PUBLIC_KEY, TEST_ISSUER,
};
use jsonwebtoken::Algorithm;
use reqwest::StatusCode;
use std::fs;

fn material(key_type: KeyType, pem: &str) -> KeyMaterial {
    KeyMaterial::new(key_type, idp_service::keys::normalize_pem(pem.lines()))
}

#[tokio::test]
async fn test_missing_private_entry_fails_before_bind() -> Result<(), anyhow::Error> {
    let config = TestConfigBuilder::new()
        .with_inline_keys(Some(DEV_PUBLIC_KEY), None)
        .build()?;

    let result = idp_service::initialize(&config).await;
    assert!(matches!(
        result,
        Err(IdpError::Configuration(ConfigError::KeyEntryMissing(
            KeyType::Private
        )))
    ));

    // The harness only binds after a successful startup.
    assert!(TestIdpServer::spawn(config).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_missing_key_file_fails_startup() -> Result<(), anyhow::Error> {
    let config = TestConfigBuilder::new()
        .with_inline_keys(Some(DEV_PUBLIC_KEY), Some("/nonexistent/idp/private.pem"))
        .build()?;

    let result = idp_service::initialize(&config).await;
    assert!(matches!(
        result,
        Err(IdpError::Configuration(ConfigError::Io { .. }))
    ));

    Ok(())
}

#[tokio::test]
async fn test_missing_resource_fails_startup() -> Result<(), anyhow::Error> {
    let config = TestConfigBuilder::new()
        .with_inline_keys(Some(DEV_PUBLIC_KEY), Some("resource:keys/absent.pem"))
        .build()?;

    let result = idp_service::initialize(&config).await;
    assert!(matches!(
        result,
        Err(IdpError::Configuration(ConfigError::ResourceNotFound(_)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_mismatched_key_pair_fails_startup() -> Result<(), anyhow::Error> {
    let files = KeyFiles::write(&alt_rsa_pair())?;
    let config = TestConfigBuilder::new()
        .with_inline_keys(Some(&files.public_path_str()), Some(DEV_PRIVATE_KEY))
        .build()?;

    let result = idp_service::initialize(&config).await;
    assert!(matches!(
        result,
        Err(IdpError::Configuration(ConfigError::InvalidKey(_)))
    ));

    Ok(())
}

/// Inline config has a usable pair; the external file only names a public
/// key. The inline private key must not leak through.
#[tokio::test]
async fn test_external_key_config_replaces_inline_wholesale() -> Result<(), anyhow::Error> {
    let files = KeyFiles::write(&alt_rsa_pair())?;
    let key_config = files.write_key_config(Some(&files.public_path_str()), None)?;

    let config = TestConfigBuilder::new()
        .with_inline_keys(Some(DEV_PUBLIC_KEY), Some(DEV_PRIVATE_KEY))
        .with_key_config_file(&key_config)
        .build()?;

    let result = idp_service::initialize(&config).await;
    assert!(matches!(
        result,
        Err(IdpError::Configuration(ConfigError::KeyEntryMissing(
            KeyType::Private
        )))
    ));

    Ok(())
}

#[tokio::test]
async fn test_external_key_config_keys_sign_tokens() -> Result<(), anyhow::Error> {
    let pair = alt_rsa_pair();
    let files = KeyFiles::write(&pair)?;
    let key_config = files.write_key_config(
        Some(&files.public_path_str()),
        Some(&files.private_path_str()),
    )?;

    let config = TestConfigBuilder::new()
        .with_client("c1", "s1", &["admin"])
        .with_key_config_file(&key_config)
        .build()?;
    let server = TestIdpServer::spawn(config).await?;

    let response = server.request_token("c1", "s1").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: TokenResponse = response.json().await?;

    // Verifies with the alternate public key, not the bundled one.
    let alt_signer = JwtSigner::from_keys(
        &material(KeyType::Private, &pair.private_pem),
        &material(KeyType::Public, &pair.public_pem),
        Algorithm::RS256,
    )?;
    assert!(alt_signer.verify(&body.access_token, TEST_ISSUER).is_ok());

    let dev_signer = JwtSigner::from_keys(
        &material(
            KeyType::Private,
            idp_service::keys::embedded_resource("keys/idp-private.pem").unwrap_or_default(),
        ),
        &material(
            KeyType::Public,
            idp_service::keys::embedded_resource("keys/idp-public.pem").unwrap_or_default(),
        ),
        Algorithm::RS256,
    )?;
    assert!(dev_signer.verify(&body.access_token, TEST_ISSUER).is_err());

    Ok(())
}

#[tokio::test]
async fn test_unreadable_external_key_config_fails_startup() -> Result<(), anyhow::Error> {
    let files = KeyFiles::write(&alt_rsa_pair())?;
    let bogus = files.dir().join("key-config.json");
    fs::write(&bogus, "{ this is not json")?;

    let config = TestConfigBuilder::new()
        .with_key_config_file(&bogus)
        .build()?;

    let result = idp_service::initialize(&config).await;
    assert!(matches!(
        result,
        Err(IdpError::Configuration(ConfigError::KeyConfigFile { .. }))
    ));

    Ok(())
}

/// `openssl genpkey` output: PKCS#8 private key and SPKI public key.
#[tokio::test]
async fn test_pkcs8_rsa_keys_sign_tokens() -> Result<(), anyhow::Error> {
    let files = KeyFiles::write(&alt_rsa_pkcs8_pair())?;

    let config = TestConfigBuilder::new()
        .with_client("c1", "s1", &[])
        .with_inline_keys(
            Some(&files.public_path_str()),
            Some(&files.private_path_str()),
        )
        .build()?;
    let server = TestIdpServer::spawn(config).await?;

    let response = server.request_token("c1", "s1").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: TokenResponse = response.json().await?;

    // The PKCS#1 encoding of the same key verifies the token.
    let pair = alt_rsa_pair();
    let pkcs1_signer = JwtSigner::from_keys(
        &material(KeyType::Private, &pair.private_pem),
        &material(KeyType::Public, &pair.public_pem),
        Algorithm::RS256,
    )?;
    assert!(pkcs1_signer.verify(&body.access_token, TEST_ISSUER).is_ok());

    Ok(())
}

/// Keys carrying encryption headers and stray blank lines load once the
/// headers are stripped.
#[tokio::test]
async fn test_pem_headers_and_blank_lines_are_tolerated() -> Result<(), anyhow::Error> {
    let pair = alt_rsa_pair();
    let mut lines: Vec<&str> = pair.private_pem.lines().collect();
    lines.insert(1, "Proc-Type: 4,ENCRYPTED");
    lines.insert(2, "DEK-Info: AES-128-CBC,00000000000000000000000000000000");
    lines.insert(3, "");
    let decorated = lines.join("\n");

    let files = KeyFiles::write(&idp_test_utils::PemPair {
        private_pem: decorated,
        public_pem: pair.public_pem.clone(),
    })?;

    let config = TestConfigBuilder::new()
        .with_client("c1", "s1", &[])
        .with_inline_keys(
            Some(&files.public_path_str()),
            Some(&files.private_path_str()),
        )
        .build()?;
    let server = TestIdpServer::spawn(config).await?;

    assert_eq!(
        server.request_token("c1", "s1").await?.status(),
        StatusCode::OK
    );

    Ok(())
}
