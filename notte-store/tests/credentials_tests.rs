//! Credential precedence across environment, keychain and config.

use std::collections::HashMap;
use std::sync::Arc;

use notte_fetch::{API_KEY_ENTRY, KeychainApi, MemoryKeychain};
use notte_store::{Config, CredentialResolver, CredentialSource, ENV_API_KEY, StoreError};
use tempfile::TempDir;

fn env_with_key(key: &str) -> Arc<HashMap<String, String>> {
    Arc::new(HashMap::from([(ENV_API_KEY.to_string(), key.to_string())]))
}

#[tokio::test]
async fn test_precedence_env_then_keychain_then_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    Config {
        api_key: Some("cfg_key".into()),
        api_url: None,
    }
    .save_to(&config_path)
    .await
    .unwrap();

    let keychain = MemoryKeychain::new();
    keychain.set(API_KEY_ENTRY, "kc_key").await.unwrap();

    let base = CredentialResolver::new(Arc::new(keychain.clone())).with_config_path(&config_path);

    let credential = base
        .clone()
        .with_env(env_with_key("env_key"))
        .resolve()
        .await
        .unwrap();
    assert_eq!(credential.api_key, "env_key");
    assert_eq!(credential.source, CredentialSource::Environment);

    let without_env = base.clone().with_env(Arc::new(HashMap::new()));
    let credential = without_env.resolve().await.unwrap();
    assert_eq!(credential.api_key, "kc_key");
    assert_eq!(credential.source, CredentialSource::Keychain);

    keychain.delete(API_KEY_ENTRY).await.unwrap();
    let credential = without_env.resolve().await.unwrap();
    assert_eq!(credential.api_key, "cfg_key");
    assert_eq!(credential.source, CredentialSource::Config);

    Config::reset_at(&config_path).await.unwrap();
    let err = without_env.resolve().await.unwrap_err();
    assert!(matches!(err, StoreError::NoApiKey));
    assert_eq!(
        err.to_string(),
        "no API key found. Run 'notte auth login' or set NOTTE_API_KEY"
    );
}

#[tokio::test]
async fn test_empty_env_value_falls_through() {
    let temp_dir = TempDir::new().unwrap();
    let keychain = MemoryKeychain::new();
    keychain.set(API_KEY_ENTRY, "kc_key").await.unwrap();

    let credential = CredentialResolver::new(Arc::new(keychain))
        .with_env(env_with_key(""))
        .with_config_path(temp_dir.path().join("config.json"))
        .resolve()
        .await
        .unwrap();
    assert_eq!(credential.source, CredentialSource::Keychain);
}

#[tokio::test]
async fn test_corrupt_config_counts_as_missing() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    std::fs::write(&config_path, "not json").unwrap();

    let err = CredentialResolver::new(Arc::new(MemoryKeychain::new()))
        .with_env(Arc::new(HashMap::new()))
        .with_config_path(&config_path)
        .resolve()
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NoApiKey));
}
