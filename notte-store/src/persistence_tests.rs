//! Persistence round-trip and edge case tests.
//!
//! Tests file I/O operations, JSON persistence, and config round-trip.

use tempfile::TempDir;

use crate::config::{Config, DEFAULT_API_URL};
use crate::persistence::{load_json, load_json_or_default, remove_file, save_json};

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("test.json");

    save_json(&nested_path, &serde_json::json!({"key": "value"}))
        .await
        .unwrap();
    assert!(nested_path.exists());
    assert!(!nested_path.with_extension("json.tmp").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_stale_world_readable_temp_file_is_not_reused() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let stale = path.with_extension("json.tmp");
    std::fs::write(&stale, "old").unwrap();
    std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();

    save_json(&path, &serde_json::json!({"api_key": "sk-test"})).await.unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    assert!(!stale.exists());
    let saved: serde_json::Value = load_json(&path).await.unwrap();
    assert_eq!(saved["api_key"], "sk-test");
}

#[cfg(unix)]
#[tokio::test]
async fn test_saved_file_and_created_dirs_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join(".notte").join("cli");
    let path = dir.join("config.json");

    save_json(&path, &serde_json::json!({})).await.unwrap();

    let mode = |p: &std::path::Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&path), 0o600);
    assert_eq!(mode(&dir), 0o700);
    assert_eq!(mode(dir.parent().unwrap()), 0o700);
}

#[tokio::test]
async fn test_output_is_two_space_indented() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let config = Config {
        api_key: Some("k".into()),
        api_url: None,
    };
    save_json(&path, &config).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "{\n  \"api_key\": \"k\"\n}");
}

#[tokio::test]
async fn test_load_nonexistent_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let result: Result<Config, _> = load_json(&temp_dir.path().join("missing.json")).await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_load_or_default_on_corrupt_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("corrupt.json");
    std::fs::write(&path, "{ not json").unwrap();

    let config: Config = load_json_or_default(&path).await;
    assert_eq!(config, Config::default());
}

#[tokio::test]
async fn test_remove_file_reports_existence() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, "{}").unwrap();

    assert!(remove_file(&path).await.unwrap());
    assert!(!remove_file(&path).await.unwrap());
}

// ============================================================================
// Config Tests
// ============================================================================

#[tokio::test]
async fn test_config_missing_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from(&temp_dir.path().join("config.json"))
        .await
        .unwrap();

    assert_eq!(config.api_key, None);
    assert_eq!(config.api_url.as_deref(), Some(DEFAULT_API_URL));
}

#[tokio::test]
async fn test_config_save_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let config = Config {
        api_key: Some("cfg_key".into()),
        api_url: Some("https://api.staging.example".into()),
    };
    config.save_to(&path).await.unwrap();

    assert_eq!(Config::load_from(&path).await.unwrap(), config);
}

#[tokio::test]
async fn test_config_resave_is_stable() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, r#"{"api_key":"cfg_key"}"#).unwrap();

    let first = Config::load_from(&path).await.unwrap();
    first.save_to(&path).await.unwrap();
    let second = Config::load_from(&path).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_config_empty_url_gets_default_and_unknown_fields_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, r#"{"api_key":"","api_url":"","theme":"dark"}"#).unwrap();

    let config = Config::load_from(&path).await.unwrap();
    assert_eq!(config.api_key, None);
    assert_eq!(config.api_url.as_deref(), Some(DEFAULT_API_URL));
}

#[tokio::test]
async fn test_config_malformed_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, "[1, 2").unwrap();

    assert!(Config::load_from(&path).await.is_err());
}
