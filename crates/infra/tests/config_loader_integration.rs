//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading settings files and turning
//! them into the reattempt window the factories use.

use std::io::Write;
use std::time::Duration;

use storekeeper_infra::config;
use tempfile::{Builder, NamedTempFile};

fn settings_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .prefix("storekeeper")
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write settings");
    file.flush().expect("Failed to flush settings");
    file
}

#[test]
fn test_load_settings_from_json_file() {
    let file = settings_file(
        ".json",
        r#"{
            "retry": { "min_delay_ms": 100, "max_delay_ms": 300 },
            "logging": { "filter": "storekeeper_core=debug", "json": true }
        }"#,
    );

    let settings =
        config::load_from_file(Some(file.path().to_path_buf())).expect("Failed to load settings");

    assert_eq!(settings.retry.min_delay_ms, 100);
    assert_eq!(settings.retry.max_delay_ms, 300);
    assert_eq!(settings.logging.filter, "storekeeper_core=debug");
    assert!(settings.logging.json);
}

/// Validates `config::retry_delay` for a partial TOML settings file.
///
/// Assertions:
/// - Unset fields keep their defaults.
/// - The resulting window spans the configured bounds.
#[test]
fn test_partial_toml_file_yields_retry_window() {
    let file = settings_file(
        ".toml",
        r#"
[retry]
max_delay_ms = 400
"#,
    );

    let settings =
        config::load_from_file(Some(file.path().to_path_buf())).expect("Failed to load settings");
    let delay = config::retry_delay(&settings).expect("valid window");

    assert_eq!(delay.min(), Duration::from_millis(150));
    assert_eq!(delay.max(), Duration::from_millis(400));
    assert_eq!(settings.logging.filter, "info");
}

#[test]
fn test_inverted_window_is_rejected() {
    let file = settings_file(
        ".toml",
        r#"
[retry]
min_delay_ms = 500
max_delay_ms = 100
"#,
    );

    let result = config::load_from_file(Some(file.path().to_path_buf()));

    assert!(result.is_err(), "inverted window should fail validation");
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let file = settings_file(".yaml", "retry: {}");

    let err = config::load_from_file(Some(file.path().to_path_buf()))
        .expect_err("yaml is not supported");

    assert!(err.to_string().contains("Unsupported settings format: yaml"));
}

#[test]
fn test_missing_file_is_reported() {
    let err = config::load_from_file(Some("/nonexistent/storekeeper.toml".into()))
        .expect_err("missing file should fail");

    assert!(err.to_string().contains("Settings file not found"));
}
