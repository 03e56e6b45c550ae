//! Settings loader
//!
//! Loads factory settings from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If a retry bound is unset, falls back to loading from file
//!    (values that are set but invalid are errors)
//! 3. Probes multiple paths for settings files
//! 4. Supports JSON and TOML formats
//! 5. With no file anywhere, uses the defaults
//!
//! ## Environment Variables
//! - `STOREKEEPER_RETRY_MIN_DELAY_MS`: Lower bound of the reattempt delay
//! - `STOREKEEPER_RETRY_MAX_DELAY_MS`: Upper bound of the reattempt delay
//! - `STOREKEEPER_LOG_FILTER`: Default tracing filter directive (optional)
//! - `STOREKEEPER_LOG_JSON`: Emit JSON log lines (true/false, optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./storekeeper.toml` or `./storekeeper.json` (current working directory)
//! 2. `../storekeeper.toml` or `../storekeeper.json` (parent directory)
//! 3. `../../storekeeper.toml` or `../../storekeeper.json` (grandparent)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use storekeeper_common::{CommonError, CommonResult};
use storekeeper_domain::{LoggingSettings, RetryDelaySettings, StorekeeperSettings};

use super::retry_delay;

const SETTINGS_FILE_NAMES: [&str; 2] = ["storekeeper.toml", "storekeeper.json"];

const REQUIRED_ENV_KEYS: [&str; 2] =
    ["STOREKEEPER_RETRY_MIN_DELAY_MS", "STOREKEEPER_RETRY_MAX_DELAY_MS"];

/// Load settings with automatic fallback strategy
///
/// Uses the environment when both retry bounds are set. If either is absent,
/// falls back to a probed settings file, and to the defaults when no file
/// exists.
///
/// # Errors
/// Returns `CommonError::Config` or `CommonError::Serialization` if:
/// - An environment variable or file is present but invalid
/// - The retry window is out of order or too large
pub fn load() -> CommonResult<StorekeeperSettings> {
    let missing: Vec<_> =
        REQUIRED_ENV_KEYS.iter().filter(|key| std::env::var_os(key).is_none()).collect();
    if missing.is_empty() {
        let settings = load_from_env()?;
        tracing::info!("Settings loaded from environment variables");
        return Ok(settings);
    }

    tracing::debug!(?missing, "Environment incomplete, trying file");
    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::debug!("No settings file found, using defaults");
            Ok(StorekeeperSettings::default())
        }
    }
}

/// Load settings from environment variables
///
/// Both retry bounds must be present. Logging variables are optional.
///
/// # Errors
/// Returns `CommonError::Config` if required variables are missing, have
/// invalid values, or describe an invalid retry window.
pub fn load_from_env() -> CommonResult<StorekeeperSettings> {
    let [min_key, max_key] = REQUIRED_ENV_KEYS;
    let min_delay_ms = env_millis(min_key)?;
    let max_delay_ms = env_millis(max_key)?;

    let defaults = LoggingSettings::default();
    let filter = std::env::var("STOREKEEPER_LOG_FILTER").unwrap_or(defaults.filter);
    let json = env_bool("STOREKEEPER_LOG_JSON", defaults.json);

    let settings = StorekeeperSettings {
        retry: RetryDelaySettings { min_delay_ms, max_delay_ms },
        logging: LoggingSettings { filter, json },
    };
    retry_delay(&settings)?;
    Ok(settings)
}

/// Load settings from a file
///
/// If `path` is `None`, probes multiple locations for settings files.
/// Format is detected by file extension.
///
/// # Arguments
/// * `path` - Optional path to the settings file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns an error if:
/// - File not found (when path is specified)
/// - No settings file found (when path is `None`)
/// - File format is invalid
/// - The retry window is invalid
pub fn load_from_file(path: Option<PathBuf>) -> CommonResult<StorekeeperSettings> {
    let settings_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CommonError::config(format!(
                    "Settings file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CommonError::config("No settings file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %settings_path.display(), "Loading settings from file");

    let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
        CommonError::config(format!("Cannot read settings file {}: {e}", settings_path.display()))
    })?;
    let settings = parse_settings(&contents, &settings_path)?;
    retry_delay(&settings)?;
    Ok(settings)
}

/// Parse settings by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `CommonError::Serialization` if parsing fails and
/// `CommonError::Config` for an unsupported extension.
fn parse_settings(contents: &str, path: &Path) -> CommonResult<StorekeeperSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => Ok(toml::from_str(contents)?),
        "json" => Ok(serde_json::from_str(contents)?),
        _ => Err(CommonError::config(format!("Unsupported settings format: {}", extension))),
    }
}

/// Probe multiple paths for settings files
///
/// Searches the working directory and up to two parents, then the
/// executable's directory and up to two of its parents.
///
/// # Returns
/// The first settings file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| root.ancestors().take(3))
        .flat_map(|dir| SETTINGS_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Parse a required millisecond value from the environment.
fn env_millis(key: &str) -> CommonResult<u64> {
    let raw = std::env::var(key).map_err(|_| {
        CommonError::config_field(key, "missing required environment variable")
    })?;
    raw.trim()
        .parse::<u64>()
        .map_err(|e| CommonError::config_field(key, format!("invalid milliseconds: {}", e)))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: [&str; 4] = [
        "STOREKEEPER_RETRY_MIN_DELAY_MS",
        "STOREKEEPER_RETRY_MAX_DELAY_MS",
        "STOREKEEPER_LOG_FILTER",
        "STOREKEEPER_LOG_JSON",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn write_settings(contents: &str, extension: &str) -> (NamedTempFile, PathBuf) {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        (temp_file, path)
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("STOREKEEPER_TEST_BOOL_YES", "yes");
        std::env::set_var("STOREKEEPER_TEST_BOOL_UPPER", "TRUE");
        std::env::set_var("STOREKEEPER_TEST_BOOL_OFF", "off");

        assert!(env_bool("STOREKEEPER_TEST_BOOL_YES", false));
        assert!(env_bool("STOREKEEPER_TEST_BOOL_UPPER", false));
        assert!(!env_bool("STOREKEEPER_TEST_BOOL_OFF", true));

        std::env::remove_var("STOREKEEPER_TEST_BOOL_MISSING");
        assert!(env_bool("STOREKEEPER_TEST_BOOL_MISSING", true));

        std::env::remove_var("STOREKEEPER_TEST_BOOL_YES");
        std::env::remove_var("STOREKEEPER_TEST_BOOL_UPPER");
        std::env::remove_var("STOREKEEPER_TEST_BOOL_OFF");
    }

    /// Validates `load_from_env` behavior for the fully populated
    /// environment scenario.
    ///
    /// Assertions:
    /// - Retry bounds and logging settings come from the variables.
    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOREKEEPER_RETRY_MIN_DELAY_MS", "100");
        std::env::set_var("STOREKEEPER_RETRY_MAX_DELAY_MS", "300");
        std::env::set_var("STOREKEEPER_LOG_FILTER", "storekeeper_core=debug");
        std::env::set_var("STOREKEEPER_LOG_JSON", "true");

        let result = load_from_env();
        clear_env();

        let settings = result.expect("settings from env");
        assert_eq!(settings.retry.min_delay_ms, 100);
        assert_eq!(settings.retry.max_delay_ms, 300);
        assert_eq!(settings.logging.filter, "storekeeper_core=debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn test_load_from_env_optional_logging_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOREKEEPER_RETRY_MIN_DELAY_MS", "150");
        std::env::set_var("STOREKEEPER_RETRY_MAX_DELAY_MS", "250");

        let result = load_from_env();
        clear_env();

        let settings = result.expect("settings from env");
        assert_eq!(settings.logging, LoggingSettings::default());
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOREKEEPER_RETRY_MIN_DELAY_MS", "150");
        let result = load_from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(
            matches!(err, CommonError::Config { field: Some(ref f), .. } if f == "STOREKEEPER_RETRY_MAX_DELAY_MS")
        );
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOREKEEPER_RETRY_MIN_DELAY_MS", "soon");
        std::env::set_var("STOREKEEPER_RETRY_MAX_DELAY_MS", "250");
        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(CommonError::Config { .. })));
    }

    /// Validates `load_from_env` behavior for an inverted retry window.
    ///
    /// Assertions:
    /// - `min > max` is rejected as a configuration error.
    #[test]
    fn test_load_from_env_rejects_inverted_window() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOREKEEPER_RETRY_MIN_DELAY_MS", "400");
        std::env::set_var("STOREKEEPER_RETRY_MAX_DELAY_MS", "200");
        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(CommonError::Config { .. })));
    }

    #[test]
    fn test_load_from_file_toml() {
        let (_temp, path) = write_settings(
            r#"
[retry]
min_delay_ms = 50
max_delay_ms = 75

[logging]
json = true
"#,
            "toml",
        );

        let settings = load_from_file(Some(path.clone())).expect("settings from TOML");
        assert_eq!(settings.retry, RetryDelaySettings { min_delay_ms: 50, max_delay_ms: 75 });
        assert!(settings.logging.json);
        assert_eq!(settings.logging.filter, "info");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_json() {
        let (_temp, path) =
            write_settings(r#"{ "retry": { "min_delay_ms": 10, "max_delay_ms": 20 } }"#, "json");

        let settings = load_from_file(Some(path.clone())).expect("settings from JSON");
        assert_eq!(settings.retry.min_delay_ms, 10);
        assert_eq!(settings.retry.max_delay_ms, 20);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_rejects_excessive_delay() {
        let (_temp, path) = write_settings("[retry]\nmax_delay_ms = 60000\n", "toml");

        let result = load_from_file(Some(path.clone()));
        assert!(matches!(result, Err(CommonError::Config { .. })));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/storekeeper.toml")));
        assert!(matches!(result, Err(CommonError::Config { .. })));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let (_temp, path) = write_settings(r#"{ "retry": "#, "json");

        let result = load_from_file(Some(path.clone()));
        assert!(
            matches!(result, Err(CommonError::Serialization { format: Some(ref f), .. }) if f == "JSON")
        );

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_settings_unsupported_format() {
        let result = parse_settings("retry: {}", &PathBuf::from("storekeeper.yaml"));
        assert!(matches!(result, Err(CommonError::Config { .. })));
    }

    /// Validates `load` behavior for environment values that are set but
    /// invalid.
    ///
    /// Assertions:
    /// - An inverted window, a non-numeric bound and an excessive bound are
    ///   all reported instead of falling back to a file or the defaults.
    #[test]
    fn test_load_propagates_invalid_env_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for (min, max) in [("400", "200"), ("soon", "250"), ("150", "60000")] {
            clear_env();
            std::env::set_var("STOREKEEPER_RETRY_MIN_DELAY_MS", min);
            std::env::set_var("STOREKEEPER_RETRY_MAX_DELAY_MS", max);

            let result = load();
            clear_env();

            assert!(
                matches!(result, Err(CommonError::Config { .. })),
                "{min}..{max} was accepted: {result:?}"
            );
        }
    }

    #[test]
    fn test_load_prefers_complete_env() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOREKEEPER_RETRY_MIN_DELAY_MS", "20");
        std::env::set_var("STOREKEEPER_RETRY_MAX_DELAY_MS", "30");
        let result = load();
        clear_env();

        let settings = result.expect("settings from env");
        assert_eq!(settings.retry, RetryDelaySettings { min_delay_ms: 20, max_delay_ms: 30 });
    }

    /// Validates `load` behavior when a required variable is unset.
    ///
    /// Assertions:
    /// - The invalid lone bound is not read; loading falls back.
    /// - Without a settings file the defaults are returned.
    #[test]
    fn test_load_falls_back_when_env_incomplete() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOREKEEPER_RETRY_MIN_DELAY_MS", "soon");
        let result = load();
        clear_env();

        let settings = result.expect("fallback settings");
        if probe_config_paths().is_none() {
            assert_eq!(settings, StorekeeperSettings::default());
        }
    }
}
