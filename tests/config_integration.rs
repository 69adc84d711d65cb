//! Integration tests for configuration loading
//!
//! Covers the layering of defaults, configuration files and environment
//! overrides, and the rejection of invalid settings.

use flowgate::config::{self, AppConfig};
use flowgate::Result;
use std::env;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Loading always reads the environment, so every test takes the lock.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const OVERRIDES: &[&str] = &[
    "FLOWGATE__VALIDATION__ALLOW_WARNINGS",
    "FLOWGATE__VALIDATION__XDS_VALIDATION_TIMEOUT_MS",
    "FLOWGATE__OBSERVABILITY__LOG_LEVEL",
];

/// Clears the overrides on creation and restores them on drop.
struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn clean() -> Self {
        let saved = OVERRIDES
            .iter()
            .map(|key| (*key, env::var(key).ok()))
            .collect();
        for key in OVERRIDES {
            env::remove_var(key);
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }
}

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_defaults_without_file_or_environment() -> Result<()> {
    let _lock = ENV_MUTEX.lock().unwrap();
    let _env = EnvGuard::clean();

    let config = config::from_env()?;
    assert!(!config.validation.allow_warnings);
    assert_eq!(config.validation.xds_validation_timeout_ms, 5000);
    assert_eq!(config.validation.default_proxy_name, "gateway-proxy");
    assert_eq!(config.validation.write_namespace, "flowgate-system");
    assert_eq!(config.observability.log_level, "info");
    assert_eq!(config.observability.metrics_bind_address(), None);

    Ok(())
}

#[test]
fn test_yaml_file_overrides_defaults() -> Result<()> {
    let _lock = ENV_MUTEX.lock().unwrap();
    let _env = EnvGuard::clean();

    let file = config_file(
        ".yaml",
        r#"
validation:
  allow_warnings: true
  xds_validation_timeout_ms: 250
  default_proxy_name: edge-proxy
observability:
  enable_metrics: true
  metrics_port: 9102
"#,
    );

    let config = config::load(Some(file.path()))?;
    assert!(config.validation.allow_warnings);
    assert!(!config.validation.strict());
    assert_eq!(config.validation.xds_validation_timeout().as_millis(), 250);
    assert_eq!(config.validation.default_proxy_name, "edge-proxy");
    // Keys absent from the file keep their defaults.
    assert_eq!(config.validation.write_namespace, "flowgate-system");
    assert_eq!(
        config.observability.metrics_bind_address(),
        Some("0.0.0.0:9102".to_string())
    );

    Ok(())
}

#[test]
fn test_environment_overrides_file() -> Result<()> {
    let _lock = ENV_MUTEX.lock().unwrap();
    let _env = EnvGuard::clean();

    let file = config_file(
        ".toml",
        r#"
[validation]
allow_warnings = true
xds_validation_timeout_ms = 250
"#,
    );

    env::set_var("FLOWGATE__VALIDATION__ALLOW_WARNINGS", "false");
    env::set_var("FLOWGATE__OBSERVABILITY__LOG_LEVEL", "debug");

    let config = config::load(Some(file.path()))?;
    assert!(!config.validation.allow_warnings);
    assert_eq!(config.validation.xds_validation_timeout_ms, 250);
    assert_eq!(config.observability.log_level, "debug");

    Ok(())
}

#[test]
fn test_invalid_settings_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let _env = EnvGuard::clean();

    env::set_var("FLOWGATE__VALIDATION__XDS_VALIDATION_TIMEOUT_MS", "0");
    assert!(config::from_env().is_err());

    env::set_var(
        "FLOWGATE__VALIDATION__XDS_VALIDATION_TIMEOUT_MS",
        "not-a-number",
    );
    assert!(config::from_env().is_err());
    env::remove_var("FLOWGATE__VALIDATION__XDS_VALIDATION_TIMEOUT_MS");

    let file = config_file(".yaml", "validation:\n  default_proxy_name: Edge_Proxy\n");
    assert!(config::load(Some(file.path())).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let _env = EnvGuard::clean();

    let dir = tempfile::tempdir().expect("temp dir");
    assert!(config::load(Some(&dir.path().join("absent.yaml"))).is_err());
}

#[test]
fn test_default_config_is_valid() {
    assert!(AppConfig::default().validate().is_ok());
}
