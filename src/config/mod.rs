//! # Configuration Management
//!
//! Layered configuration for the validation core: built-in defaults, an
//! optional file (TOML, YAML or JSON, picked by extension), then environment
//! overrides such as `FLOWGATE__VALIDATION__ALLOW_WARNINGS=true`.

pub mod settings;

use std::path::Path;

use crate::errors::Result;

pub use settings::{AppConfig, ObservabilityConfig, ValidationConfig};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "FLOWGATE";

/// Separator between the prefix and nested keys in environment overrides.
pub const ENV_SEPARATOR: &str = "__";

/// Load and validate configuration.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder =
        config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let app_config: AppConfig = builder.build()?.try_deserialize()?;
    app_config.validate()?;

    tracing::debug!(
        allow_warnings = app_config.validation.allow_warnings,
        xds_validation_timeout_ms = app_config.validation.xds_validation_timeout_ms,
        default_proxy_name = %app_config.validation.default_proxy_name,
        "Loaded configuration"
    );

    Ok(app_config)
}

/// Load configuration from defaults and the environment only.
pub fn from_env() -> Result<AppConfig> {
    load(None)
}
