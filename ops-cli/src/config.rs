use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "authzdb.yaml";

/// Prefix of environment variables overriding the config file
pub const ENV_PREFIX: &str = "AUTHZDB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Settings for the `authzdb` CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub output: OutputFormat,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            output: OutputFormat::Text,
        }
    }
}

impl OpsConfig {
    /// Loads defaults, then the config file, then `AUTHZDB_*` variables.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be parsed, or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::load_layers(file, path.is_some(), ENV_PREFIX)
    }

    fn load_layers(file: &Path, required: bool, env_prefix: &str) -> Result<Self> {
        let defaults = OpsConfig::default();

        let settings = ::config::Config::builder()
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", "text")?
            .set_default("output", "text")?
            .add_source(::config::File::from(file).required(required))
            .add_source(::config::Environment::with_prefix(env_prefix))
            .build()
            .with_context(|| format!("failed to load configuration from {}", file.display()))?;

        settings
            .try_deserialize()
            .context("invalid authzdb configuration")
    }
}
