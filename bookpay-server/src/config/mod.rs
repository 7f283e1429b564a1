//! Configuration module for bookpay-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables, plus the book catalog the file points at.

pub mod file;

use crate::config::file::{FileConfig, LedgerBackend};
use bookpay_core::catalog::{BookCatalog, CatalogError};
use bookpay_core::config::{GatewayConfig, ServerConfig, SharedConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding `gateway.api_key`.
pub const ENV_API_KEY: &str = "PAYMOB_API_KEY";
/// Environment variable overriding `gateway.integration_id`.
pub const ENV_INTEGRATION_ID: &str = "PAYMOB_INTEGRATION_ID";
/// Environment variable overriding `gateway.hmac_secret`.
pub const ENV_HMAC_SECRET: &str = "PAYMOB_HMAC_SECRET";

const MAX_TIMEOUT_SECS: u64 = 120;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("failed to load book catalog: {0}")]
    CatalogError(#[from] CatalogError),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub catalog: BookCatalog,
    pub ledger_backend: LedgerBackend,
}

impl LoadedConfig {
    /// Split off the sections that are reloadable behind locks.
    pub fn into_shared(self) -> (SharedConfig, BookCatalog, LedgerBackend) {
        (
            SharedConfig::new(self.server, self.gateway),
            self.catalog,
            self.ledger_backend,
        )
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply environment and CLI overrides
    /// 3. Validate the configuration
    /// 4. Load the book catalog
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&config_content)?;
        self.process(file_config, |name| std::env::var(name).ok())
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn process(
        &self,
        mut file_config: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        apply_env_overrides(&mut file_config, env)?;
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;

        let catalog = BookCatalog::load(
            self.resolve(&file_config.catalog.data_path),
            self.resolve(&file_config.catalog.pdf_dir),
        )?;
        if catalog.is_empty() {
            tracing::warn!("Book catalog is empty");
        }

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
            },
            gateway: file_config.gateway.into_runtime(),
            catalog,
            ledger_backend: file_config.ledger.backend,
        })
    }

    /// Relative paths in the file are resolved against the file's directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.config_path.parent() {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }
}

fn apply_env_overrides(
    config: &mut FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(api_key) = env(ENV_API_KEY) {
        config.gateway.api_key = api_key;
    }
    if let Some(raw) = env(ENV_INTEGRATION_ID) {
        config.gateway.integration_id = raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("{ENV_INTEGRATION_ID} is not a number: {raw:?}"))
        })?;
    }
    if let Some(secret) = env(ENV_HMAC_SECRET) {
        config.gateway.hmac_secret = Some(secret);
    }
    Ok(())
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let gateway = &config.gateway;
    if gateway.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "gateway.api_key is empty (set it in the file or via {ENV_API_KEY})"
        )));
    }
    if gateway.integration_id == 0 {
        return Err(ConfigError::ValidationError(format!(
            "gateway.integration_id must be positive (set it in the file or via {ENV_INTEGRATION_ID})"
        )));
    }
    if gateway.iframe_id == 0 {
        return Err(ConfigError::ValidationError(
            "gateway.iframe_id must be positive".into(),
        ));
    }
    if !(1..=MAX_TIMEOUT_SECS).contains(&gateway.timeout_secs) {
        return Err(ConfigError::ValidationError(format!(
            "gateway.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
        )));
    }
    if gateway.currency.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "gateway.currency is empty".into(),
        ));
    }
    Ok(())
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
