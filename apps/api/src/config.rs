//! API configuration module.
//!
//! Layered with the `config` crate, later layers winning:
//!
//! ```text
//! built-in defaults  →  stockroom.toml (optional)  →  STOCKROOM_* environment
//! ```

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Secret used when none is configured. Refused in production.
pub const DEV_JWT_SECRET: &str = "stockroom-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Directory decoded item images are written to
    pub uploads_dir: PathBuf,

    /// `development` or `production`
    pub environment: String,

    /// Request body limit in bytes (image payloads arrive inline)
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: PathBuf::from("./stockroom.db"),
            max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 7 * 24 * 3600,
            uploads_dir: PathBuf::from("./uploads"),
            environment: "development".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    /// Loads defaults, then `stockroom.toml` if present, then `STOCKROOM_*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("stockroom")
    }

    /// Same as [`ApiConfig::load`] with a custom file stem.
    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let settings = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port)?
            .set_default("database_path", defaults.database_path.display().to_string())?
            .set_default("max_connections", defaults.max_connections)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_lifetime_secs", defaults.jwt_lifetime_secs)?
            .set_default("uploads_dir", defaults.uploads_dir.display().to_string())?
            .set_default("environment", defaults.environment)?
            .set_default("max_body_bytes", defaults.max_body_bytes as u64)?
            .add_source(File::with_name(file_stem).required(false))
            .add_source(Environment::with_prefix("STOCKROOM").try_parsing(true))
            .build()?;

        let config: ApiConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if self.is_production() && self.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::InvalidValue(
                "jwt_secret must be set in production".to_string(),
            ));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_lifetime_secs".to_string()));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
