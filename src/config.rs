use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Application configuration.
///
/// Loaded from built-in defaults, then `config/default.toml` and
/// `config/<env>.toml` if present, then `APP__*` environment variables.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    pub database_url: String,

    /// Secret used to sign and verify JWTs. No default on purpose.
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// Access-token lifetime in seconds.
    pub jwt_expiration: u64,

    pub auth_issuer: String,
    pub auth_audience: String,

    pub host: String,
    pub port: u16,

    pub environment: String,
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,

    /// Create missing tables on startup.
    #[serde(default = "default_true")]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Boundary below which a variant is flagged "Low" on the stock dashboard.
    #[serde(default = "default_low_stock_threshold")]
    #[validate(range(min = 1))]
    pub low_stock_threshold: i64,

    /// Root directory for uploaded media.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Hard cap for a single uploaded file, in bytes.
    #[serde(default = "default_upload_max_bytes")]
    pub upload_max_bytes: usize,

    /// Soft size target the post-upload recompression step aims for.
    #[serde(default = "default_upload_soft_target_bytes")]
    pub upload_soft_target_bytes: usize,
}

fn default_true() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_low_stock_threshold() -> i64 {
    5
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_upload_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_upload_soft_target_bytes() -> usize {
    400 * 1024
}

impl AppConfig {
    /// Minimal configuration for tests and local tooling.
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: u64,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            auth_issuer: "storefront-api".to_string(),
            auth_audience: "storefront-clients".to_string(),
            host,
            port,
            environment,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            low_stock_threshold: default_low_stock_threshold(),
            upload_dir: default_upload_dir(),
            upload_max_bytes: default_upload_max_bytes(),
            upload_soft_target_bytes: default_upload_soft_target_bytes(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Load configuration for the current `RUN_ENV`/`APP_ENV` profile.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?
        .set_default("auth_issuer", "storefront-api")?
        .set_default("auth_audience", "storefront-clients")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // jwt_secret has no default; fail with a clear message before deserialization.
    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET with a secure random string (minimum 32 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET.".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

/// Initialize the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);
    let filter = EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        )
    }

    #[test]
    fn defaults_applied_by_constructor() {
        let cfg = test_config();
        assert_eq!(cfg.low_stock_threshold, 5);
        assert_eq!(cfg.upload_max_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.upload_soft_target_bytes, 400 * 1024);
        assert!(cfg.auto_migrate);
    }

    #[test]
    fn short_jwt_secret_fails_validation() {
        let mut cfg = test_config();
        cfg.jwt_secret = "too-short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_environment_is_development_like() {
        let cfg = test_config();
        assert!(cfg.is_development());
    }
}
