use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Drop and recreate the `documents` table when its columns do not match.
    /// Destroys all metadata; off unless explicitly enabled.
    #[serde(default)]
    pub reset_on_schema_mismatch: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root of the document repository on disk.
    pub repository_path: PathBuf,
    /// Maximum accepted document size in bytes.
    pub max_upload_size: u64,
    /// Timeout for fetching documents from a remote URL.
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    /// Usage percentage above which a resource is reported as a warning.
    pub warning_threshold_percent: f64,
    /// Free repository space below which a warning is reported.
    pub min_free_bytes: u64,
    /// Sampling window for CPU usage.
    pub cpu_sample_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            warning_threshold_percent: 80.0,
            min_free_bytes: 1024 * 1024 * 1024,
            cpu_sample_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub health: HealthConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("DOCREPO_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://data/documents.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.reset_on_schema_mismatch", false)?
            .set_default("storage.repository_path", "./repository")?
            .set_default("storage.max_upload_size", 128 * 1024 * 1024)?
            .set_default("storage.fetch_timeout_secs", 30)?
            .set_default("health.warning_threshold_percent", 80.0)?
            .set_default("health.min_free_bytes", 1024_i64 * 1024 * 1024)?
            .set_default("health.cpu_sample_ms", 250)?
            // Load from config/config.toml
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., DOCREPO__STORAGE__REPOSITORY_PATH)
            .add_source(Environment::with_prefix("DOCREPO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
