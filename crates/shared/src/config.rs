//! Application configuration management.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Read cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline for a mutation up to its commit, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Extra time an HTTP request gets to finish a commit, in seconds.
    #[serde(default = "default_commit_grace")]
    pub commit_grace_secs: u64,
}

impl ServerConfig {
    /// Deadline handed to the wallet engine.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bound on a whole HTTP request. Always longer than
    /// [`ServerConfig::operation_timeout`] so a started commit is not abandoned.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        let grace = if self.commit_grace_secs == 0 {
            1
        } else {
            self.commit_grace_secs
        };
        Duration::from_secs(self.request_timeout_secs.saturating_add(grace))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            commit_grace_secs: default_commit_grace(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50052
}

fn default_request_timeout() -> u64 {
    30
}

fn default_commit_grace() -> u64 {
    5
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Read cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// When false every read goes to the store.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time-to-live of a cached snapshot in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Maximum number of cached snapshots.
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    /// Drop the affected users' snapshots after every committed mutation.
    ///
    /// Setting this to false keeps the historical behavior where a read
    /// within the TTL may return pre-mutation data.
    #[serde(default = "default_true")]
    pub invalidate_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            max_capacity: default_cache_capacity(),
            invalidate_on_write: true,
        }
    }
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
