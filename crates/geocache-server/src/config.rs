use std::{net::SocketAddr, time::Duration};

use geocache_db_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Redis configuration for the shared index
    #[serde(default)]
    pub redis: RedisConfig,
    /// Index TTL and cache call deadlines
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".into());
        }
        if self.cache.op_timeout_ms == 0 {
            return Err("cache.op_timeout_ms must be > 0".into());
        }
        if self.redis.enabled {
            if self.redis.url.is_empty() {
                return Err("redis.enabled=true requires redis.url".into());
            }
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
            if self.redis.timeout_ms == 0 {
                return Err("redis.timeout_ms must be > 0".into());
            }
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.storage.backend == StorageBackend::Postgres {
            self.storage
                .postgres
                .validate()
                .map_err(|e| format!("storage.postgres: {e}"))?;
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Which backing store holds the canonical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store; data is lost on restart.
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Used when `backend = "postgres"`
    #[serde(default)]
    pub postgres: PostgresConfig,
}

/// Redis configuration for the shared index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades to the in-process index without it)
    /// Default: false
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL of every index key, reset on each write
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Deadline for a single cache call made by the service
    #[serde(default = "default_cache_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

fn default_cache_ttl_secs() -> u64 {
    86_400 // 24 hours
}

fn default_cache_op_timeout_ms() -> u64 {
    500
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            op_timeout_ms: default_cache_op_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, Map};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "geocache.toml";
    pub const ENV_PREFIX: &str = "GEOCACHE";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        load_config_with_env(path, None)
    }

    /// Like [`load_config`], but reads overrides from `env` instead of the
    /// process environment when given.
    pub fn load_config_with_env(
        path: Option<&str>,
        env: Option<Map<String, String>>,
    ) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., GEOCACHE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__")
                .source(env),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.cache.op_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert!(!cfg.redis.enabled);
        assert_eq!(cfg.addr().port(), 8080);
    }

    #[test]
    fn test_validation_errors() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().unwrap_err().contains("server.port"));

        let mut cfg = AppConfig::default();
        cfg.cache.ttl_secs = 0;
        assert!(cfg.validate().unwrap_err().contains("cache.ttl_secs"));

        let mut cfg = AppConfig::default();
        cfg.cache.op_timeout_ms = 0;
        assert!(cfg.validate().unwrap_err().contains("op_timeout_ms"));

        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));

        let mut cfg = AppConfig::default();
        cfg.storage.backend = StorageBackend::Postgres;
        cfg.storage.postgres.url = String::new();
        let err = cfg.validate().unwrap_err();
        assert!(err.starts_with("storage.postgres"));
        assert!(err.contains("url"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg =
            loader::load_config_with_env(Some("does-not-exist.toml"), Some(Default::default()))
                .unwrap();
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let env = [
            ("GEOCACHE__SERVER__PORT", "9090"),
            ("GEOCACHE__REDIS__ENABLED", "true"),
            ("GEOCACHE__REDIS__URL", "redis://cache:6379"),
            ("GEOCACHE__CACHE__TTL_SECS", "60"),
            ("GEOCACHE__STORAGE__BACKEND", "postgres"),
            ("GEOCACHE__STORAGE__POSTGRES__URL", "postgres://db/geo"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cfg = loader::load_config_with_env(Some("does-not-exist.toml"), Some(env)).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert!(cfg.redis.enabled);
        assert_eq!(cfg.redis.url, "redis://cache:6379");
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
        assert_eq!(cfg.storage.postgres.url, "postgres://db/geo");
        assert_eq!(cfg.storage.postgres.pool_size, 10);
    }

    #[test]
    fn test_invalid_env_rejected() {
        let env = [("GEOCACHE__CACHE__OP_TIMEOUT_MS".to_string(), "0".to_string())]
            .into_iter()
            .collect();
        let err = loader::load_config_with_env(Some("does-not-exist.toml"), Some(env)).unwrap_err();
        assert!(err.contains("op_timeout_ms"));
    }
}
