//! The sample configuration shipped at the repository root.

use std::path::PathBuf;

use geocache_server::{AppConfig, StorageBackend, config::loader};

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../geocache.toml")
}

#[test]
fn test_sample_config_parses() {
    let text = std::fs::read_to_string(sample_path()).unwrap();
    let cfg: AppConfig = toml::from_str(&text).unwrap();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(cfg.cache.ttl_secs, 86_400);
    assert!(!cfg.redis.enabled);
}

#[test]
fn test_sample_config_loads_with_overrides() {
    let path = sample_path();
    let env = [("GEOCACHE__REDIS__ENABLED".to_string(), "true".to_string())]
        .into_iter()
        .collect();
    let cfg = loader::load_config_with_env(path.to_str(), Some(env)).unwrap();
    assert!(cfg.redis.enabled);
    assert_eq!(cfg.storage.postgres.pool_size, 10);
    assert_eq!(cfg.logging.level, "info");
}
