use std::process::ExitCode;

use anyhow::Context;
use geocache_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};
use geocache_server::{ServerBuilder, apply_logging_level};

const CONFIG_ENV: &str = "GEOCACHE_CONFIG";

/// Where the configuration path came from, for the startup log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigSource {
    Flag,
    Env,
    Default,
}

impl ConfigSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "--config",
            Self::Env => CONFIG_ENV,
            Self::Default => "default",
        }
    }
}

/// `--config <path>` beats `GEOCACHE_CONFIG`, which beats `geocache.toml`.
fn resolve_config_path(
    args: impl IntoIterator<Item = String>,
    env_value: Option<String>,
) -> (String, ConfigSource) {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            return (path.to_string(), ConfigSource::Flag);
        }
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::Flag);
        }
    }
    match env_value.filter(|p| !p.is_empty()) {
        Some(path) => (path, ConfigSource::Env),
        None => (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default),
    }
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("Warning: failed to load .env: {e}"),
    }
}

async fn run() -> anyhow::Result<()> {
    let (path, source) =
        resolve_config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());

    let cfg = load_config(Some(&path))
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("loading configuration from {path}"))?;
    tracing::info!(path = %path, source = source.as_str(), "configuration loaded");
    apply_logging_level(&cfg.logging.level);

    let server = ServerBuilder::new()
        .with_config(cfg)
        .build()
        .await
        .context("starting geocache")?;
    server.run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    geocache_server::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "geocache-server exited");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flag_wins() {
        let resolved = resolve_config_path(args(&["--config", "a.toml"]), Some("b.toml".into()));
        assert_eq!(resolved, ("a.toml".to_string(), ConfigSource::Flag));

        let resolved = resolve_config_path(args(&["--config=c.toml"]), None);
        assert_eq!(resolved, ("c.toml".to_string(), ConfigSource::Flag));
    }

    #[test]
    fn test_env_then_default() {
        let resolved = resolve_config_path(args(&[]), Some("b.toml".into()));
        assert_eq!(resolved.1, ConfigSource::Env);

        let resolved = resolve_config_path(args(&["--config"]), Some(String::new()));
        assert_eq!(resolved, (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default));
    }
}
