//! Tracing setup.
//!
//! The filter sits behind a reload layer: the binary starts at `info`, then
//! swaps in `logging.level` once configuration is loaded. `RUST_LOG`, when
//! set, wins over both.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Dependencies kept quiet whatever the configured level.
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "redis=warn"];

fn filter_for(level: &str) -> EnvFilter {
    let directives = std::iter::once(level)
        .chain(QUIET_TARGETS.iter().copied())
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn rust_log_filter() -> Option<EnvFilter> {
    std::env::var_os("RUST_LOG")?;
    EnvFilter::try_from_default_env().ok()
}

pub fn init_tracing() {
    init_tracing_with_level("info");
}

pub fn init_tracing_with_level(level: &str) {
    let filter = rust_log_filter().unwrap_or_else(|| filter_for(level));
    let (filter_layer, handle) = reload::Layer::new(filter);
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Apply the configured level. No-op when `RUST_LOG` is set.
pub fn apply_logging_level(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    match handle.reload(filter_for(level)) {
        Ok(()) => tracing::debug!(level, "log level applied"),
        Err(e) => tracing::warn!(error = %e, level, "failed to apply log level"),
    }
}
