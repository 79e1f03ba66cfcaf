//! Connection pool for the location tables.

use std::str::FromStr;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgConnectOptions, PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::Result;

const APPLICATION_NAME: &str = "geocache";

/// Build a pool from `config`. Fails fast when the first connection cannot
/// be opened.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    config.validate()?;

    let connect = PgConnectOptions::from_str(&config.url)?.application_name(APPLICATION_NAME);
    let pool = PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size)
        .acquire_timeout(config.connect_timeout())
        .idle_timeout(config.idle_timeout())
        .connect_with(connect)
        .await?;

    info!(pool_size = config.pool_size, "PostgreSQL pool ready");
    Ok(pool)
}

/// Readiness check.
#[instrument(skip(pool))]
pub async fn test_connection(pool: &PgPool) -> Result<()> {
    sqlx_core::query::query("SELECT 1").execute(pool).await?;
    debug!("PostgreSQL answered");
    Ok(())
}

/// Hide the password of a connection URL before it is logged.
pub fn mask_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
