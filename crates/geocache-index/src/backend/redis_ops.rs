//! Redis execution of index batches over a pooled connection.

use std::collections::HashMap;

use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::batch::{Batch, Command};
use crate::error::Result;

/// Translate a batch into one non-transactional pipeline and send it.
pub async fn execute(pool: &Pool, batch: &Batch) -> Result<()> {
    let mut pipe = redis::pipe();
    for command in batch.commands() {
        match command {
            Command::HashSet { key, fields } => {
                pipe.hset_multiple(key, fields.as_slice()).ignore();
            }
            Command::SetAdd { key, member } => {
                pipe.sadd(key, member).ignore();
            }
            Command::SetRemove { key, member } => {
                pipe.srem(key, member).ignore();
            }
            Command::Set { key, value } => {
                pipe.set(key, value).ignore();
            }
            Command::Expire { key, ttl } => {
                let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                pipe.pexpire(key, millis).ignore();
            }
            Command::Delete { key } => {
                pipe.del(key).ignore();
            }
        }
    }

    let mut conn = pool.get().await?;
    let () = pipe.query_async(&mut conn).await?;
    Ok(())
}

pub async fn get(pool: &Pool, key: &str) -> Result<Option<String>> {
    let mut conn = pool.get().await?;
    Ok(conn.get::<_, Option<String>>(key).await?)
}

pub async fn members(pool: &Pool, key: &str) -> Result<Vec<String>> {
    let mut conn = pool.get().await?;
    Ok(conn.smembers::<_, Vec<String>>(key).await?)
}

pub async fn exists(pool: &Pool, key: &str) -> Result<bool> {
    let mut conn = pool.get().await?;
    Ok(conn.exists::<_, bool>(key).await?)
}

/// HGETALL for every key in one pipelined round trip. Missing hashes come
/// back as `None`, in the same order as `keys`.
pub async fn hashes(pool: &Pool, keys: &[String]) -> Result<Vec<Option<HashMap<String, String>>>> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut pipe = redis::pipe();
    for key in keys {
        pipe.hgetall(key);
    }

    let mut conn = pool.get().await?;
    let rows: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;
    Ok(rows
        .into_iter()
        .map(|row| if row.is_empty() { None } else { Some(row) })
        .collect())
}

pub async fn ping(pool: &Pool) -> Result<()> {
    let mut conn = pool.get().await?;
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(())
}
