//! In-process emulation of the Redis data types the index uses.
//!
//! Strings, hashes and sets with per-key expiry, stored in a `DashMap`.
//! Expired keys are purged lazily on access. Semantics follow Redis where
//! the index depends on them: `SET` clears any TTL, `PEXPIRE` on a missing
//! key is a no-op, a set whose last member is removed disappears, and a
//! command against a key of the wrong type fails without stopping the rest
//! of the batch.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::batch::{Batch, Command};
use crate::error::{IndexError, Result};

#[derive(Debug, Clone)]
enum LocalValue {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

impl LocalValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Hash(_) => "hash",
            Self::Set(_) => "set",
        }
    }
}

#[derive(Debug, Clone)]
struct LocalEntry {
    value: LocalValue,
    expires_at: Option<Instant>,
}

impl LocalEntry {
    fn new(value: LocalValue) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type(key: &str, found: &LocalValue) -> IndexError {
    IndexError::transport(format!(
        "WRONGTYPE operation against key '{key}' holding a {}",
        found.type_name()
    ))
}

/// Local key space.
#[derive(Debug, Default)]
pub struct LocalIndexStore {
    entries: DashMap<String, LocalEntry>,
}

impl LocalIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every command in order; returns the first error, if any, after
    /// the whole batch has been attempted.
    pub fn apply(&self, batch: &Batch) -> Result<()> {
        let now = Instant::now();
        let mut first_error = None;
        for command in batch.commands() {
            if let Err(e) = self.apply_one(command, now) {
                tracing::debug!(key = %command.key(), error = %e, "local command failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn apply_one(&self, command: &Command, now: Instant) -> Result<()> {
        match command {
            Command::HashSet { key, fields } => self.upsert(
                key,
                now,
                || LocalValue::Hash(HashMap::new()),
                |value| match value {
                    LocalValue::Hash(map) => {
                        map.extend(fields.iter().cloned());
                        Ok(())
                    }
                    other => Err(wrong_type(key, other)),
                },
            ),
            Command::SetAdd { key, member } => self.upsert(
                key,
                now,
                || LocalValue::Set(BTreeSet::new()),
                |value| match value {
                    LocalValue::Set(members) => {
                        members.insert(member.clone());
                        Ok(())
                    }
                    other => Err(wrong_type(key, other)),
                },
            ),
            Command::SetRemove { key, member } => {
                let emptied = match self.entries.get_mut(key.as_str()) {
                    Some(mut entry) if !entry.is_expired(now) => match &mut entry.value {
                        LocalValue::Set(members) => {
                            members.remove(member);
                            members.is_empty()
                        }
                        other => return Err(wrong_type(key, other)),
                    },
                    _ => false,
                };
                if emptied {
                    self.entries.remove_if(key.as_str(), |_, entry| {
                        matches!(&entry.value, LocalValue::Set(m) if m.is_empty())
                    });
                }
                Ok(())
            }
            Command::Set { key, value } => {
                self.entries
                    .insert(key.clone(), LocalEntry::new(LocalValue::Str(value.clone())));
                Ok(())
            }
            Command::Expire { key, ttl } => {
                if let Some(mut entry) = self.entries.get_mut(key.as_str()) {
                    if !entry.is_expired(now) {
                        entry.expires_at = Some(now + *ttl);
                    }
                }
                Ok(())
            }
            Command::Delete { key } => {
                self.entries.remove(key.as_str());
                Ok(())
            }
        }
    }

    fn upsert(
        &self,
        key: &str,
        now: Instant,
        init: impl Fn() -> LocalValue,
        apply: impl FnOnce(&mut LocalValue) -> Result<()>,
    ) -> Result<()> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| LocalEntry::new(init()));
        if entry.is_expired(now) {
            *entry = LocalEntry::new(init());
        }
        apply(&mut entry.value)
    }

    /// Run `f` against a live (non-expired) value, purging it if expired.
    fn read<T>(&self, key: &str, f: impl FnOnce(&LocalValue) -> Result<T>) -> Result<Option<T>> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return f(&entry.value).map(Some),
            Some(_) => {}
            None => return Ok(None),
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key, |value| match value {
            LocalValue::Str(s) => Ok(s.clone()),
            other => Err(wrong_type(key, other)),
        })
    }

    pub fn members(&self, key: &str) -> Result<Vec<String>> {
        let members = self.read(key, |value| match value {
            LocalValue::Set(members) => Ok(members.iter().cloned().collect()),
            other => Err(wrong_type(key, other)),
        })?;
        Ok(members.unwrap_or_default())
    }

    pub fn hash(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        self.read(key, |value| match value {
            LocalValue::Hash(map) => Ok(map.clone()),
            other => Err(wrong_type(key, other)),
        })
    }

    pub fn exists(&self, key: &str) -> bool {
        matches!(self.read(key, |_| Ok(())), Ok(Some(())))
    }

    /// Remaining time to live; `None` if the key is missing or has no expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of keys currently held, including expired keys not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_merge() {
        let store = LocalIndexStore::new();
        let mut batch = Batch::new();
        batch
            .hset("record:1", [("name", "A"), ("city", "Pune")])
            .hset("record:1", [("name", "B")]);
        store.apply(&batch).unwrap();

        let hash = store.hash("record:1").unwrap().unwrap();
        assert_eq!(hash["name"], "B");
        assert_eq!(hash["city"], "Pune");
    }

    #[test]
    fn test_set_semantics() {
        let store = LocalIndexStore::new();
        let mut batch = Batch::new();
        batch.sadd("ALL", "record:1").sadd("ALL", "record:1").sadd("ALL", "record:2");
        store.apply(&batch).unwrap();
        assert_eq!(store.members("ALL").unwrap(), ["record:1", "record:2"]);

        let mut batch = Batch::new();
        batch.srem("ALL", "record:1").srem("ALL", "record:2");
        store.apply(&batch).unwrap();
        assert!(!store.exists("ALL"));
        assert!(store.members("ALL").unwrap().is_empty());
    }

    #[test]
    fn test_expire_missing_key_is_noop() {
        let store = LocalIndexStore::new();
        let mut batch = Batch::new();
        batch.expire("missing", Duration::from_secs(10));
        store.apply(&batch).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_clears_ttl() {
        let store = LocalIndexStore::new();
        let mut batch = Batch::new();
        batch
            .set("reverse:city:Pune", "IN:MH")
            .expire("reverse:city:Pune", Duration::from_secs(60));
        store.apply(&batch).unwrap();
        assert!(store.ttl("reverse:city:Pune").is_some());

        let mut batch = Batch::new();
        batch.set("reverse:city:Pune", "IN:KA");
        store.apply(&batch).unwrap();
        assert_eq!(store.ttl("reverse:city:Pune"), None);
        assert_eq!(store.get("reverse:city:Pune").unwrap().as_deref(), Some("IN:KA"));
    }

    #[test]
    fn test_expired_keys_vanish() {
        let store = LocalIndexStore::new();
        let mut batch = Batch::new();
        batch
            .set("k", "v")
            .expire("k", Duration::from_millis(20));
        store.apply(&batch).unwrap();
        assert!(store.exists("k"));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_wrong_type_does_not_stop_batch() {
        let store = LocalIndexStore::new();
        let mut batch = Batch::new();
        batch.set("k", "v").sadd("k", "member").sadd("other", "member");
        let err = store.apply(&batch).unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("WRONGTYPE"));
        assert_eq!(store.members("other").unwrap(), ["member"]);
    }

    #[test]
    fn test_wrong_type_on_read() {
        let store = LocalIndexStore::new();
        let mut batch = Batch::new();
        batch.sadd("IN", "record:1");
        store.apply(&batch).unwrap();
        assert!(store.get("IN").is_err());
        assert!(store.hash("IN").is_err());
    }
}
