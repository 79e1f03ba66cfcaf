//! Backend-neutral command batches.
//!
//! A [`Batch`] is the unit submitted to a cache backend in one round trip.
//! Commands are applied in order without cross-command atomicity: if one
//! fails the others may still have been applied.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Merge fields into a hash (HSET).
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Add a member to a set (SADD).
    SetAdd { key: String, member: String },
    /// Remove a member from a set (SREM).
    SetRemove { key: String, member: String },
    /// Overwrite a string value (SET).
    Set { key: String, value: String },
    /// Reset the time to live of an existing key (PEXPIRE).
    Expire { key: String, ttl: Duration },
    /// Delete a key of any type (DEL).
    Delete { key: String },
}

impl Command {
    pub fn key(&self) -> &str {
        match self {
            Self::HashSet { key, .. }
            | Self::SetAdd { key, .. }
            | Self::SetRemove { key, .. }
            | Self::Set { key, .. }
            | Self::Expire { key, .. }
            | Self::Delete { key } => key,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hset<I, F, V>(&mut self, key: impl Into<String>, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        self.commands.push(Command::HashSet {
            key: key.into(),
            fields: fields
                .into_iter()
                .map(|(f, v)| (f.into(), v.into()))
                .collect(),
        });
        self
    }

    pub fn sadd(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.commands.push(Command::SetAdd {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn srem(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.commands.push(Command::SetRemove {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(Command::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn expire(&mut self, key: impl Into<String>, ttl: Duration) -> &mut Self {
        self.commands.push(Command::Expire {
            key: key.into(),
            ttl,
        });
        self
    }

    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(Command::Delete { key: key.into() });
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_order() {
        let mut batch = Batch::new();
        batch
            .hset("record:1", [("name", "A")])
            .expire("record:1", Duration::from_secs(60))
            .sadd("ALL", "record:1")
            .del("record:2");

        let keys: Vec<&str> = batch.commands().iter().map(Command::key).collect();
        assert_eq!(keys, ["record:1", "record:1", "ALL", "record:2"]);
        assert_eq!(batch.len(), 4);
        assert_eq!(
            batch.commands()[0],
            Command::HashSet {
                key: "record:1".into(),
                fields: vec![("name".into(), "A".into())]
            }
        );
    }
}
