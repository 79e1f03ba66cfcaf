//! Key algebra.
//!
//! Pure mapping from a record to every cache key it owns or belongs to.
//!
//! ```text
//! record:<id>                      hash with the full record
//! ALL                              set of every record key
//! <country>                        set
//! <country>:<state>                set
//! <country>:<state>:<city>         set
//! <country>:<state>:<city>:<area>  set
//! reverse:state:<state>            -> <country>
//! reverse:city:<city>              -> <country>:<state>
//! reverse:area:<area>              -> <country>:<state>:<city>
//! ```
//!
//! Levels are joined with `:` without escaping; hierarchy values containing
//! the delimiter are rejected by `geocache_core::validate_segment` before
//! they reach this module.

use geocache_core::{HierarchyLevel, HierarchyPath, LocationId, LocationRecord};

pub const DELIMITER: &str = ":";
pub const ALL_KEY: &str = "ALL";
pub const HASH_PREFIX: &str = "record";
pub const REVERSE_PREFIX: &str = "reverse";

/// Hash key holding a single record.
#[inline]
pub fn hash_key(id: LocationId) -> String {
    format!("{HASH_PREFIX}{DELIMITER}{id}")
}

/// Set key for `path` truncated at `depth` (country first).
pub fn set_key(path: &HierarchyPath, depth: HierarchyLevel) -> String {
    let levels = path.levels();
    let take = depth_index(depth) + 1;
    levels[..take]
        .iter()
        .map(|(_, value)| *value)
        .collect::<Vec<_>>()
        .join(DELIMITER)
}

/// Appends one level to an ancestor prefix read from a reverse pointer.
#[inline]
pub fn compose(prefix: &str, name: &str) -> String {
    format!("{prefix}{DELIMITER}{name}")
}

/// Reverse pointer key for a leaf-level name.
#[inline]
pub fn reverse_key(level: HierarchyLevel, name: &str) -> String {
    format!("{REVERSE_PREFIX}{DELIMITER}{level}{DELIMITER}{name}")
}

/// Value stored under the reverse pointer for `level`: the ancestor prefix
/// one level above it. `None` for country, which has no ancestors.
pub fn ancestor_prefix(path: &HierarchyPath, level: HierarchyLevel) -> Option<String> {
    match level {
        HierarchyLevel::Country => None,
        HierarchyLevel::State => Some(set_key(path, HierarchyLevel::Country)),
        HierarchyLevel::City => Some(set_key(path, HierarchyLevel::State)),
        HierarchyLevel::Area => Some(set_key(path, HierarchyLevel::City)),
    }
}

fn depth_index(level: HierarchyLevel) -> usize {
    match level {
        HierarchyLevel::Country => 0,
        HierarchyLevel::State => 1,
        HierarchyLevel::City => 2,
        HierarchyLevel::Area => 3,
    }
}

/// A reverse pointer: leaf-name key and the ancestor prefix it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversePointer {
    pub key: String,
    pub target: String,
}

/// Every key derived from one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKeys {
    pub hash: String,
    pub all: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub area: String,
    pub reverse_state: ReversePointer,
    pub reverse_city: ReversePointer,
    pub reverse_area: ReversePointer,
}

impl IndexKeys {
    pub fn for_record(record: &LocationRecord) -> Self {
        Self::for_path(record.id, &record.path)
    }

    pub fn for_path(id: LocationId, path: &HierarchyPath) -> Self {
        let pointer = |level: HierarchyLevel, name: &str| ReversePointer {
            key: reverse_key(level, name),
            target: ancestor_prefix(path, level).unwrap_or_default(),
        };
        Self {
            hash: hash_key(id),
            all: ALL_KEY.to_string(),
            country: set_key(path, HierarchyLevel::Country),
            state: set_key(path, HierarchyLevel::State),
            city: set_key(path, HierarchyLevel::City),
            area: set_key(path, HierarchyLevel::Area),
            reverse_state: pointer(HierarchyLevel::State, &path.state),
            reverse_city: pointer(HierarchyLevel::City, &path.city),
            reverse_area: pointer(HierarchyLevel::Area, &path.area),
        }
    }

    /// The five sets the record's hash key is a member of.
    pub fn set_keys(&self) -> [&str; 5] {
        [
            self.all.as_str(),
            self.country.as_str(),
            self.state.as_str(),
            self.city.as_str(),
            self.area.as_str(),
        ]
    }

    pub fn reverse_pointers(&self) -> [&ReversePointer; 3] {
        [&self.reverse_area, &self.reverse_city, &self.reverse_state]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> HierarchyPath {
        HierarchyPath::new("IN", "MH", "Pune", "Kothrud")
    }

    #[test]
    fn test_hash_key() {
        assert_eq!(hash_key(1), "record:1");
        assert_ne!(hash_key(1), hash_key(11));
    }

    #[test]
    fn test_set_keys_nest_left_to_right() {
        let keys = IndexKeys::for_path(1, &path());
        assert_eq!(
            keys.set_keys(),
            ["ALL", "IN", "IN:MH", "IN:MH:Pune", "IN:MH:Pune:Kothrud"]
        );
    }

    #[test]
    fn test_reverse_pointers() {
        let keys = IndexKeys::for_path(1, &path());
        assert_eq!(
            keys.reverse_area,
            ReversePointer {
                key: "reverse:area:Kothrud".into(),
                target: "IN:MH:Pune".into()
            }
        );
        assert_eq!(keys.reverse_city.key, "reverse:city:Pune");
        assert_eq!(keys.reverse_city.target, "IN:MH");
        assert_eq!(keys.reverse_state.key, "reverse:state:MH");
        assert_eq!(keys.reverse_state.target, "IN");
    }

    #[test]
    fn test_reverse_round_trip() {
        let p = path();
        let keys = IndexKeys::for_path(5, &p);
        for (level, name, set) in [
            (HierarchyLevel::State, "MH", &keys.state),
            (HierarchyLevel::City, "Pune", &keys.city),
            (HierarchyLevel::Area, "Kothrud", &keys.area),
        ] {
            let prefix = ancestor_prefix(&p, level).unwrap();
            assert_eq!(&compose(&prefix, name), set);
        }
        assert_eq!(ancestor_prefix(&p, HierarchyLevel::Country), None);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(IndexKeys::for_path(3, &path()), IndexKeys::for_path(3, &path()));
    }
}
