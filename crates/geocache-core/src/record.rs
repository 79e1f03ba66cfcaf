//! Location records and their hierarchy path.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Identifier assigned by the backing store.
pub type LocationId = i64;

/// Delimiter joining hierarchy levels in derived cache keys.
pub const DELIMITER: char = ':';

/// Country names whose set keys would collide with other key families
/// (`ALL`, `record:<id>`, `reverse:<level>:<name>`).
pub const RESERVED_COUNTRIES: [&str; 3] = ["ALL", "record", "reverse"];

/// Field names used in the cached hash and in JSON payloads.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const STREET_ADDRESS: &str = "streetaddress";
    pub const COUNTRY: &str = "country";
    pub const STATE: &str = "state";
    pub const CITY: &str = "city";
    pub const AREA: &str = "area";

    /// Fields that may be patched in place without re-indexing.
    pub const PATCHABLE: [&str; 3] = [NAME, DESCRIPTION, STREET_ADDRESS];

    /// Fields that position a record in the hierarchy.
    pub const HIERARCHY: [&str; 4] = [COUNTRY, STATE, CITY, AREA];
}

/// One nesting level of the location hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HierarchyLevel {
    Country,
    State,
    City,
    Area,
}

impl HierarchyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => fields::COUNTRY,
            Self::State => fields::STATE,
            Self::City => fields::CITY,
            Self::Area => fields::AREA,
        }
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks that a single hierarchy value can be embedded in a cache key.
///
/// Values must be non-empty, free of the `:` delimiter and of surrounding
/// whitespace. Country values additionally must not be one of
/// [`RESERVED_COUNTRIES`].
pub fn validate_segment(level: HierarchyLevel, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CoreError::invalid_hierarchy(
            level.as_str(),
            value,
            "must not be empty",
        ));
    }
    if value.contains(DELIMITER) {
        return Err(CoreError::invalid_hierarchy(
            level.as_str(),
            value,
            "must not contain ':'",
        ));
    }
    if value.trim() != value {
        return Err(CoreError::invalid_hierarchy(
            level.as_str(),
            value,
            "must not have leading or trailing whitespace",
        ));
    }
    if level == HierarchyLevel::Country && RESERVED_COUNTRIES.contains(&value) {
        return Err(CoreError::ReservedName(value.to_string()));
    }
    Ok(())
}

/// The (country, state, city, area) tuple locating a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchyPath {
    pub country: String,
    pub state: String,
    pub city: String,
    pub area: String,
}

impl HierarchyPath {
    pub fn new(
        country: impl Into<String>,
        state: impl Into<String>,
        city: impl Into<String>,
        area: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            city: city.into(),
            area: area.into(),
        }
    }

    /// Levels paired with their values, country first.
    pub fn levels(&self) -> [(HierarchyLevel, &str); 4] {
        [
            (HierarchyLevel::Country, self.country.as_str()),
            (HierarchyLevel::State, self.state.as_str()),
            (HierarchyLevel::City, self.city.as_str()),
            (HierarchyLevel::Area, self.area.as_str()),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (level, value) in self.levels() {
            validate_segment(level, value)?;
        }
        Ok(())
    }
}

/// A location as created by a client, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub description: String,
    #[serde(rename = "streetaddress")]
    pub street_address: String,
    #[serde(flatten)]
    pub path: HierarchyPath,
}

impl NewLocation {
    pub fn validate(&self) -> Result<()> {
        self.path.validate()
    }

    /// Attach the store-assigned id.
    pub fn into_record(self, id: LocationId) -> LocationRecord {
        LocationRecord {
            id,
            name: self.name,
            description: self.description,
            street_address: self.street_address,
            path: self.path,
        }
    }
}

/// A stored location as cached and served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub name: String,
    pub description: String,
    #[serde(rename = "streetaddress")]
    pub street_address: String,
    #[serde(flatten)]
    pub path: HierarchyPath,
}

impl LocationRecord {
    pub fn validate(&self) -> Result<()> {
        self.path.validate()
    }

    /// Flat field/value pairs written to the cache hash.
    pub fn to_fields(&self) -> [(&'static str, String); 8] {
        [
            (fields::ID, self.id.to_string()),
            (fields::NAME, self.name.clone()),
            (fields::DESCRIPTION, self.description.clone()),
            (fields::STREET_ADDRESS, self.street_address.clone()),
            (fields::COUNTRY, self.path.country.clone()),
            (fields::STATE, self.path.state.clone()),
            (fields::CITY, self.path.city.clone()),
            (fields::AREA, self.path.area.clone()),
        ]
    }

    /// Rebuild a record from a cached hash.
    ///
    /// Descriptive fields default to empty strings; `id` and the four
    /// hierarchy fields are required.
    pub fn from_fields(map: &HashMap<String, String>) -> Result<Self> {
        let required = |name: &str| {
            map.get(name)
                .cloned()
                .ok_or_else(|| CoreError::invalid_record(format!("missing field '{name}'")))
        };
        let optional = |name: &str| map.get(name).cloned().unwrap_or_default();

        let raw_id = required(fields::ID)?;
        let id = raw_id
            .parse::<LocationId>()
            .map_err(|_| CoreError::invalid_record(format!("invalid id '{raw_id}'")))?;

        Ok(Self {
            id,
            name: optional(fields::NAME),
            description: optional(fields::DESCRIPTION),
            street_address: optional(fields::STREET_ADDRESS),
            path: HierarchyPath {
                country: required(fields::COUNTRY)?,
                state: required(fields::STATE)?,
                city: required(fields::CITY)?,
                area: required(fields::AREA)?,
            },
        })
    }
}
