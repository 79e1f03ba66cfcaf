//! Partial updates.
//!
//! [`FieldPatch`] is the narrow in-place patch accepted by the cache: only
//! descriptive fields, never hierarchy. [`LocationPatch`] is the wider update
//! accepted by the backing store, which may also move a record in the
//! hierarchy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::record::{HierarchyLevel, LocationRecord, fields, validate_segment};

/// A non-empty set of descriptive field updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPatch {
    fields: BTreeMap<&'static str, String>,
}

impl FieldPatch {
    /// Validate raw field/value pairs against the patchable allow-list.
    pub fn new<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut accepted = BTreeMap::new();
        let mut rejected = Vec::new();
        for (name, value) in pairs {
            let name = name.as_ref();
            match fields::PATCHABLE.iter().find(|allowed| **allowed == name) {
                Some(allowed) => {
                    accepted.insert(*allowed, value.into());
                }
                None => rejected.push(name.to_string()),
            }
        }

        if !rejected.is_empty() {
            rejected.sort();
            rejected.dedup();
            return Err(CoreError::DisallowedFields { fields: rejected });
        }
        if accepted.is_empty() {
            return Err(CoreError::EmptyPatch);
        }
        Ok(Self { fields: accepted })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn apply_to(&self, record: &mut LocationRecord) {
        for (name, value) in self.iter() {
            match name {
                fields::NAME => record.name = value.to_string(),
                fields::DESCRIPTION => record.description = value.to_string(),
                fields::STREET_ADDRESS => record.street_address = value.to_string(),
                _ => {}
            }
        }
    }
}

/// An update request against the backing store.
///
/// Absent fields are left untouched. Empty hierarchy values are treated as
/// absent, the same as omitting them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "streetaddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

impl LocationPatch {
    /// Drop empty hierarchy values.
    pub fn normalized(mut self) -> Self {
        for slot in [
            &mut self.country,
            &mut self.state,
            &mut self.city,
            &mut self.area,
        ] {
            if slot.as_deref() == Some("") {
                *slot = None;
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.street_address.is_none()
            && !self.touches_hierarchy()
    }

    pub fn touches_hierarchy(&self) -> bool {
        self.hierarchy().iter().any(|(_, v)| v.is_some())
    }

    fn hierarchy(&self) -> [(HierarchyLevel, Option<&str>); 4] {
        [
            (HierarchyLevel::Country, self.country.as_deref()),
            (HierarchyLevel::State, self.state.as_deref()),
            (HierarchyLevel::City, self.city.as_deref()),
            (HierarchyLevel::Area, self.area.as_deref()),
        ]
    }

    /// Reject empty patches and hierarchy values unfit for cache keys.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyPatch);
        }
        for (level, value) in self.hierarchy() {
            if let Some(value) = value {
                validate_segment(level, value)?;
            }
        }
        Ok(())
    }

    /// The descriptive part of this patch, if it has one.
    pub fn field_patch(&self) -> Option<FieldPatch> {
        let pairs = [
            (fields::NAME, self.name.as_ref()),
            (fields::DESCRIPTION, self.description.as_ref()),
            (fields::STREET_ADDRESS, self.street_address.as_ref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v.clone())));
        FieldPatch::new(pairs).ok()
    }

    pub fn apply_to(&self, record: &mut LocationRecord) {
        if let Some(patch) = self.field_patch() {
            patch.apply_to(record);
        }
        if let Some(country) = &self.country {
            record.path.country = country.clone();
        }
        if let Some(state) = &self.state {
            record.path.state = state.clone();
        }
        if let Some(city) = &self.city {
            record.path.city = city.clone();
        }
        if let Some(area) = &self.area {
            record.path.area = area.clone();
        }
    }
}
