use std::fmt;

use crate::error::Result;
use crate::record::{HierarchyLevel, validate_segment};

/// A hierarchical query: everything, or everything under one named level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LocationFilter {
    #[default]
    All,
    Country(String),
    State(String),
    City(String),
    Area(String),
}

impl LocationFilter {
    /// Build a filter from optional query parameters.
    ///
    /// Only one level is used; when several are present the precedence is
    /// country, state, city, area.
    pub fn from_params(
        country: Option<String>,
        state: Option<String>,
        city: Option<String>,
        area: Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        if let Some(country) = non_empty(country) {
            Self::Country(country)
        } else if let Some(state) = non_empty(state) {
            Self::State(state)
        } else if let Some(city) = non_empty(city) {
            Self::City(city)
        } else if let Some(area) = non_empty(area) {
            Self::Area(area)
        } else {
            Self::All
        }
    }

    /// The hierarchy level filtered on, if any.
    pub fn level(&self) -> Option<HierarchyLevel> {
        match self {
            Self::All => None,
            Self::Country(_) => Some(HierarchyLevel::Country),
            Self::State(_) => Some(HierarchyLevel::State),
            Self::City(_) => Some(HierarchyLevel::City),
            Self::Area(_) => Some(HierarchyLevel::Area),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Country(v) | Self::State(v) | Self::City(v) | Self::Area(v) => Some(v),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        self.level().map_or("all", |level| level.as_str())
    }

    /// Filter values go into cache keys, so they obey the same rules as
    /// stored hierarchy values.
    pub fn validate(&self) -> Result<()> {
        match (self.level(), self.value()) {
            (Some(level), Some(value)) => validate_segment(level, value),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for LocationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.level(), self.value()) {
            (Some(level), Some(value)) => write!(f, "{level}={value}"),
            _ => f.write_str("all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_precedence() {
        let filter = LocationFilter::from_params(
            None,
            Some("MH".into()),
            Some("Pune".into()),
            Some("Kothrud".into()),
        );
        assert_eq!(filter, LocationFilter::State("MH".into()));

        let filter = LocationFilter::from_params(Some("IN".into()), Some("MH".into()), None, None);
        assert_eq!(filter, LocationFilter::Country("IN".into()));
    }

    #[test]
    fn test_empty_params_mean_all() {
        let filter = LocationFilter::from_params(Some(String::new()), None, None, None);
        assert_eq!(filter, LocationFilter::All);
        assert_eq!(filter.kind(), "all");
        assert_eq!(filter.to_string(), "all");
    }

    #[test]
    fn test_display() {
        assert_eq!(LocationFilter::Area("Kothrud".into()).to_string(), "area=Kothrud");
    }

    #[test]
    fn test_validate() {
        assert!(LocationFilter::City("Pune".into()).validate().is_ok());
        assert!(LocationFilter::Country("IN:MH".into()).validate().is_err());
        assert_eq!(
            LocationFilter::Country("ALL".into()).validate(),
            Err(CoreError::ReservedName("ALL".into()))
        );
        assert!(LocationFilter::All.validate().is_ok());
    }
}
