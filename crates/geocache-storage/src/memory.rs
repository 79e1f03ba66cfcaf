//! In-memory backing store with normalized hierarchy lookup tables.
//!
//! Mirrors the relational layout: one lookup table per hierarchy level and a
//! location table holding foreign keys into them. Useful for tests and for
//! running the server without PostgreSQL.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use geocache_core::{
    HierarchyLevel, HierarchyPath, LocationFilter, LocationId, LocationPatch, LocationRecord,
    NewLocation,
};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::traits::{LocationStore, UpdateOutcome};

type LookupId = u32;

/// Name ↔ id table for one hierarchy level.
#[derive(Debug, Default)]
struct LookupTable {
    by_name: HashMap<String, LookupId>,
    names: Vec<String>,
}

impl LookupTable {
    fn get_or_create(&mut self, name: &str) -> LookupId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = self.names.len() as LookupId;
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn find(&self, name: &str) -> Option<LookupId> {
        self.by_name.get(name).copied()
    }

    fn name(&self, id: LookupId) -> &str {
        self.names
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct LocationRow {
    name: String,
    description: String,
    street_address: String,
    country_id: LookupId,
    state_id: LookupId,
    city_id: LookupId,
    area_id: LookupId,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: LocationId,
    countries: LookupTable,
    states: LookupTable,
    cities: LookupTable,
    areas: LookupTable,
    locations: BTreeMap<LocationId, LocationRow>,
}

impl Tables {
    fn resolve(&self, id: LocationId, row: &LocationRow) -> LocationRecord {
        LocationRecord {
            id,
            name: row.name.clone(),
            description: row.description.clone(),
            street_address: row.street_address.clone(),
            path: HierarchyPath::new(
                self.countries.name(row.country_id),
                self.states.name(row.state_id),
                self.cities.name(row.city_id),
                self.areas.name(row.area_id),
            ),
        }
    }

    fn table(&self, level: HierarchyLevel) -> &LookupTable {
        match level {
            HierarchyLevel::Country => &self.countries,
            HierarchyLevel::State => &self.states,
            HierarchyLevel::City => &self.cities,
            HierarchyLevel::Area => &self.areas,
        }
    }

    fn matches(row: &LocationRow, level: HierarchyLevel, lookup: LookupId) -> bool {
        match level {
            HierarchyLevel::Country => row.country_id == lookup,
            HierarchyLevel::State => row.state_id == lookup,
            HierarchyLevel::City => row.city_id == lookup,
            HierarchyLevel::Area => row.area_id == lookup,
        }
    }
}

/// In-memory `LocationStore`.
#[derive(Debug, Default)]
pub struct InMemoryLocationStore {
    tables: RwLock<Tables>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Number of stored locations.
    pub async fn len(&self) -> usize {
        self.tables.read().await.locations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn insert_record(&self, location: &NewLocation) -> Result<LocationRecord, StorageError> {
        location.validate()?;

        let mut tables = self.tables.write().await;
        let row = LocationRow {
            name: location.name.clone(),
            description: location.description.clone(),
            street_address: location.street_address.clone(),
            country_id: tables.countries.get_or_create(&location.path.country),
            state_id: tables.states.get_or_create(&location.path.state),
            city_id: tables.cities.get_or_create(&location.path.city),
            area_id: tables.areas.get_or_create(&location.path.area),
        };

        let id = tables.next_id.max(1);
        tables.next_id = id + 1;
        let record = tables.resolve(id, &row);
        tables.locations.insert(id, row);

        tracing::debug!(id, "location inserted");
        Ok(record)
    }

    async fn get_record(&self, id: LocationId) -> Result<Option<LocationRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.locations.get(&id).map(|row| tables.resolve(id, row)))
    }

    async fn query_records(
        &self,
        filter: &LocationFilter,
    ) -> Result<Vec<LocationRecord>, StorageError> {
        let tables = self.tables.read().await;

        let (level, value) = match (filter.level(), filter.value()) {
            (Some(level), Some(value)) => (level, value),
            _ => {
                return Ok(tables
                    .locations
                    .iter()
                    .map(|(id, row)| tables.resolve(*id, row))
                    .collect());
            }
        };

        let Some(lookup) = tables.table(level).find(value) else {
            return Ok(Vec::new());
        };

        Ok(tables
            .locations
            .iter()
            .filter(|(_, row)| Tables::matches(row, level, lookup))
            .map(|(id, row)| tables.resolve(*id, row))
            .collect())
    }

    async fn update_record(
        &self,
        id: LocationId,
        patch: &LocationPatch,
    ) -> Result<Option<UpdateOutcome>, StorageError> {
        let applied = patch.clone().normalized();
        applied.validate()?;

        let mut tables = self.tables.write().await;
        if !tables.locations.contains_key(&id) {
            return Ok(None);
        }

        let country_id = applied
            .country
            .as_deref()
            .map(|v| tables.countries.get_or_create(v));
        let state_id = applied
            .state
            .as_deref()
            .map(|v| tables.states.get_or_create(v));
        let city_id = applied
            .city
            .as_deref()
            .map(|v| tables.cities.get_or_create(v));
        let area_id = applied
            .area
            .as_deref()
            .map(|v| tables.areas.get_or_create(v));

        let Some(row) = tables.locations.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &applied.name {
            row.name = name.clone();
        }
        if let Some(description) = &applied.description {
            row.description = description.clone();
        }
        if let Some(street_address) = &applied.street_address {
            row.street_address = street_address.clone();
        }
        row.country_id = country_id.unwrap_or(row.country_id);
        row.state_id = state_id.unwrap_or(row.state_id);
        row.city_id = city_id.unwrap_or(row.city_id);
        row.area_id = area_id.unwrap_or(row.area_id);

        tracing::debug!(id, hierarchy = applied.touches_hierarchy(), "location updated");
        Ok(Some(UpdateOutcome { id, applied }))
    }

    async fn delete_record(&self, id: LocationId) -> Result<bool, StorageError> {
        let removed = self.tables.write().await.locations.remove(&id).is_some();
        tracing::debug!(id, removed, "location delete");
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotel(name: &str, country: &str, state: &str, city: &str, area: &str) -> NewLocation {
        NewLocation {
            name: name.into(),
            description: format!("{name} description"),
            street_address: format!("{name} street"),
            path: HierarchyPath::new(country, state, city, area),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryLocationStore::new();
        let a = store
            .insert_record(&hotel("A", "IN", "MH", "Pune", "Kothrud"))
            .await
            .unwrap();
        let b = store
            .insert_record(&hotel("B", "IN", "MH", "Pune", "Baner"))
            .await
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(b.path.area, "Baner");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_lookup_rows_are_shared() {
        let store = InMemoryLocationStore::new();
        store
            .insert_record(&hotel("A", "IN", "MH", "Pune", "Kothrud"))
            .await
            .unwrap();
        store
            .insert_record(&hotel("B", "IN", "KA", "Bengaluru", "Indiranagar"))
            .await
            .unwrap();
        let tables = store.tables.read().await;
        assert_eq!(tables.countries.names, vec!["IN".to_string()]);
        assert_eq!(tables.states.names.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_hierarchy() {
        let store = InMemoryLocationStore::new();
        let err = store
            .insert_record(&hotel("A", "IN", "MH", "Pune:East", "Kothrud"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Invalid(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_query_by_each_level() {
        let store = InMemoryLocationStore::new();
        store
            .insert_record(&hotel("A", "IN", "MH", "Pune", "Kothrud"))
            .await
            .unwrap();
        store
            .insert_record(&hotel("B", "IN", "MH", "Mumbai", "Bandra"))
            .await
            .unwrap();
        store
            .insert_record(&hotel("C", "FR", "IDF", "Paris", "Marais"))
            .await
            .unwrap();

        for (filter, expected) in [
            (LocationFilter::All, 3),
            (LocationFilter::Country("IN".into()), 2),
            (LocationFilter::State("IDF".into()), 1),
            (LocationFilter::City("Pune".into()), 1),
            (LocationFilter::Area("Bandra".into()), 1),
            (LocationFilter::Area("Nowhere".into()), 0),
        ] {
            let found = store.query_records(&filter).await.unwrap();
            assert_eq!(found.len(), expected, "filter {filter}");
        }
    }

    #[tokio::test]
    async fn test_update_reports_applied_fields() {
        let store = InMemoryLocationStore::new();
        let a = store
            .insert_record(&hotel("A", "IN", "MH", "Pune", "Kothrud"))
            .await
            .unwrap();

        let patch = LocationPatch {
            name: Some("A2".into()),
            city: Some("Mumbai".into()),
            area: Some(String::new()),
            ..Default::default()
        };
        let outcome = store.update_record(a.id, &patch).await.unwrap().unwrap();
        assert_eq!(outcome.id, a.id);
        assert_eq!(outcome.applied.area, None);
        assert!(outcome.applied.touches_hierarchy());

        let updated = store.get_record(a.id).await.unwrap().unwrap();
        assert_eq!(updated.name, "A2");
        assert_eq!(updated.path, HierarchyPath::new("IN", "MH", "Mumbai", "Kothrud"));
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let store = InMemoryLocationStore::new();
        let patch = LocationPatch {
            name: Some("X".into()),
            ..Default::default()
        };
        assert!(store.update_record(99, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryLocationStore::new();
        let a = store
            .insert_record(&hotel("A", "IN", "MH", "Pune", "Kothrud"))
            .await
            .unwrap();
        assert!(store.delete_record(a.id).await.unwrap());
        assert!(!store.delete_record(a.id).await.unwrap());
        assert!(store.get_record(a.id).await.unwrap().is_none());
    }
}
