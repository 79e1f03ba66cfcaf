//! PostgreSQL implementation of the `LocationStore` trait.
//!
//! Hierarchy names live in four lookup tables (`country`, `state`, `city`,
//! `area`); `location` rows reference them by id. Writes get-or-create the
//! lookup rows inside the same transaction as the location row.

use async_trait::async_trait;
use geocache_core::{
    HierarchyLevel, HierarchyPath, LocationFilter, LocationId, LocationPatch, LocationRecord,
    NewLocation,
};
use geocache_storage::{LocationStore, StorageError, UpdateOutcome};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, instrument};

use crate::config::PostgresConfig;
use crate::error::Result;
use crate::{migrations, pool};

type PgTransaction = sqlx_core::transaction::Transaction<'static, Postgres>;

type LocationRow = (i64, String, String, String, String, String, String, String);

const SELECT_LOCATIONS: &str = r#"
    SELECT l.id, l.name, l.description, l.streetaddress,
           country.name, state.name, city.name, area.name
    FROM location l
    JOIN country ON country.id = l.country_id
    JOIN state ON state.id = l.state_id
    JOIN city ON city.id = l.city_id
    JOIN area ON area.id = l.area_id
"#;

fn lookup_table(level: HierarchyLevel) -> &'static str {
    match level {
        HierarchyLevel::Country => "country",
        HierarchyLevel::State => "state",
        HierarchyLevel::City => "city",
        HierarchyLevel::Area => "area",
    }
}

fn into_record(row: LocationRow) -> LocationRecord {
    let (id, name, description, street_address, country, state, city, area) = row;
    LocationRecord {
        id,
        name,
        description,
        street_address,
        path: HierarchyPath::new(country, state, city, area),
    }
}

/// Returns the id of `name` in the lookup table for `level`, creating the
/// row if needed.
async fn get_or_create_lookup(
    tx: &mut PgTransaction,
    level: HierarchyLevel,
    name: &str,
) -> Result<i32> {
    let table = lookup_table(level);
    let sql = format!(
        "INSERT INTO {table} (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id"
    );
    let id: i32 = query_scalar(&sql).bind(name).fetch_one(&mut **tx).await?;
    Ok(id)
}

async fn optional_lookup(
    tx: &mut PgTransaction,
    level: HierarchyLevel,
    name: Option<&str>,
) -> Result<Option<i32>> {
    match name {
        Some(name) => get_or_create_lookup(tx, level, name).await.map(Some),
        None => Ok(None),
    }
}

/// PostgreSQL backing store for locations.
#[derive(Debug, Clone)]
pub struct PostgresLocationStore {
    pool: PgPool,
}

impl PostgresLocationStore {
    /// Creates a pool and, if configured, runs migrations.
    pub async fn new(config: &PostgresConfig) -> std::result::Result<Self, StorageError> {
        let pool = pool::create_pool(config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Wraps an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert(&self, location: &NewLocation) -> Result<LocationRecord> {
        let mut tx = self.pool.begin().await?;
        let path = &location.path;

        let country_id = get_or_create_lookup(&mut tx, HierarchyLevel::Country, &path.country).await?;
        let state_id = get_or_create_lookup(&mut tx, HierarchyLevel::State, &path.state).await?;
        let city_id = get_or_create_lookup(&mut tx, HierarchyLevel::City, &path.city).await?;
        let area_id = get_or_create_lookup(&mut tx, HierarchyLevel::Area, &path.area).await?;

        let id: i64 = query_scalar(
            r#"INSERT INTO location
                   (name, description, streetaddress, country_id, state_id, city_id, area_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(&location.name)
        .bind(&location.description)
        .bind(&location.street_address)
        .bind(country_id)
        .bind(state_id)
        .bind(city_id)
        .bind(area_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(location.clone().into_record(id))
    }

    async fn select_one(&self, id: LocationId) -> Result<Option<LocationRecord>> {
        let sql = format!("{SELECT_LOCATIONS} WHERE l.id = $1");
        let row: Option<LocationRow> = query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(into_record))
    }

    async fn select_many(&self, filter: &LocationFilter) -> Result<Vec<LocationRecord>> {
        let rows: Vec<LocationRow> = match (filter.level(), filter.value()) {
            (Some(level), Some(value)) => {
                let sql = format!(
                    "{SELECT_LOCATIONS} WHERE {}.name = $1 ORDER BY l.id",
                    lookup_table(level)
                );
                query_as(&sql).bind(value).fetch_all(&self.pool).await?
            }
            _ => {
                let sql = format!("{SELECT_LOCATIONS} ORDER BY l.id");
                query_as(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(rows.into_iter().map(into_record).collect())
    }

    async fn update(&self, id: LocationId, patch: &LocationPatch) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let country_id = optional_lookup(&mut tx, HierarchyLevel::Country, patch.country.as_deref()).await?;
        let state_id = optional_lookup(&mut tx, HierarchyLevel::State, patch.state.as_deref()).await?;
        let city_id = optional_lookup(&mut tx, HierarchyLevel::City, patch.city.as_deref()).await?;
        let area_id = optional_lookup(&mut tx, HierarchyLevel::Area, patch.area.as_deref()).await?;

        let result = query(
            r#"UPDATE location SET
                   name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   streetaddress = COALESCE($4, streetaddress),
                   country_id = COALESCE($5, country_id),
                   state_id = COALESCE($6, state_id),
                   city_id = COALESCE($7, city_id),
                   area_id = COALESCE($8, area_id),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.street_address.as_deref())
        .bind(country_id)
        .bind(state_id)
        .bind(city_id)
        .bind(area_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back any lookup rows created above.
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, id: LocationId) -> Result<bool> {
        let result = query("DELETE FROM location WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Readiness check.
    pub async fn ping(&self) -> std::result::Result<(), StorageError> {
        pool::test_connection(&self.pool)
            .await
            .map_err(StorageError::from)
    }
}

#[async_trait]
impl LocationStore for PostgresLocationStore {
    #[instrument(skip_all)]
    async fn insert_record(
        &self,
        location: &NewLocation,
    ) -> std::result::Result<LocationRecord, StorageError> {
        location.validate()?;
        let record = self.insert(location).await?;
        debug!(id = record.id, "location inserted");
        Ok(record)
    }

    async fn get_record(
        &self,
        id: LocationId,
    ) -> std::result::Result<Option<LocationRecord>, StorageError> {
        Ok(self.select_one(id).await?)
    }

    #[instrument(skip(self), fields(filter = %filter))]
    async fn query_records(
        &self,
        filter: &LocationFilter,
    ) -> std::result::Result<Vec<LocationRecord>, StorageError> {
        filter.validate()?;
        let records = self.select_many(filter).await?;
        debug!(count = records.len(), "locations queried");
        Ok(records)
    }

    #[instrument(skip(self, patch))]
    async fn update_record(
        &self,
        id: LocationId,
        patch: &LocationPatch,
    ) -> std::result::Result<Option<UpdateOutcome>, StorageError> {
        let applied = patch.clone().normalized();
        applied.validate()?;

        if !self.update(id, &applied).await? {
            return Ok(None);
        }
        debug!("location updated");
        Ok(Some(UpdateOutcome { id, applied }))
    }

    #[instrument(skip(self))]
    async fn delete_record(&self, id: LocationId) -> std::result::Result<bool, StorageError> {
        let deleted = self.delete(id).await?;
        debug!(deleted, "location delete");
        Ok(deleted)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

