//! # Horse Record Storage
//!
//! This module defines the read-only storage abstraction that the genealogy resolver and the
//! statistics endpoints consume. Storage is split in two traits:
//!
//! - [`HorseStore`] hands out a scoped handle for one request via [`HorseStore::open`].
//! - [`HorseRecords`] is that handle: the lookups over the canonical pedigree table and the
//!   race participation table.
//!
//! Dropping the handle releases whatever the backend acquired for it (for PostgreSQL, a pooled
//! connection), so every exit path of a request gives its connection back.
//!
//! ## Implementations
//!
//! - **InMemoryHorseStore**: `RwLock`-protected tables, used by tests and the daemon's
//!   `--in-memory` mode
//! - **PgHorseStore**: PostgreSQL through sqlx, see [`crate::sql`]
//!
//! ## Usage
//!
//! ```rust
//! # use equide::{HorseName, HorseRecords, HorseStore, InMemoryHorseStore, PedigreeRecord};
//! # tokio_test_block_on(async {
//! let store = InMemoryHorseStore::new();
//! store.insert_pedigree(PedigreeRecord {
//!     id: 1,
//!     name: "OURASI".to_string(),
//!     sex: Some("M".to_string()),
//!     color: Some("ALEZAN".to_string()),
//!     birth_year: Some(1980),
//!     father: Some("GREYHOUND".to_string()),
//!     mother: Some("FLORESTAN".to_string()),
//!     death_date: None,
//!     breeder: None,
//!     reference_link: None,
//! }).unwrap();
//!
//! let records = store.open().await.unwrap();
//! let name = HorseName::new("ourasi").unwrap();
//! let found = records.find_pedigree_by_name(&name).await.unwrap();
//! assert_eq!(found.map(|r| r.id), Some(1));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::async_trait;

use crate::{
    DataStoreError, HorseName, ParticipationRecord, PedigreeRecord, Race, RaceResult,
};

/// Read access to the horse tables for the duration of one request.
///
/// Every lookup takes an already-normalized [`HorseName`]; implementations compare names
/// exactly.
#[async_trait]
pub trait HorseRecords: Send + Sync {
    /// Canonical record with this name.
    ///
    /// # Returns
    /// * `Ok(Some(PedigreeRecord))` - The lowest-id record carrying the name
    /// * `Ok(None)` - No canonical record has this name
    async fn find_pedigree_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Option<PedigreeRecord>, DataStoreError>;

    /// Canonical record with this name and this id.
    async fn find_pedigree_by_name_and_id(
        &self,
        name: &HorseName,
        id: i32,
    ) -> Result<Option<PedigreeRecord>, DataStoreError>;

    /// Canonical record with this name whose birth year lies in `[min_year, max_year]`.
    ///
    /// Records without a birth year never match.
    async fn find_pedigree_by_name_and_age_window(
        &self,
        name: &HorseName,
        min_year: i32,
        max_year: i32,
    ) -> Result<Option<PedigreeRecord>, DataStoreError>;

    /// Canonical record by primary key.
    async fn find_pedigree_by_id(&self, id: i32) -> Result<Option<PedigreeRecord>, DataStoreError>;

    /// The participation with the highest participation id for this name.
    async fn find_latest_participation_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Option<ParticipationRecord>, DataStoreError>;

    /// Number of participations stored for this name.
    async fn count_participations_by_name(&self, name: &HorseName) -> Result<i64, DataStoreError>;

    /// Every participation for this name joined with its race, ordered by participation id.
    async fn list_race_results_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Vec<RaceResult>, DataStoreError>;
}

/// A source of scoped [`HorseRecords`] handles.
#[async_trait]
pub trait HorseStore: Send + Sync {
    /// Acquires a handle; the backing resources are released when it is dropped.
    async fn open(&self) -> Result<Box<dyn HorseRecords>, DataStoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    pedigrees: Vec<PedigreeRecord>,
    participations: Vec<ParticipationRecord>,
    races: HashMap<i32, Race>,
}

/// Thread-safe in-memory implementation of [`HorseStore`] and [`HorseRecords`].
///
/// Clones share the same tables, so a handle returned by [`HorseStore::open`] sees rows inserted
/// through the original.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHorseStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryHorseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, DataStoreError> {
        self.tables
            .read()
            .map_err(|_| DataStoreError::Internal("horse tables lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, DataStoreError> {
        self.tables
            .write()
            .map_err(|_| DataStoreError::Internal("horse tables lock poisoned".to_string()))
    }

    /// Adds a canonical pedigree row; the name is stored normalized.
    pub fn insert_pedigree(&self, mut record: PedigreeRecord) -> Result<(), DataStoreError> {
        record.name = record.name.trim().to_uppercase();
        self.write()?.pedigrees.push(record);
        Ok(())
    }

    /// Adds a participation row; the name is stored normalized.
    pub fn insert_participation(
        &self,
        mut record: ParticipationRecord,
    ) -> Result<(), DataStoreError> {
        record.name = record.name.trim().to_uppercase();
        self.write()?.participations.push(record);
        Ok(())
    }

    pub fn insert_race(&self, race: Race) -> Result<(), DataStoreError> {
        self.write()?.races.insert(race.id, race);
        Ok(())
    }

    fn first_pedigree<F>(&self, predicate: F) -> Result<Option<PedigreeRecord>, DataStoreError>
    where
        F: Fn(&PedigreeRecord) -> bool,
    {
        let tables = self.read()?;
        Ok(tables
            .pedigrees
            .iter()
            .filter(|record| predicate(record))
            .min_by_key(|record| record.id)
            .cloned())
    }
}

#[async_trait]
impl HorseRecords for InMemoryHorseStore {
    async fn find_pedigree_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Option<PedigreeRecord>, DataStoreError> {
        self.first_pedigree(|record| record.name == name.as_str())
    }

    async fn find_pedigree_by_name_and_id(
        &self,
        name: &HorseName,
        id: i32,
    ) -> Result<Option<PedigreeRecord>, DataStoreError> {
        self.first_pedigree(|record| record.name == name.as_str() && record.id == id)
    }

    async fn find_pedigree_by_name_and_age_window(
        &self,
        name: &HorseName,
        min_year: i32,
        max_year: i32,
    ) -> Result<Option<PedigreeRecord>, DataStoreError> {
        self.first_pedigree(|record| {
            record.name == name.as_str()
                && record
                    .birth_year
                    .is_some_and(|year| (min_year..=max_year).contains(&year))
        })
    }

    async fn find_pedigree_by_id(&self, id: i32) -> Result<Option<PedigreeRecord>, DataStoreError> {
        self.first_pedigree(|record| record.id == id)
    }

    async fn find_latest_participation_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Option<ParticipationRecord>, DataStoreError> {
        let tables = self.read()?;
        Ok(tables
            .participations
            .iter()
            .filter(|record| record.name == name.as_str())
            .max_by_key(|record| record.participation_id)
            .cloned())
    }

    async fn count_participations_by_name(&self, name: &HorseName) -> Result<i64, DataStoreError> {
        let tables = self.read()?;
        let count = tables
            .participations
            .iter()
            .filter(|record| record.name == name.as_str())
            .count();
        Ok(count as i64)
    }

    async fn list_race_results_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Vec<RaceResult>, DataStoreError> {
        let tables = self.read()?;
        let mut results: Vec<RaceResult> = tables
            .participations
            .iter()
            .filter(|record| record.name == name.as_str())
            .filter_map(|record| {
                tables
                    .races
                    .get(&record.race_id)
                    .map(|race| RaceResult::join(record, race))
            })
            .collect();
        results.sort_by_key(|result| result.participation_id);
        Ok(results)
    }
}

#[async_trait]
impl HorseStore for InMemoryHorseStore {
    async fn open(&self) -> Result<Box<dyn HorseRecords>, DataStoreError> {
        Ok(Box::new(self.clone()))
    }
}
