//! PostgreSQL database operations for equide.
//!
//! This module provides functions for reading the horse tables of the PostgreSQL database,
//! organized by table, and [`PgHorseStore`], the [`HorseStore`] implementation built on them.

use std::time::Duration;

use axum::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{
    DataStoreError, HorseName, HorseRecords, HorseStore, ParticipationRecord, PedigreeRecord,
    RaceResult,
};

/// Canonical pedigree table operations.
pub mod pedigree;

/// Race participation table operations.
pub mod participation;

/// Race, meeting and programme operations.
pub mod race;

/// Result type for database operations.
pub type SqlResult<T> = Result<T, DataStoreError>;

/// Connection settings for [`PgHorseStore::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgStoreOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PgStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// [`HorseStore`] backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgHorseStore {
    pool: PgPool,
}

impl PgHorseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, options: &PgStoreOptions) -> SqlResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to connect to database");
                DataStoreError::from(e)
            })?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HorseStore for PgHorseStore {
    async fn open(&self) -> Result<Box<dyn HorseRecords>, DataStoreError> {
        let conn = self.pool.acquire().await?;
        debug!("acquired database connection");
        Ok(Box::new(PgHorseSession {
            conn: Mutex::new(conn),
        }))
    }
}

/// One pooled connection held for a request. Dropping the session returns it to the pool.
pub struct PgHorseSession {
    conn: Mutex<PoolConnection<Postgres>>,
}

#[async_trait]
impl HorseRecords for PgHorseSession {
    async fn find_pedigree_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Option<PedigreeRecord>, DataStoreError> {
        let mut conn = self.conn.lock().await;
        pedigree::find_by_name(&mut conn, name).await
    }

    async fn find_pedigree_by_name_and_id(
        &self,
        name: &HorseName,
        id: i32,
    ) -> Result<Option<PedigreeRecord>, DataStoreError> {
        let mut conn = self.conn.lock().await;
        pedigree::find_by_name_and_id(&mut conn, name, id).await
    }

    async fn find_pedigree_by_name_and_age_window(
        &self,
        name: &HorseName,
        min_year: i32,
        max_year: i32,
    ) -> Result<Option<PedigreeRecord>, DataStoreError> {
        let mut conn = self.conn.lock().await;
        pedigree::find_by_name_and_age_window(&mut conn, name, min_year, max_year).await
    }

    async fn find_pedigree_by_id(&self, id: i32) -> Result<Option<PedigreeRecord>, DataStoreError> {
        let mut conn = self.conn.lock().await;
        pedigree::find_by_id(&mut conn, id).await
    }

    async fn find_latest_participation_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Option<ParticipationRecord>, DataStoreError> {
        let mut conn = self.conn.lock().await;
        participation::find_latest_by_name(&mut conn, name).await
    }

    async fn count_participations_by_name(&self, name: &HorseName) -> Result<i64, DataStoreError> {
        let mut conn = self.conn.lock().await;
        participation::count_by_name(&mut conn, name).await
    }

    async fn list_race_results_by_name(
        &self,
        name: &HorseName,
    ) -> Result<Vec<RaceResult>, DataStoreError> {
        let mut conn = self.conn.lock().await;
        participation::list_results_by_name(&mut conn, name).await
    }
}
