//! # Equide: Trotter Pedigrees and Race Statistics
//!
//! Equide serves pedigree and race data for French trotters over HTTP. Two tables answer most
//! questions:
//!
//! - **Canonical pedigrees**: one row per registered horse with birth year, breeder, parents
//!   and a reference link
//! - **Race participations**: one row per start, copied from race programmes, carrying the
//!   horse's breed and its parents' names as free text
//!
//! The interesting part is genealogy resolution: starting from a name, the ancestry tree is
//! rebuilt by following parent names across both tables, bounded by a caller-supplied depth and
//! optionally filtered by a birth-year plausibility window. See [`genealogy`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HTTP API Layer (Axum routes)            │
//! ├─────────────────────────────────────────┤
//! │ Genealogy resolver / race statistics    │
//! ├─────────────────────────────────────────┤
//! │ Scoped record handles (HorseRecords)    │
//! ├─────────────────────────────────────────┤
//! │ PostgreSQL (sqlx) or in-memory tables   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! # use equide::*;
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = InMemoryHorseStore::new();
//! store.insert_pedigree(PedigreeRecord {
//!     id: 1,
//!     name: "BOLD EAGLE".to_string(),
//!     sex: Some("M".to_string()),
//!     color: Some("BAI".to_string()),
//!     birth_year: Some(2011),
//!     father: Some("READY CASH".to_string()),
//!     mother: Some("FLOWER OF BLOOD".to_string()),
//!     death_date: None,
//!     breeder: None,
//!     reference_link: None,
//! }).unwrap();
//!
//! let identity = HorseIdentity::new(HorseName::new("bold eagle").unwrap());
//! let request = GenealogyRequest::new(identity).with_depth(Depth::new(2).unwrap());
//! let tree = resolve_genealogy(&store, &request).await.unwrap();
//!
//! assert_eq!(tree.source, RecordSource::Canonical);
//! assert_eq!(tree.father_name.as_deref(), Some("READY CASH"));
//! // Neither parent is recorded, so the tree stops at the root.
//! assert!(tree.father.is_none());
//! # });
//! ```

mod data_store;
mod errors;
mod horse;

/// Ancestry resolution across the canonical and participation tables.
pub mod genealogy;

/// Race statistics and availability summaries.
pub mod stats;

/// Tracing subscriber setup shared by the binaries.
pub mod logging;

/// PostgreSQL persistence, one module per table.
pub mod sql;

/// Command-line interface utilities for program termination and output formatting.
pub mod cli_utils;

/// Command-line interface command handlers for equidectl.
pub mod commands;

/// HTTP client for interacting with a running equided.
pub mod http_utils;

pub use data_store::{HorseRecords, HorseStore, InMemoryHorseStore};
pub use errors::DataStoreError;
pub use genealogy::{
    DEFAULT_DEPTH, DEFAULT_EXPECTED_BREED, Depth, DepthError, GenealogyError, GenealogyNode,
    GenealogyQuery, GenealogyRequest, GenealogyResponse, MAX_DEPTH, ModeParseError, RecordSource,
    ResolutionMode, create_genealogy_router, resolve_genealogy, resolve_with,
};
pub use horse::{
    HorseIdentity, HorseName, HorseNameError, ParticipationRecord, PedigreeRecord, Race,
    RaceResult, create_horse_router,
};
pub use sql::{PgHorseStore, PgStoreOptions};
pub use stats::{
    Availability, Placings, RaceStats, StatsError, create_stats_router, parse_finish_time,
};
