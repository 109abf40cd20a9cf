use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::HorseStore;

///////////////////////////////////////////// HorseName /////////////////////////////////////////////

/// A horse name canonicalized for lookups: trimmed and uppercased.
///
/// Both record sources store names in uppercase, so two inputs that differ only in case or
/// surrounding whitespace address the same horse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HorseName(String);

impl HorseName {
    pub fn new(raw: &str) -> Result<Self, HorseNameError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HorseNameError::Empty);
        }
        Ok(HorseName(trimmed.to_uppercase()))
    }

    /// Normalizes a free-text parent reference; blank or missing references yield `None`.
    pub fn from_reference(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|raw| HorseName::new(raw).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for HorseName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl FromStr for HorseName {
    type Err = HorseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HorseName::new(s)
    }
}

impl TryFrom<String> for HorseName {
    type Error = HorseNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HorseName::new(&value)
    }
}

impl From<HorseName> for String {
    fn from(name: HorseName) -> Self {
        name.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HorseNameError {
    #[error("horse name must not be empty")]
    Empty,
}

/////////////////////////////////////////// HorseIdentity ////////////////////////////////////////////

/// The horse named by a request: its normalized name plus an optional pedigree id that
/// disambiguates between canonical records sharing the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HorseIdentity {
    pub name: HorseName,
    pub id: Option<i32>,
}

impl HorseIdentity {
    pub fn new(name: HorseName) -> Self {
        Self { name, id: None }
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }
}

impl Display for HorseIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.id {
            Some(id) => write!(f, "{} (#{})", self.name, id),
            None => write!(f, "{}", self.name),
        }
    }
}

////////////////////////////////////////////// Records ///////////////////////////////////////////////

/// A row of the canonical pedigree table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PedigreeRecord {
    pub id: i32,
    pub name: String,
    pub sex: Option<String>,
    pub color: Option<String>,
    pub birth_year: Option<i32>,
    pub father: Option<String>,
    pub mother: Option<String>,
    pub death_date: Option<NaiveDate>,
    pub breeder: Option<String>,
    pub reference_link: Option<String>,
}

/// A row of the race participation table, reduced to the fields equide reads.
///
/// Parent names are free text copied from race programmes; they are not foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParticipationRecord {
    pub participation_id: i32,
    pub race_id: i32,
    pub name: String,
    pub sex: Option<String>,
    pub breed: Option<String>,
    pub coat: Option<String>,
    pub race_count: Option<i32>,
    pub father: Option<String>,
    pub mother: Option<String>,
    pub place: Option<i32>,
    pub finish_time: Option<String>,
}

/// A race as far as statistics need it: distance and the prize for each of the first five places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub id: i32,
    pub label: Option<String>,
    pub distance: Option<i32>,
    pub prizes: [Option<i32>; 5],
}

/// One participation joined with its race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RaceResult {
    pub participation_id: i32,
    pub race_id: i32,
    pub distance: Option<i32>,
    pub finish_time: Option<String>,
    pub place: Option<i32>,
    pub prize_first: Option<i32>,
    pub prize_second: Option<i32>,
    pub prize_third: Option<i32>,
    pub prize_fourth: Option<i32>,
    pub prize_fifth: Option<i32>,
}

impl RaceResult {
    pub fn join(participation: &ParticipationRecord, race: &Race) -> Self {
        let [first, second, third, fourth, fifth] = race.prizes;
        Self {
            participation_id: participation.participation_id,
            race_id: race.id,
            distance: race.distance,
            finish_time: participation.finish_time.clone(),
            place: participation.place,
            prize_first: first,
            prize_second: second,
            prize_third: third,
            prize_fourth: fourth,
            prize_fifth: fifth,
        }
    }

    /// Prize money earned in this race; zero outside the first five places.
    pub fn winnings(&self) -> i64 {
        let prize = match self.place {
            Some(1) => self.prize_first,
            Some(2) => self.prize_second,
            Some(3) => self.prize_third,
            Some(4) => self.prize_fourth,
            Some(5) => self.prize_fifth,
            _ => None,
        };
        prize.map(i64::from).unwrap_or(0)
    }
}

////////////////////////////////////////////// Routes //////////////////////////////////////////////////

async fn get_horse_by_id(
    State(store): State<Arc<dyn HorseStore>>,
    Path(id): Path<i32>,
) -> Result<Json<PedigreeRecord>, (StatusCode, String)> {
    let records = store.open().await.map_err(|e| {
        error!(error = %e, "failed to open horse store");
        (e.status_code(), e.to_string())
    })?;
    match records.find_pedigree_by_id(id).await {
        Ok(Some(record)) => {
            info!(id, name = %record.name, "horse found");
            Ok(Json(record))
        }
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("no horse with id {}", id))),
        Err(e) => {
            error!(id, error = %e, "failed to look up horse");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

////////////////////////////////////////////// Router //////////////////////////////////////////////////

pub fn create_horse_router(store: Arc<dyn HorseStore>) -> Router {
    Router::new()
        .route("/horse/:id", get(get_horse_by_id))
        .with_state(store)
}
