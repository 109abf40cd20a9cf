//! Race statistics and data availability for a horse.
//!
//! Both endpoints are single-pass reductions over what the store already exposes; nothing is
//! cached between requests.

use std::sync::{Arc, LazyLock};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::genealogy::DEFAULT_EXPECTED_BREED;
use crate::{DataStoreError, HorseName, HorseNameError, HorseRecords, HorseStore, RaceResult};

static FINISH_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*m\s*(\d+)\s*s\s*$").expect("finish time pattern compiles")
});

/// Parses a finish time of the form `"<minutes>m <seconds>s"` into seconds.
///
/// `"0m 0s"` marks a horse that did not finish and is treated like a missing time.
pub fn parse_finish_time(raw: &str) -> Option<u32> {
    let captures = FINISH_TIME.captures(raw)?;
    let minutes: u32 = captures[1].parse().ok()?;
    let seconds: u32 = captures[2].parse().ok()?;
    let total = minutes.checked_mul(60)?.checked_add(seconds)?;
    (total > 0).then_some(total)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/////////////////////////////////////////////// Stats ////////////////////////////////////////////////

/// Finishing places of a horse over its recorded races.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placings {
    pub first: u32,
    pub second: u32,
    pub third: u32,
    pub fourth: u32,
    pub fifth: u32,
    pub disqualified: u32,
    pub average_place: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceStats {
    pub name: String,
    pub recorded_races: usize,
    pub declared_races: i64,
    pub precision_percent: f64,
    pub average_speed_kmh: Option<f64>,
    pub placings: Placings,
    pub total_winnings: i64,
}

impl RaceStats {
    /// Reduces `results` for `name`. `declared_races` is the career count the latest programme
    /// announced for the horse.
    pub fn from_results(name: &HorseName, declared_races: i64, results: &[RaceResult]) -> Self {
        let recorded_races = results.len();
        let precision_percent = if declared_races > 0 {
            recorded_races as f64 / declared_races as f64 * 100.0
        } else {
            0.0
        };

        let mut speed_sum = 0.0;
        let mut timed = 0u32;
        let mut placings = Placings::default();
        let mut place_sum = 0i64;
        let mut placed = 0u32;
        let mut total_winnings = 0i64;

        for result in results {
            let seconds = result.finish_time.as_deref().and_then(parse_finish_time);
            if let (Some(distance), Some(seconds)) = (result.distance, seconds) {
                if distance > 0 {
                    speed_sum += f64::from(distance) / f64::from(seconds) * 3.6;
                    timed += 1;
                }
            }
            match result.place {
                Some(place) => {
                    match place {
                        1 => placings.first += 1,
                        2 => placings.second += 1,
                        3 => placings.third += 1,
                        4 => placings.fourth += 1,
                        5 => placings.fifth += 1,
                        _ => {}
                    }
                    place_sum += i64::from(place);
                    placed += 1;
                }
                None => placings.disqualified += 1,
            }
            total_winnings += result.winnings();
        }

        placings.average_place =
            (placed > 0).then(|| round2(place_sum as f64 / f64::from(placed)));
        Self {
            name: name.to_string(),
            recorded_races,
            declared_races,
            precision_percent,
            average_speed_kmh: (timed > 0).then(|| round2(speed_sum / f64::from(timed))),
            placings,
            total_winnings,
        }
    }
}

/////////////////////////////////////////// Availability /////////////////////////////////////////////

/// What the store knows about a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub name: String,
    pub pedigree_available: bool,
    pub reference_link: Option<String>,
    pub recorded_races: i64,
    pub breed: Option<String>,
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("no recorded races for {0}")]
    NoRecordedRaces(String),
    #[error(transparent)]
    InvalidName(#[from] HorseNameError),
    #[error("storage failure: {0}")]
    Store(#[from] DataStoreError),
}

impl StatsError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StatsError::NoRecordedRaces(_) => StatusCode::NOT_FOUND,
            StatsError::InvalidName(_) => StatusCode::BAD_REQUEST,
            StatsError::Store(DataStoreError::NotFound) => StatusCode::INTERNAL_SERVER_ERROR,
            StatsError::Store(e) => e.status_code(),
        }
    }
}

pub async fn race_stats(
    records: &dyn HorseRecords,
    name: &HorseName,
) -> Result<RaceStats, StatsError> {
    let results = records.list_race_results_by_name(name).await?;
    if results.is_empty() {
        return Err(StatsError::NoRecordedRaces(name.to_string()));
    }
    let declared = records
        .find_latest_participation_by_name(name)
        .await?
        .and_then(|p| p.race_count)
        .map(i64::from)
        .unwrap_or(0);
    Ok(RaceStats::from_results(name, declared, &results))
}

pub async fn availability(
    records: &dyn HorseRecords,
    name: &HorseName,
) -> Result<Availability, StatsError> {
    let pedigree = records.find_pedigree_by_name(name).await?;
    let recorded_races = records.count_participations_by_name(name).await?;
    let latest = records.find_latest_participation_by_name(name).await?;
    let breed = match (&latest, &pedigree) {
        (Some(participation), _) => participation.breed.clone(),
        (None, Some(_)) => Some(DEFAULT_EXPECTED_BREED.to_string()),
        (None, None) => None,
    };
    Ok(Availability {
        name: name.to_string(),
        pedigree_available: pedigree.is_some(),
        reference_link: pedigree.and_then(|p| p.reference_link),
        recorded_races,
        breed,
    })
}

////////////////////////////////////////////// Routes //////////////////////////////////////////////////

async fn open_for(
    store: &dyn HorseStore,
    raw: &str,
) -> Result<(Box<dyn HorseRecords>, HorseName), StatsError> {
    let name = HorseName::new(raw)?;
    Ok((store.open().await?, name))
}

fn reject(e: StatsError) -> (StatusCode, String) {
    warn!(error = %e, "statistics request failed");
    (e.status_code(), e.to_string())
}

async fn get_stats(
    State(store): State<Arc<dyn HorseStore>>,
    Path(name): Path<String>,
) -> Result<Json<RaceStats>, (StatusCode, String)> {
    let (records, name) = open_for(store.as_ref(), &name).await.map_err(reject)?;
    let stats = race_stats(records.as_ref(), &name).await.map_err(reject)?;
    info!(%name, races = stats.recorded_races, "race statistics computed");
    Ok(Json(stats))
}

async fn get_availability(
    State(store): State<Arc<dyn HorseStore>>,
    Path(name): Path<String>,
) -> Result<Json<Availability>, (StatusCode, String)> {
    let (records, name) = open_for(store.as_ref(), &name).await.map_err(reject)?;
    let summary = availability(records.as_ref(), &name).await.map_err(reject)?;
    Ok(Json(summary))
}

////////////////////////////////////////////// Router //////////////////////////////////////////////////

pub fn create_stats_router(store: Arc<dyn HorseStore>) -> Router {
    Router::new()
        .route("/stats/:name", get(get_stats))
        .route("/availability/:name", get(get_availability))
        .with_state(store)
}
