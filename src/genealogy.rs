//! # Genealogy Resolution
//!
//! Rebuilds the ancestry tree of a horse by walking parent names across the two record sources:
//!
//! ```text
//!             ┌──────────────┐   miss   ┌──────────────────┐
//!  name ────▶ │  canonical   │ ───────▶ │     fallback     │ ───▶ miss
//!             │  pedigrees   │          │  participations  │
//!             └──────┬───────┘          └────────┬─────────┘
//!                    │ complete node             │ partial node
//!                    ▼                           ▼
//!             father name, mother name ─── resolved again at depth - 1
//! ```
//!
//! The root of a request is strict: a miss is [`GenealogyError::HorseNotFound`] and a fallback
//! record of another breed is [`GenealogyError::HorseWrongBreed`]. Ancestors are lenient: a miss
//! only truncates that branch.
//!
//! In [`ResolutionMode::AgeWindow`] an ancestor must come from the canonical source and be born
//! 5 to 25 years before its child; the fallback source is never consulted for ancestors.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    DataStoreError, HorseIdentity, HorseName, HorseNameError, HorseRecords, HorseStore,
    ParticipationRecord, PedigreeRecord,
};

/// Generations returned when a request does not say.
pub const DEFAULT_DEPTH: u32 = 1;

/// Largest accepted depth. A full tree at this depth has 2047 nodes.
pub const MAX_DEPTH: u32 = 10;

/// Breed a root horse found only among participations is expected to carry.
pub const DEFAULT_EXPECTED_BREED: &str = "TROTTEUR FRANCAIS";

/// Youngest plausible age of a parent at the birth of its foal.
pub const MIN_GENERATION_GAP: i32 = 5;

/// Oldest plausible age of a parent at the birth of its foal.
pub const MAX_GENERATION_GAP: i32 = 25;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/////////////////////////////////////////////// Depth ////////////////////////////////////////////////

/// A validated number of ancestor generations, between 0 and [`MAX_DEPTH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Depth(u32);

impl Depth {
    pub fn new(generations: i64) -> Result<Self, DepthError> {
        if generations < 0 {
            return Err(DepthError::Negative(generations));
        }
        if generations > i64::from(MAX_DEPTH) {
            return Err(DepthError::TooDeep {
                requested: generations,
                max: MAX_DEPTH,
            });
        }
        Ok(Depth(generations as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The budget left for the parents of a node holding this budget, `None` once exhausted.
    pub fn descend(self) -> Option<Depth> {
        self.0.checked_sub(1).map(Depth)
    }
}

impl Default for Depth {
    fn default() -> Self {
        Depth(DEFAULT_DEPTH)
    }
}

impl Display for Depth {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Depth {
    type Err = DepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let generations: i64 = s
            .trim()
            .parse()
            .map_err(|_| DepthError::NotAnInteger(s.to_string()))?;
        Depth::new(generations)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepthError {
    #[error("depth {0:?} is not an integer")]
    NotAnInteger(String),
    #[error("depth {0} is negative")]
    Negative(i64),
    #[error("depth {requested} exceeds the maximum of {max}")]
    TooDeep { requested: i64, max: u32 },
}

////////////////////////////////////////////// Modes /////////////////////////////////////////////////

/// How ancestors are matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Canonical source first, participations second, names only.
    #[default]
    Lenient,
    /// Canonical source only, filtered by the generation gap to the child.
    AgeWindow,
}

impl Display for ResolutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ResolutionMode::Lenient => write!(f, "lenient"),
            ResolutionMode::AgeWindow => write!(f, "age-window"),
        }
    }
}

impl FromStr for ResolutionMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" | "standard" => Ok(ResolutionMode::Lenient),
            "age-window" | "age_window" | "strict" => Ok(ResolutionMode::AgeWindow),
            _ => Err(ModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resolution mode {0:?}; expected lenient or age-window")]
pub struct ModeParseError(String);

/// Which table a node was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    /// The pedigree table; the node is complete.
    Canonical,
    /// The participation table; birth year, breeder and reference link are unknown.
    Fallback,
}

////////////////////////////////////////////// Request ///////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenealogyRequest {
    pub identity: HorseIdentity,
    pub depth: Depth,
    pub mode: ResolutionMode,
    pub expected_breed: String,
}

impl GenealogyRequest {
    pub fn new(identity: HorseIdentity) -> Self {
        Self {
            identity,
            depth: Depth::default(),
            mode: ResolutionMode::default(),
            expected_breed: DEFAULT_EXPECTED_BREED.to_string(),
        }
    }

    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_expected_breed(mut self, breed: impl Into<String>) -> Self {
        self.expected_breed = breed.into();
        self
    }
}

/////////////////////////////////////////////// Tree /////////////////////////////////////////////////

/// One horse of a resolved ancestry tree.
///
/// `father_name` and `mother_name` are the parent names as recorded, reported even when the
/// depth budget stops the walk. `father` and `mother` are the resolved parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenealogyNode {
    pub name: String,
    pub id: Option<i32>,
    pub source: RecordSource,
    pub sex: Option<String>,
    pub color: Option<String>,
    pub breed: Option<String>,
    pub birth_year: Option<i32>,
    pub breeder: Option<String>,
    pub reference_link: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub father: Option<Box<GenealogyNode>>,
    pub mother: Option<Box<GenealogyNode>>,
}

impl GenealogyNode {
    pub fn is_complete(&self) -> bool {
        self.source == RecordSource::Canonical
    }

    /// Generations below this node: 0 for a node without resolved parents.
    pub fn height(&self) -> u32 {
        self.parents()
            .map(|parent| parent.height() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        1 + self.parents().map(GenealogyNode::node_count).sum::<usize>()
    }

    pub fn parents(&self) -> impl Iterator<Item = &GenealogyNode> {
        self.father.iter().chain(self.mother.iter()).map(|b| &**b)
    }
}

impl From<&PedigreeRecord> for GenealogyNode {
    fn from(record: &PedigreeRecord) -> Self {
        Self {
            name: record.name.clone(),
            id: Some(record.id),
            source: RecordSource::Canonical,
            sex: record.sex.clone(),
            color: record.color.clone(),
            breed: None,
            birth_year: record.birth_year,
            breeder: record.breeder.clone(),
            reference_link: record.reference_link.clone(),
            father_name: record.father.clone(),
            mother_name: record.mother.clone(),
            father: None,
            mother: None,
        }
    }
}

impl From<&ParticipationRecord> for GenealogyNode {
    fn from(record: &ParticipationRecord) -> Self {
        Self {
            name: record.name.clone(),
            id: None,
            source: RecordSource::Fallback,
            sex: record.sex.clone(),
            color: record.coat.clone(),
            breed: record.breed.clone(),
            birth_year: None,
            breeder: None,
            reference_link: None,
            father_name: record.father.clone(),
            mother_name: record.mother.clone(),
            father: None,
            mother: None,
        }
    }
}

/// Response body of the genealogy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenealogyResponse {
    pub depth: u32,
    pub mode: ResolutionMode,
    pub generations: u32,
    pub horses: usize,
    pub genealogy: GenealogyNode,
}

impl GenealogyResponse {
    pub fn new(request: &GenealogyRequest, genealogy: GenealogyNode) -> Self {
        Self {
            depth: request.depth.get(),
            mode: request.mode,
            generations: genealogy.height(),
            horses: genealogy.node_count(),
            genealogy,
        }
    }
}

////////////////////////////////////////////// Errors ////////////////////////////////////////////////

#[derive(Debug, Error)]
pub enum GenealogyError {
    #[error("horse {0} is not recorded in any table")]
    HorseNotFound(String),
    #[error("horse {name} is not a {expected}, it is a {breed}")]
    HorseWrongBreed {
        name: String,
        breed: String,
        expected: String,
    },
    #[error(transparent)]
    InvalidDepth(#[from] DepthError),
    #[error(transparent)]
    InvalidMode(#[from] ModeParseError),
    #[error(transparent)]
    InvalidName(#[from] HorseNameError),
    #[error("storage failure: {0}")]
    Store(#[from] DataStoreError),
}

impl GenealogyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GenealogyError::HorseNotFound(_) | GenealogyError::HorseWrongBreed { .. } => {
                StatusCode::NOT_FOUND
            }
            GenealogyError::InvalidDepth(_)
            | GenealogyError::InvalidMode(_)
            | GenealogyError::InvalidName(_) => StatusCode::BAD_REQUEST,
            GenealogyError::Store(DataStoreError::NotFound) => StatusCode::INTERNAL_SERVER_ERROR,
            GenealogyError::Store(e) => e.status_code(),
        }
    }
}

///////////////////////////////////////////// Lookups ////////////////////////////////////////////////

/// One way of finding a record for a name. A plan is tried in order; the first hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Canonical { id: Option<i32> },
    CanonicalWithin { min_year: i32, max_year: i32 },
    Fallback,
}

impl Lookup {
    fn source(self) -> RecordSource {
        match self {
            Lookup::Canonical { .. } | Lookup::CanonicalWithin { .. } => RecordSource::Canonical,
            Lookup::Fallback => RecordSource::Fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Matched {
    Pedigree(PedigreeRecord),
    Participation(ParticipationRecord),
}

impl Matched {
    fn birth_year(&self) -> Option<i32> {
        match self {
            Matched::Pedigree(record) => record.birth_year,
            Matched::Participation(_) => None,
        }
    }

    fn parent_names(&self) -> (Option<HorseName>, Option<HorseName>) {
        let (father, mother) = match self {
            Matched::Pedigree(record) => (&record.father, &record.mother),
            Matched::Participation(record) => (&record.father, &record.mother),
        };
        (
            HorseName::from_reference(father.as_deref()),
            HorseName::from_reference(mother.as_deref()),
        )
    }

    fn to_node(&self) -> GenealogyNode {
        match self {
            Matched::Pedigree(record) => GenealogyNode::from(record),
            Matched::Participation(record) => GenealogyNode::from(record),
        }
    }
}

fn root_plan(id: Option<i32>) -> Vec<Lookup> {
    vec![Lookup::Canonical { id }, Lookup::Fallback]
}

fn ancestor_plan(mode: ResolutionMode, child_birth_year: Option<i32>) -> Vec<Lookup> {
    match (mode, child_birth_year) {
        (ResolutionMode::Lenient, _) => vec![Lookup::Canonical { id: None }, Lookup::Fallback],
        // A window that cannot be represented matches nothing.
        (ResolutionMode::AgeWindow, Some(year)) => match (
            year.checked_sub(MAX_GENERATION_GAP),
            year.checked_sub(MIN_GENERATION_GAP),
        ) {
            (Some(min_year), Some(max_year)) => {
                vec![Lookup::CanonicalWithin { min_year, max_year }]
            }
            _ => Vec::new(),
        },
        (ResolutionMode::AgeWindow, None) => vec![Lookup::Canonical { id: None }],
    }
}

async fn first_match(
    records: &dyn HorseRecords,
    name: &HorseName,
    plan: &[Lookup],
) -> Result<Option<Matched>, DataStoreError> {
    for lookup in plan {
        let found = match *lookup {
            Lookup::Canonical { id: Some(id) } => records
                .find_pedigree_by_name_and_id(name, id)
                .await?
                .map(Matched::Pedigree),
            Lookup::Canonical { id: None } => records
                .find_pedigree_by_name(name)
                .await?
                .map(Matched::Pedigree),
            Lookup::CanonicalWithin { min_year, max_year } => records
                .find_pedigree_by_name_and_age_window(name, min_year, max_year)
                .await?
                .map(Matched::Pedigree),
            Lookup::Fallback => records
                .find_latest_participation_by_name(name)
                .await?
                .map(Matched::Participation),
        };
        if found.is_some() {
            debug!(%name, source = ?lookup.source(), "record matched");
            return Ok(found);
        }
    }
    Ok(None)
}

fn same_breed(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}

///////////////////////////////////////////// Resolver ///////////////////////////////////////////////

/// Resolves the ancestry of `request.identity` with a handle opened on `store`.
///
/// The depth was validated when the request was built, so nothing is acquired for invalid
/// input. The handle lives until this function returns.
pub async fn resolve_genealogy(
    store: &dyn HorseStore,
    request: &GenealogyRequest,
) -> Result<GenealogyNode, GenealogyError> {
    let records = store.open().await?;
    resolve_with(records.as_ref(), request).await
}

/// Resolves the ancestry of `request.identity` over an already opened handle.
pub async fn resolve_with(
    records: &dyn HorseRecords,
    request: &GenealogyRequest,
) -> Result<GenealogyNode, GenealogyError> {
    let name = &request.identity.name;
    let matched = first_match(records, name, &root_plan(request.identity.id))
        .await?
        .ok_or_else(|| GenealogyError::HorseNotFound(name.to_string()))?;

    if let Matched::Participation(record) = &matched {
        if let Some(breed) = record.breed.as_deref().filter(|b| !b.trim().is_empty()) {
            if !same_breed(breed, &request.expected_breed) {
                warn!(
                    %name,
                    breed,
                    expected = %request.expected_breed,
                    "root horse has another breed"
                );
                return Err(GenealogyError::HorseWrongBreed {
                    name: name.to_string(),
                    breed: breed.to_string(),
                    expected: request.expected_breed.clone(),
                });
            }
        }
    }

    let node = expand(records, request.mode, matched, request.depth).await?;
    info!(
        identity = %request.identity,
        depth = %request.depth,
        mode = %request.mode,
        horses = node.node_count(),
        "genealogy resolved"
    );
    Ok(node)
}

fn expand<'a>(
    records: &'a dyn HorseRecords,
    mode: ResolutionMode,
    matched: Matched,
    depth: Depth,
) -> BoxFuture<'a, Result<GenealogyNode, DataStoreError>> {
    Box::pin(async move {
        let mut node = matched.to_node();
        let Some(remaining) = depth.descend() else {
            return Ok(node);
        };
        let child_birth_year = matched.birth_year();
        let (father, mother) = matched.parent_names();
        if let Some(father) = father {
            node.father = ancestor(records, mode, &father, child_birth_year, remaining).await?;
        }
        if let Some(mother) = mother {
            node.mother = ancestor(records, mode, &mother, child_birth_year, remaining).await?;
        }
        Ok(node)
    })
}

async fn ancestor(
    records: &dyn HorseRecords,
    mode: ResolutionMode,
    name: &HorseName,
    child_birth_year: Option<i32>,
    depth: Depth,
) -> Result<Option<Box<GenealogyNode>>, DataStoreError> {
    let plan = ancestor_plan(mode, child_birth_year);
    let Some(matched) = first_match(records, name, &plan).await? else {
        debug!(%name, ?child_birth_year, %mode, "ancestor unresolved");
        return Ok(None);
    };
    Ok(Some(Box::new(expand(records, mode, matched, depth).await?)))
}

////////////////////////////////////////////// Routes //////////////////////////////////////////////////

/// Query string of the genealogy endpoint. Values arrive as text so that malformed input is
/// reported with the same messages as the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenealogyQuery {
    pub depth: Option<String>,
    pub id: Option<i32>,
    pub mode: Option<String>,
    pub breed: Option<String>,
}

impl GenealogyQuery {
    pub fn into_request(self, name: &str) -> Result<GenealogyRequest, GenealogyError> {
        let mut identity = HorseIdentity::new(HorseName::new(name)?);
        if let Some(id) = self.id {
            identity = identity.with_id(id);
        }
        let mut request = GenealogyRequest::new(identity);
        if let Some(depth) = self.depth {
            request = request.with_depth(depth.parse()?);
        }
        if let Some(mode) = self.mode {
            request = request.with_mode(mode.parse()?);
        }
        if let Some(breed) = self.breed.filter(|b| !b.trim().is_empty()) {
            request = request.with_expected_breed(breed.trim().to_uppercase());
        }
        Ok(request)
    }
}

async fn get_genealogy(
    State(store): State<Arc<dyn HorseStore>>,
    Path(name): Path<String>,
    Query(query): Query<GenealogyQuery>,
) -> Result<Json<GenealogyResponse>, (StatusCode, String)> {
    let request = query
        .into_request(&name)
        .map_err(|e| (e.status_code(), e.to_string()))?;
    match resolve_genealogy(store.as_ref(), &request).await {
        Ok(node) => Ok(Json(GenealogyResponse::new(&request, node))),
        Err(e) => {
            warn!(identity = %request.identity, error = %e, "genealogy request failed");
            Err((e.status_code(), e.to_string()))
        }
    }
}

////////////////////////////////////////////// Router //////////////////////////////////////////////////

pub fn create_genealogy_router(store: Arc<dyn HorseStore>) -> Router {
    Router::new()
        .route("/genealogy/:name", get(get_genealogy))
        .with_state(store)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::async_trait;

    use super::*;
    use crate::{InMemoryHorseStore, RaceResult};

    fn name(raw: &str) -> HorseName {
        HorseName::new(raw).unwrap()
    }

    fn pedigree(
        id: i32,
        name: &str,
        birth_year: Option<i32>,
        father: Option<&str>,
        mother: Option<&str>,
    ) -> PedigreeRecord {
        PedigreeRecord {
            id,
            name: name.to_string(),
            sex: Some("M".to_string()),
            color: Some("BAI".to_string()),
            birth_year,
            father: father.map(str::to_string),
            mother: mother.map(str::to_string),
            death_date: None,
            breeder: Some("TEST_NAISS".to_string()),
            reference_link: Some("http://test.com".to_string()),
        }
    }

    fn participation(
        participation_id: i32,
        name: &str,
        breed: Option<&str>,
        father: Option<&str>,
        mother: Option<&str>,
    ) -> ParticipationRecord {
        ParticipationRecord {
            participation_id,
            race_id: 1,
            name: name.to_string(),
            sex: Some("F".to_string()),
            breed: breed.map(str::to_string),
            coat: Some("ALEZAN".to_string()),
            race_count: Some(8),
            father: father.map(str::to_string),
            mother: mother.map(str::to_string),
            place: None,
            finish_time: None,
        }
    }

    fn request(raw: &str, depth: i64) -> GenealogyRequest {
        GenealogyRequest::new(HorseIdentity::new(name(raw))).with_depth(Depth::new(depth).unwrap())
    }

    /// TEST_CHEVAL_1 is canonical with unrecorded parents; TEST_CHEVAL_2 is only a participant.
    fn scenario_store() -> InMemoryHorseStore {
        let store = InMemoryHorseStore::new();
        store
            .insert_pedigree(pedigree(
                1,
                "TEST_CHEVAL_1",
                Some(2010),
                Some("TEST_PERE"),
                Some("TEST_MERE"),
            ))
            .unwrap();
        store
            .insert_participation(participation(
                2,
                "TEST_CHEVAL_2",
                Some("TROTTEUR FRANCAIS"),
                None,
                None,
            ))
            .unwrap();
        store
    }

    /// Three canonical generations: FOAL (2015) <- SIRE (2005) <- GRANDSIRE (1995).
    fn lineage_store() -> InMemoryHorseStore {
        let store = InMemoryHorseStore::new();
        store
            .insert_pedigree(pedigree(1, "FOAL", Some(2015), Some("SIRE"), Some("DAM")))
            .unwrap();
        store
            .insert_pedigree(pedigree(2, "SIRE", Some(2005), Some("GRANDSIRE"), None))
            .unwrap();
        store
            .insert_pedigree(pedigree(3, "DAM", Some(2008), None, Some("GRANDDAM")))
            .unwrap();
        store
            .insert_pedigree(pedigree(4, "GRANDSIRE", Some(1995), None, None))
            .unwrap();
        store
            .insert_participation(participation(1, "GRANDDAM", None, None, None))
            .unwrap();
        store
    }

    #[test]
    fn depth_validation() {
        assert_eq!(Depth::new(0).unwrap().get(), 0);
        assert_eq!(Depth::new(i64::from(MAX_DEPTH)).unwrap().get(), MAX_DEPTH);
        assert_eq!(Depth::new(-1), Err(DepthError::Negative(-1)));
        assert!(matches!(Depth::new(11), Err(DepthError::TooDeep { requested: 11, .. })));
        assert_eq!("3".parse::<Depth>().unwrap().get(), 3);
        assert_eq!(
            "two".parse::<Depth>(),
            Err(DepthError::NotAnInteger("two".to_string()))
        );
        assert!("1.5".parse::<Depth>().is_err());
        assert_eq!(Depth::default().get(), DEFAULT_DEPTH);
    }

    #[test]
    fn depth_descends_to_exhaustion() {
        let depth = Depth::new(1).unwrap();
        assert_eq!(depth.descend(), Some(Depth::new(0).unwrap()));
        assert_eq!(Depth::new(0).unwrap().descend(), None);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("age-window".parse::<ResolutionMode>(), Ok(ResolutionMode::AgeWindow));
        assert_eq!("Lenient".parse::<ResolutionMode>(), Ok(ResolutionMode::Lenient));
        assert!("sideways".parse::<ResolutionMode>().is_err());
        assert_eq!(ResolutionMode::AgeWindow.to_string(), "age-window");
    }

    #[test]
    fn ancestor_plans() {
        assert_eq!(
            ancestor_plan(ResolutionMode::Lenient, Some(2010)),
            vec![Lookup::Canonical { id: None }, Lookup::Fallback]
        );
        assert_eq!(
            ancestor_plan(ResolutionMode::AgeWindow, Some(2010)),
            vec![Lookup::CanonicalWithin { min_year: 1985, max_year: 2005 }]
        );
        assert_eq!(
            ancestor_plan(ResolutionMode::AgeWindow, None),
            vec![Lookup::Canonical { id: None }]
        );
        assert!(ancestor_plan(ResolutionMode::AgeWindow, Some(i32::MIN + 3)).is_empty());
    }

    #[tokio::test]
    async fn unrepresentable_windows_match_nothing() {
        let store = InMemoryHorseStore::new();
        store
            .insert_pedigree(pedigree(1, "ANCIENT", Some(i32::MIN + 3), Some("SIRE"), None))
            .unwrap();
        store
            .insert_pedigree(pedigree(2, "SIRE", Some(i32::MIN), None, None))
            .unwrap();

        let strict = request("ANCIENT", 1).with_mode(ResolutionMode::AgeWindow);
        let node = resolve_genealogy(&store, &strict).await.unwrap();
        assert_eq!(node.father_name.as_deref(), Some("SIRE"));
        assert!(node.father.is_none());

        let lenient = resolve_genealogy(&store, &request("ANCIENT", 1)).await.unwrap();
        assert!(lenient.father.is_some());
    }

    #[tokio::test]
    async fn depth_zero_reports_names_without_parents() {
        let store = lineage_store();
        let node = resolve_genealogy(&store, &request("foal", 0)).await.unwrap();
        assert_eq!(node.father_name.as_deref(), Some("SIRE"));
        assert_eq!(node.mother_name.as_deref(), Some("DAM"));
        assert!(node.father.is_none());
        assert!(node.mother.is_none());
        assert_eq!(node.height(), 0);
    }

    #[tokio::test]
    async fn height_is_bounded_by_depth() {
        let store = lineage_store();
        let one = resolve_genealogy(&store, &request("foal", 1)).await.unwrap();
        assert_eq!(one.height(), 1);
        let sire = one.father.as_ref().unwrap();
        assert_eq!(sire.father_name.as_deref(), Some("GRANDSIRE"));
        assert!(sire.father.is_none());

        let two = resolve_genealogy(&store, &request("foal", 2)).await.unwrap();
        assert_eq!(two.height(), 2);
        assert_eq!(two.node_count(), 5);

        let five = resolve_genealogy(&store, &request("foal", 5)).await.unwrap();
        assert_eq!(five, two);
    }

    #[tokio::test]
    async fn canonical_takes_precedence_over_fallback() {
        let store = scenario_store();
        store
            .insert_participation(participation(
                7,
                "TEST_CHEVAL_1",
                Some("TROTTEUR FRANCAIS"),
                None,
                None,
            ))
            .unwrap();
        let node = resolve_genealogy(&store, &request("test_cheval_1", 1)).await.unwrap();
        assert!(node.is_complete());
        assert_eq!(node.birth_year, Some(2010));
        assert_eq!(node.breeder.as_deref(), Some("TEST_NAISS"));
        assert_eq!(node.reference_link.as_deref(), Some("http://test.com"));
    }

    #[tokio::test]
    async fn canonical_root_with_unrecorded_parents() {
        let store = scenario_store();
        let node = resolve_genealogy(&store, &request("TEST_CHEVAL_1", 2)).await.unwrap();
        assert_eq!(node.source, RecordSource::Canonical);
        assert_eq!(node.father_name.as_deref(), Some("TEST_PERE"));
        assert!(node.father.is_none());
        assert!(node.mother.is_none());
    }

    #[tokio::test]
    async fn fallback_root_is_partial() {
        let store = scenario_store();
        let node = resolve_genealogy(&store, &request("TEST_CHEVAL_2", 1)).await.unwrap();
        assert_eq!(node.source, RecordSource::Fallback);
        assert_eq!(node.sex.as_deref(), Some("F"));
        assert_eq!(node.color.as_deref(), Some("ALEZAN"));
        assert_eq!(node.birth_year, None);
        assert_eq!(node.breeder, None);
        assert_eq!(node.reference_link, None);
        assert!(!node.is_complete());
    }

    #[tokio::test]
    async fn unknown_root_is_not_found() {
        let store = scenario_store();
        for depth in [0, 1, 5] {
            let result = resolve_genealogy(&store, &request("GHOST", depth)).await;
            assert!(matches!(result, Err(GenealogyError::HorseNotFound(ref n)) if n == "GHOST"));
        }
    }

    #[tokio::test]
    async fn fallback_root_of_another_breed_is_rejected() {
        let store = InMemoryHorseStore::new();
        store
            .insert_participation(participation(1, "SEA THE STARS", Some("PUR SANG"), None, None))
            .unwrap();
        let result = resolve_genealogy(&store, &request("sea the stars", 1)).await;
        match result {
            Err(GenealogyError::HorseWrongBreed { breed, expected, .. }) => {
                assert_eq!(breed, "PUR SANG");
                assert_eq!(expected, "TROTTEUR FRANCAIS");
            }
            other => panic!("expected wrong breed, got {:?}", other),
        }
        let accepted = request("sea the stars", 1).with_expected_breed("pur sang");
        assert!(resolve_genealogy(&store, &accepted).await.is_ok());
    }

    #[tokio::test]
    async fn fallback_ancestors_ignore_breed() {
        let store = InMemoryHorseStore::new();
        store
            .insert_pedigree(pedigree(1, "HYBRID", Some(2012), Some("THOROUGHBRED SIRE"), None))
            .unwrap();
        store
            .insert_participation(participation(
                1,
                "THOROUGHBRED SIRE",
                Some("PUR SANG"),
                None,
                None,
            ))
            .unwrap();
        let node = resolve_genealogy(&store, &request("hybrid", 1)).await.unwrap();
        let father = node.father.expect("fallback father");
        assert_eq!(father.source, RecordSource::Fallback);
        assert_eq!(father.breed.as_deref(), Some("PUR SANG"));
    }

    #[tokio::test]
    async fn lenient_mode_uses_fallback_for_ancestors() {
        let store = lineage_store();
        let node = resolve_genealogy(&store, &request("foal", 2)).await.unwrap();
        let dam = node.mother.as_ref().unwrap();
        let granddam = dam.mother.as_ref().expect("granddam from participations");
        assert_eq!(granddam.source, RecordSource::Fallback);
    }

    #[tokio::test]
    async fn age_window_prunes_implausible_ancestors() {
        let store = lineage_store();
        // Born after its foal: outside [2015 - 25, 2015 - 5].
        store
            .insert_pedigree(pedigree(10, "LATECOMER", Some(2020), None, None))
            .unwrap();
        store
            .insert_pedigree(pedigree(11, "YOUNG FOAL", Some(2015), Some("LATECOMER"), Some("DAM")))
            .unwrap();

        let lenient = resolve_genealogy(&store, &request("young foal", 1)).await.unwrap();
        assert!(lenient.father.is_some());

        let strict = request("young foal", 1).with_mode(ResolutionMode::AgeWindow);
        let node = resolve_genealogy(&store, &strict).await.unwrap();
        assert!(node.father.is_none());
        assert_eq!(node.father_name.as_deref(), Some("LATECOMER"));
        assert_eq!(node.mother.as_ref().map(|m| m.name.as_str()), Some("DAM"));
    }

    #[tokio::test]
    async fn age_window_never_falls_back_for_ancestors() {
        let store = lineage_store();
        let strict = request("foal", 2).with_mode(ResolutionMode::AgeWindow);
        let node = resolve_genealogy(&store, &strict).await.unwrap();
        let sire = node.father.as_ref().unwrap();
        assert_eq!(sire.father.as_ref().map(|g| g.name.as_str()), Some("GRANDSIRE"));
        let dam = node.mother.as_ref().unwrap();
        assert!(dam.mother.is_none());
    }

    #[tokio::test]
    async fn age_window_picks_the_plausible_namesake() {
        let store = InMemoryHorseStore::new();
        store
            .insert_pedigree(pedigree(1, "COMMON NAME", Some(1960), None, None))
            .unwrap();
        store
            .insert_pedigree(pedigree(2, "COMMON NAME", Some(2001), None, None))
            .unwrap();
        store
            .insert_pedigree(pedigree(3, "RECENT", Some(2012), Some("COMMON NAME"), None))
            .unwrap();

        let lenient = resolve_genealogy(&store, &request("recent", 1)).await.unwrap();
        assert_eq!(lenient.father.as_ref().and_then(|f| f.birth_year), Some(1960));

        let strict = request("recent", 1).with_mode(ResolutionMode::AgeWindow);
        let node = resolve_genealogy(&store, &strict).await.unwrap();
        assert_eq!(node.father.as_ref().and_then(|f| f.birth_year), Some(2001));
    }

    #[tokio::test]
    async fn root_id_disambiguates_namesakes() {
        let store = InMemoryHorseStore::new();
        store
            .insert_pedigree(pedigree(1, "TWIN", Some(1990), None, None))
            .unwrap();
        store
            .insert_pedigree(pedigree(2, "TWIN", Some(2010), None, None))
            .unwrap();
        let identity = HorseIdentity::new(name("twin")).with_id(2);
        let node = resolve_genealogy(&store, &GenealogyRequest::new(identity))
            .await
            .unwrap();
        assert_eq!(node.id, Some(2));
        assert_eq!(node.birth_year, Some(2010));
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let store = lineage_store();
        for mode in [ResolutionMode::Lenient, ResolutionMode::AgeWindow] {
            let req = request("foal", 3).with_mode(mode);
            let first = resolve_genealogy(&store, &req).await.unwrap();
            let second = resolve_genealogy(&store, &req).await.unwrap();
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn branches_are_independent() {
        let store = InMemoryHorseStore::new();
        store
            .insert_pedigree(pedigree(1, "INBRED", Some(2015), Some("SHARED"), Some("SHARED")))
            .unwrap();
        store
            .insert_pedigree(pedigree(2, "SHARED", Some(2005), None, None))
            .unwrap();
        let node = resolve_genealogy(&store, &request("inbred", 1)).await.unwrap();
        assert_eq!(node.father, node.mother);
        assert_eq!(node.node_count(), 3);
    }

    struct CountingStore {
        inner: InMemoryHorseStore,
        opened: AtomicUsize,
    }

    #[async_trait]
    impl HorseStore for CountingStore {
        async fn open(&self) -> Result<Box<dyn HorseRecords>, DataStoreError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.inner.open().await
        }
    }

    #[tokio::test]
    async fn invalid_query_never_opens_the_store() {
        let store = Arc::new(CountingStore {
            inner: scenario_store(),
            opened: AtomicUsize::new(0),
        });
        let query = GenealogyQuery {
            depth: Some("-3".to_string()),
            ..Default::default()
        };
        let err = query.into_request("TEST_CHEVAL_1").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(store.opened.load(Ordering::SeqCst), 0);

        let query = GenealogyQuery {
            depth: Some("2".to_string()),
            mode: Some("age-window".to_string()),
            id: Some(1),
            breed: None,
        };
        let request = query.into_request("test_cheval_1").unwrap();
        resolve_genealogy(store.as_ref(), &request).await.unwrap();
        assert_eq!(store.opened.load(Ordering::SeqCst), 1);
    }

    struct BrokenRecords;

    fn reset() -> DataStoreError {
        DataStoreError::Connection("reset by peer".to_string())
    }

    #[async_trait]
    impl HorseRecords for BrokenRecords {
        async fn find_pedigree_by_name(
            &self,
            _: &HorseName,
        ) -> Result<Option<PedigreeRecord>, DataStoreError> {
            Err(reset())
        }

        async fn find_pedigree_by_name_and_id(
            &self,
            _: &HorseName,
            _: i32,
        ) -> Result<Option<PedigreeRecord>, DataStoreError> {
            Err(reset())
        }

        async fn find_pedigree_by_name_and_age_window(
            &self,
            _: &HorseName,
            _: i32,
            _: i32,
        ) -> Result<Option<PedigreeRecord>, DataStoreError> {
            Err(reset())
        }

        async fn find_pedigree_by_id(
            &self,
            _: i32,
        ) -> Result<Option<PedigreeRecord>, DataStoreError> {
            Err(reset())
        }

        async fn find_latest_participation_by_name(
            &self,
            _: &HorseName,
        ) -> Result<Option<ParticipationRecord>, DataStoreError> {
            Err(reset())
        }

        async fn count_participations_by_name(&self, _: &HorseName) -> Result<i64, DataStoreError> {
            Err(reset())
        }

        async fn list_race_results_by_name(
            &self,
            _: &HorseName,
        ) -> Result<Vec<RaceResult>, DataStoreError> {
            Err(reset())
        }
    }

    #[tokio::test]
    async fn store_failures_are_surfaced() {
        let result = resolve_with(&BrokenRecords, &request("anything", 1)).await;
        let err = result.unwrap_err();
        assert!(matches!(err, GenealogyError::Store(DataStoreError::Connection(_))));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
