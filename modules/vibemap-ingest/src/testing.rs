//! Test mocks for the three trait boundaries:
//! - MockCatalog (VenueCatalog): coordinate-keyed search results
//! - MockScorer (VibeScorer): fixed scores, records received text
//! - MockCellStore (CellStore): stateful in-memory store
//!
//! Plus helpers for building places and cells.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use places_client::{Geometry, LatLng, Place, PlaceDetails, Review};
use vibemap_common::{GeoCell, VenueRecord, VibeScoreSet};

use crate::traits::{CacheStats, CellStore, DimensionScores, VenueCatalog, VibeScorer};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn cell(id: &str, area: &str, lat: f64, lng: f64) -> GeoCell {
    GeoCell {
        id: id.to_string(),
        area_id: area.to_string(),
        center_lat: lat,
        center_lng: lng,
    }
}

pub fn place(id: &str, name: &str, rating: f64, count: u32) -> Place {
    Place {
        place_id: id.to_string(),
        name: name.to_string(),
        rating: Some(rating),
        user_ratings_total: Some(count),
        types: vec!["restaurant".to_string()],
        geometry: Geometry {
            location: LatLng { lat: 0.0, lng: 0.0 },
        },
    }
}

pub fn details(id: &str, reviews: &[&str]) -> PlaceDetails {
    PlaceDetails {
        place_id: id.to_string(),
        name: id.to_string(),
        rating: None,
        user_ratings_total: None,
        reviews: reviews
            .iter()
            .map(|t| Review {
                text: t.to_string(),
                rating: Some(4.0),
                relative_time_description: Some("a month ago".to_string()),
            })
            .collect(),
    }
}

fn coord_key(lat: f64, lng: f64) -> String {
    format!("{lat:.4},{lng:.4}")
}

// ---------------------------------------------------------------------------
// MockCatalog
// ---------------------------------------------------------------------------

/// Coordinate-keyed catalog. Searches on unregistered coordinates fail,
/// which doubles as the "terminal search error" scenario. Detail
/// fetches are served once per id and counted, mimicking the in-run
/// cache of the real client.
pub struct MockCatalog {
    searches: HashMap<String, Vec<Place>>,
    failing: HashSet<String>,
    detail_map: HashMap<String, PlaceDetails>,
    state: Mutex<MockCatalogState>,
}

#[derive(Default)]
struct MockCatalogState {
    detail_fetches: Vec<String>,
    cache: HashMap<String, PlaceDetails>,
    stats: CacheStats,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            searches: HashMap::new(),
            failing: HashSet::new(),
            detail_map: HashMap::new(),
            state: Mutex::new(MockCatalogState::default()),
        }
    }

    pub fn on_search(mut self, lat: f64, lng: f64, places: Vec<Place>) -> Self {
        self.searches.insert(coord_key(lat, lng), places);
        self
    }

    pub fn failing_search(mut self, lat: f64, lng: f64) -> Self {
        self.failing.insert(coord_key(lat, lng));
        self
    }

    pub fn on_details(mut self, detail: PlaceDetails) -> Self {
        self.detail_map.insert(detail.place_id.clone(), detail);
        self
    }

    /// Place ids fetched from the backing service, in order, cache
    /// hits excluded.
    pub fn detail_fetches(&self) -> Vec<String> {
        self.state.lock().expect("mock lock").detail_fetches.clone()
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VenueCatalog for MockCatalog {
    async fn search_all_categories(&self, lat: f64, lng: f64) -> Result<Vec<Place>> {
        let key = coord_key(lat, lng);
        if self.failing.contains(&key) {
            bail!("catalog search failed for {key}");
        }
        Ok(self.searches.get(&key).cloned().unwrap_or_default())
    }

    async fn details(&self, place_id: &str) -> Option<PlaceDetails> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(cached) = state.cache.get(place_id) {
            let cached = cached.clone();
            state.stats.hits += 1;
            return Some(cached);
        }
        state.stats.misses += 1;
        state.detail_fetches.push(place_id.to_string());
        let detail = self.detail_map.get(place_id).cloned()?;
        state.cache.insert(place_id.to_string(), detail.clone());
        Some(detail)
    }

    fn cache_stats(&self) -> CacheStats {
        self.state.lock().expect("mock lock").stats
    }
}

// ---------------------------------------------------------------------------
// MockScorer
// ---------------------------------------------------------------------------

pub struct MockScorer {
    scores: DimensionScores,
    model: String,
    received: Mutex<Vec<String>>,
}

impl MockScorer {
    pub fn returning(scores: DimensionScores) -> Self {
        Self {
            scores,
            model: "mock-model-1".to_string(),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Texts the scorer was asked to classify, in order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl VibeScorer for MockScorer {
    async fn score_vibes(&self, text: &str) -> Result<DimensionScores> {
        self.received
            .lock()
            .expect("mock lock")
            .push(text.to_string());
        Ok(self.scores.clone())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// MockCellStore
// ---------------------------------------------------------------------------

/// In-memory store. Venues are keyed by place id (upsert, last write
/// wins); score replacement counts both replacements and inserts so
/// tests can assert the delete-then-insert discipline.
pub struct MockCellStore {
    cells: HashMap<String, Vec<GeoCell>>,
    state: Mutex<MockStoreState>,
}

#[derive(Default)]
struct MockStoreState {
    venues: HashMap<String, VenueRecord>,
    scores: HashMap<String, VibeScoreSet>,
    score_writes: u32,
}

impl MockCellStore {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
            state: Mutex::new(MockStoreState::default()),
        }
    }

    pub fn with_area(mut self, area: &str, cells: Vec<GeoCell>) -> Self {
        self.cells.insert(area.to_string(), cells);
        self
    }

    /// Pre-seed a live score set, as if a prior run completed the cell.
    pub fn with_score(self, scores: VibeScoreSet) -> Self {
        self.state
            .lock()
            .expect("mock lock")
            .scores
            .insert(scores.cell_id.clone(), scores);
        self
    }

    pub fn venues(&self) -> Vec<VenueRecord> {
        self.state
            .lock()
            .expect("mock lock")
            .venues
            .values()
            .cloned()
            .collect()
    }

    pub fn score_for(&self, cell_id: &str) -> Option<VibeScoreSet> {
        self.state
            .lock()
            .expect("mock lock")
            .scores
            .get(cell_id)
            .cloned()
    }

    pub fn score_writes(&self) -> u32 {
        self.state.lock().expect("mock lock").score_writes
    }
}

impl Default for MockCellStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CellStore for MockCellStore {
    async fn cells_for_area(&self, area_id: &str) -> Result<Vec<GeoCell>> {
        Ok(self.cells.get(area_id).cloned().unwrap_or_default())
    }

    async fn scored_cell_ids(&self, cell_ids: &[String]) -> Result<HashSet<String>> {
        let state = self.state.lock().expect("mock lock");
        Ok(cell_ids
            .iter()
            .filter(|id| state.scores.contains_key(*id))
            .cloned()
            .collect())
    }

    async fn upsert_venues(&self, records: &[VenueRecord]) -> Result<()> {
        let mut state = self.state.lock().expect("mock lock");
        for record in records {
            state
                .venues
                .insert(record.place_id.clone(), record.clone());
        }
        Ok(())
    }

    async fn replace_cell_scores(&self, scores: &VibeScoreSet) -> Result<()> {
        let mut state = self.state.lock().expect("mock lock");
        state.scores.insert(scores.cell_id.clone(), scores.clone());
        state.score_writes += 1;
        Ok(())
    }
}
