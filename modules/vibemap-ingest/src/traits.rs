//! Trait boundaries the orchestrator is written against. Production
//! implementations live in `catalog`, `classifier`, and `store`; tests
//! swap in the mocks from `testing`.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;

use places_client::{Place, PlaceDetails};
use vibemap_common::{GeoCell, VenueRecord, VibeScoreSet};

/// Per-dimension classifier output, keyed by the fixed dimension names.
/// `None` means no usable value for that axis.
pub type DimensionScores = BTreeMap<String, Option<f64>>;

/// In-run detail cache counters, surfaced in the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

#[async_trait]
pub trait VenueCatalog: Send + Sync {
    /// Search every configured category around a coordinate, merged and
    /// deduplicated by place id. An error here fails the owning cell.
    async fn search_all_categories(&self, lat: f64, lng: f64) -> Result<Vec<Place>>;

    /// Best-effort detail fetch: `None` on miss or exhausted retries.
    /// A missing detail record never aborts a cell.
    async fn details(&self, place_id: &str) -> Option<PlaceDetails>;

    fn cache_stats(&self) -> CacheStats;
}

#[async_trait]
pub trait VibeScorer: Send + Sync {
    /// Classify aggregated review text into per-dimension scores.
    /// Malformed output degrades to nulls; only transport-level
    /// failures (after retries) return an error.
    async fn score_vibes(&self, text: &str) -> Result<DimensionScores>;

    /// Model identifier recorded as provenance on persisted scores.
    fn model(&self) -> &str;
}

/// Narrow read/write interface over the primary store. The schema and
/// grid geometry behind it belong to external collaborators.
#[async_trait]
pub trait CellStore: Send + Sync {
    /// All cells for an area in stable geographic order, so offset
    /// skips the same leading subset on every run.
    async fn cells_for_area(&self, area_id: &str) -> Result<Vec<GeoCell>>;

    /// Which of the given cells already have a live score set.
    async fn scored_cell_ids(&self, cell_ids: &[String]) -> Result<HashSet<String>>;

    /// Upsert venues keyed by place id, last write wins.
    async fn upsert_venues(&self, records: &[VenueRecord]) -> Result<()>;

    /// Remove any prior score set for the cell, then insert this one.
    async fn replace_cell_scores(&self, scores: &VibeScoreSet) -> Result<()>;
}
