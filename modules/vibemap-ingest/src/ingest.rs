//! Unit-of-work orchestrator. Walks an area's cells strictly
//! sequentially, isolates per-cell failures into the run ledger, and
//! keeps the whole run resumable: completed cells are skipped on the
//! next invocation unless `force` is set.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use places_client::Place;
use vibemap_common::{GeoCell, VenueRecord, VibeScoreSet, VIBE_DIMENSIONS_VERSION};

use crate::aggregate::{self, MIN_RATING_COUNT, REVIEW_TEXT_BUDGET, TOP_VENUES_PER_CELL};
use crate::run_log::RunLog;
use crate::traits::{CellStore, VenueCatalog, VibeScorer};

/// Pause between cells, on top of the per-service limiters, to smooth
/// burstiness across the whole run.
const INTER_CELL_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, TypedBuilder)]
pub struct RunOptions {
    pub area: String,
    /// Reprocess cells that already have a persisted score.
    #[builder(default)]
    pub force: bool,
    /// Skip all persistence; reads, compute, and API costs unchanged.
    #[builder(default)]
    pub dry_run: bool,
    /// Skip the first N cells of the deterministic ordering.
    #[builder(default)]
    pub offset: Option<usize>,
    /// Cap the number of cells processed.
    #[builder(default)]
    pub limit: Option<usize>,
}

/// Counters for one ingestion run.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub cells_processed: u32,
    pub cells_succeeded: u32,
    pub cells_failed: u32,
    pub cells_skipped_scored: u32,
    pub venues_discovered: u32,
    pub venues_qualified: u32,
    pub reviews_seen: u32,
    pub classifier_calls: u32,
    pub detail_cache_hits: u32,
    pub detail_cache_misses: u32,
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Ingest Run Complete ===")?;
        writeln!(f, "Cells processed:    {}", self.cells_processed)?;
        writeln!(f, "Cells succeeded:    {}", self.cells_succeeded)?;
        writeln!(f, "Cells failed:       {}", self.cells_failed)?;
        writeln!(f, "Cells skipped:      {} (already scored)", self.cells_skipped_scored)?;
        writeln!(f, "Venues discovered:  {}", self.venues_discovered)?;
        writeln!(f, "Venues qualified:   {}", self.venues_qualified)?;
        writeln!(f, "Reviews seen:       {}", self.reviews_seen)?;
        writeln!(f, "Classifier calls:   {}", self.classifier_calls)?;
        writeln!(
            f,
            "Detail cache:       {} hits / {} misses",
            self.detail_cache_hits, self.detail_cache_misses
        )?;
        Ok(())
    }
}

pub struct Ingestor {
    catalog: Arc<dyn VenueCatalog>,
    scorer: Arc<dyn VibeScorer>,
    store: Arc<dyn CellStore>,
    options: RunOptions,
}

impl Ingestor {
    pub fn new(
        catalog: Arc<dyn VenueCatalog>,
        scorer: Arc<dyn VibeScorer>,
        store: Arc<dyn CellStore>,
        options: RunOptions,
    ) -> Self {
        Self {
            catalog,
            scorer,
            store,
            options,
        }
    }

    /// Run the full pipeline over the selected cells.
    pub async fn run(&self) -> Result<(IngestStats, RunLog)> {
        let mut stats = IngestStats::default();
        let mut log = RunLog::new(&self.options.area);

        let mut cells = self
            .store
            .cells_for_area(&self.options.area)
            .await
            .context("Failed to load cells")?;
        if cells.is_empty() {
            bail!("No cells found for area '{}'", self.options.area);
        }
        info!(
            area = %self.options.area,
            cells = cells.len(),
            dry_run = self.options.dry_run,
            "Loaded area"
        );

        if !self.options.force {
            let ids: Vec<String> = cells.iter().map(|c| c.id.clone()).collect();
            let scored = self
                .store
                .scored_cell_ids(&ids)
                .await
                .context("Failed to list scored cells")?;
            let before = cells.len();
            cells.retain(|c| !scored.contains(&c.id));
            stats.cells_skipped_scored = (before - cells.len()) as u32;
            if stats.cells_skipped_scored > 0 {
                info!(skipped = stats.cells_skipped_scored, "Skipping already-scored cells");
            }
        }

        if let Some(offset) = self.options.offset {
            let offset = offset.min(cells.len());
            cells.drain(..offset);
        }
        if let Some(limit) = self.options.limit {
            cells.truncate(limit);
        }
        info!(cells = cells.len(), "Cells selected for this run");

        for (i, cell) in cells.iter().enumerate() {
            match self.process_cell(cell, &mut stats).await {
                Ok(()) => stats.cells_succeeded += 1,
                // One failing cell never halts the run.
                Err(err) => {
                    warn!(cell_id = %cell.id, error = %format!("{err:#}"), "Cell failed");
                    log.record_failure(&cell.id, &err);
                    stats.cells_failed += 1;
                }
            }
            stats.cells_processed += 1;

            if i + 1 < cells.len() {
                tokio::time::sleep(INTER_CELL_DELAY).await;
            }
        }

        let cache = self.catalog.cache_stats();
        stats.detail_cache_hits = cache.hits;
        stats.detail_cache_misses = cache.misses;

        info!("{stats}");
        Ok((stats, log))
    }

    async fn process_cell(&self, cell: &GeoCell, stats: &mut IngestStats) -> Result<()> {
        let entries = self
            .catalog
            .search_all_categories(cell.center_lat, cell.center_lng)
            .await
            .with_context(|| format!("searching cell {}", cell.id))?;
        stats.venues_discovered += entries.len() as u32;

        // Every discovered venue is persisted; qualification only gates
        // which ones feed scoring.
        let records: Vec<VenueRecord> = entries.iter().map(|p| venue_record(p, &cell.id)).collect();
        if !self.options.dry_run && !records.is_empty() {
            self.store
                .upsert_venues(&records)
                .await
                .with_context(|| format!("persisting venues for cell {}", cell.id))?;
        }

        let qualified = aggregate::qualified(&entries, MIN_RATING_COUNT);
        stats.venues_qualified += qualified.len() as u32;

        let now = Utc::now();
        if qualified.is_empty() {
            info!(cell_id = %cell.id, "No qualified venues, persisting null scores");
            let empty = VibeScoreSet::empty(&cell.id, now);
            if !self.options.dry_run {
                self.store
                    .replace_cell_scores(&empty)
                    .await
                    .with_context(|| format!("persisting null scores for cell {}", cell.id))?;
            }
            return Ok(());
        }

        let ranked = aggregate::rank(qualified);
        let top = &ranked[..TOP_VENUES_PER_CELL.min(ranked.len())];

        let mut details = Vec::new();
        for place in top {
            if let Some(detail) = self.catalog.details(&place.place_id).await {
                details.push(detail);
            }
        }

        let (text, review_count) = aggregate::aggregate_review_text(&details, REVIEW_TEXT_BUDGET);
        stats.reviews_seen += review_count;

        let score_set = if text.is_empty() {
            // Qualified venues but no usable review text: nothing to
            // classify, persist a null set rather than burning a call.
            VibeScoreSet::empty(&cell.id, now)
        } else {
            let scores = self
                .scorer
                .score_vibes(&text)
                .await
                .with_context(|| format!("classifying cell {}", cell.id))?;
            stats.classifier_calls += 1;
            VibeScoreSet {
                cell_id: cell.id.clone(),
                scores,
                source_review_count: review_count,
                model: Some(self.scorer.model().to_string()),
                dimensions_version: VIBE_DIMENSIONS_VERSION.to_string(),
                computed_at: now,
            }
        };

        if !self.options.dry_run {
            self.store
                .replace_cell_scores(&score_set)
                .await
                .with_context(|| format!("persisting scores for cell {}", cell.id))?;
        }

        info!(
            cell_id = %cell.id,
            venues = entries.len(),
            reviews = review_count,
            "Cell scored"
        );
        Ok(())
    }
}

fn venue_record(place: &Place, cell_id: &str) -> VenueRecord {
    VenueRecord {
        place_id: place.place_id.clone(),
        cell_id: cell_id.to_string(),
        name: place.name.clone(),
        primary_category: place.types.first().cloned(),
        rating: place.rating,
        rating_count: place.user_ratings_total,
        lat: place.geometry.location.lat,
        lng: place.geometry.location.lng,
    }
}
