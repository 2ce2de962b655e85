use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed, versioned set of vibe dimensions. Scores are keyed by
/// these names; anything else a classifier emits is discarded.
pub const VIBE_DIMENSIONS: &[&str] = &[
    "lively",
    "social",
    "cozy",
    "classy",
    "artsy",
    "family_friendly",
];

/// Bumped whenever the dimension set changes, so stored score sets can
/// be told apart from ones computed under an older taxonomy.
pub const VIBE_DIMENSIONS_VERSION: &str = "v1";

/// One grid cell, the unit of work for ingestion. Created by the
/// external geometry generator; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoCell {
    pub id: String,
    pub area_id: String,
    pub center_lat: f64,
    pub center_lng: f64,
}

/// Persisted form of a discovered venue. `place_id` is the global
/// upsert key; a venue rediscovered on a later run overwrites its
/// prior record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueRecord {
    pub place_id: String,
    pub cell_id: String,
    pub name: String,
    pub primary_category: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    pub lat: f64,
    pub lng: f64,
}

/// Per-cell vibe scores plus provenance. At most one live record per
/// cell; a recomputation replaces the prior record outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibeScoreSet {
    pub cell_id: String,
    /// One entry per dimension in `VIBE_DIMENSIONS`; `None` means the
    /// classifier produced no usable value for that axis.
    pub scores: BTreeMap<String, Option<f64>>,
    /// Total non-empty review snippets seen for the cell, which may
    /// exceed the number embedded in the classified text.
    pub source_review_count: u32,
    /// Classifier model identifier; `None` when no classification ran.
    pub model: Option<String>,
    pub dimensions_version: String,
    pub computed_at: DateTime<Utc>,
}

impl VibeScoreSet {
    /// A score set with every dimension null: the persisted result for
    /// a cell with nothing to classify.
    pub fn empty(cell_id: &str, computed_at: DateTime<Utc>) -> Self {
        Self {
            cell_id: cell_id.to_string(),
            scores: VIBE_DIMENSIONS
                .iter()
                .map(|d| (d.to_string(), None))
                .collect(),
            source_review_count: 0,
            model: None,
            dimensions_version: VIBE_DIMENSIONS_VERSION.to_string(),
            computed_at,
        }
    }
}

/// One failed cell, recorded in the out-of-band run ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub cell_id: String,
    pub error: String,
    pub ts: DateTime<Utc>,
}
