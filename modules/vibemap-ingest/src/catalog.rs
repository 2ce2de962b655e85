//! Rate-limited, retry-aware layer over the raw places client, with an
//! in-run detail cache so a venue returned by overlapping search radii
//! costs one billable detail fetch per run.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use places_client::{Place, PlaceDetails, PlacesClient};

use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::traits::{CacheStats, VenueCatalog};

/// Category search order. Order matters: when the same place id turns
/// up under multiple categories, the first occurrence wins and keeps
/// that category's tagging priority.
pub const SEARCH_CATEGORIES: &[&str] =
    &["restaurant", "cafe", "bar", "bakery", "night_club", "park"];

/// Search radius around a cell centroid. Sized to the cell pitch so
/// adjacent searches overlap slightly rather than leaving gaps.
pub const SEARCH_RADIUS_M: u32 = 350;

/// Result cap per category search.
pub const MAX_RESULTS_PER_SEARCH: usize = 20;

pub struct CatalogClient {
    places: PlacesClient,
    limiter: RateLimiter,
    retry: RetryPolicy,
    cache: Mutex<DetailCache>,
}

#[derive(Default)]
struct DetailCache {
    entries: HashMap<String, PlaceDetails>,
    hits: u32,
    misses: u32,
}

impl CatalogClient {
    pub fn new(places: PlacesClient, rate_per_sec: f64, retry: RetryPolicy) -> Self {
        Self {
            places,
            limiter: RateLimiter::new(rate_per_sec),
            retry,
            cache: Mutex::new(DetailCache::default()),
        }
    }

    /// One nearby search for a single category. Each attempt takes a
    /// limiter slot, so retries stay inside the rate bound too.
    async fn search(&self, lat: f64, lng: f64, category: &str) -> Result<Vec<Place>> {
        self.retry
            .run(
                || async {
                    self.limiter.acquire().await;
                    self.places
                        .nearby_search(lat, lng, SEARCH_RADIUS_M, category, MAX_RESULTS_PER_SEARCH)
                        .await
                },
                places_client::PlacesError::is_retryable,
                |attempt, err| {
                    warn!(category, attempt, error = %err, "Nearby search failed, retrying")
                },
            )
            .await
            .with_context(|| format!("nearby search for category '{category}'"))
    }
}

#[async_trait]
impl VenueCatalog for CatalogClient {
    async fn search_all_categories(&self, lat: f64, lng: f64) -> Result<Vec<Place>> {
        let mut merged: Vec<Place> = Vec::new();
        let mut seen = HashSet::new();

        for category in SEARCH_CATEGORIES {
            let results = self.search(lat, lng, category).await?;
            for place in results {
                if seen.insert(place.place_id.clone()) {
                    merged.push(place);
                }
            }
        }

        info!(lat, lng, venues = merged.len(), "Category searches merged");
        Ok(merged)
    }

    async fn details(&self, place_id: &str) -> Option<PlaceDetails> {
        {
            let mut cache = self.cache.lock().expect("detail cache lock poisoned");
            if let Some(details) = cache.entries.get(place_id).cloned() {
                cache.hits += 1;
                return Some(details);
            }
            cache.misses += 1;
        }

        let fetched = self
            .retry
            .run(
                || async {
                    self.limiter.acquire().await;
                    self.places.place_details(place_id).await
                },
                places_client::PlacesError::is_retryable,
                |attempt, err| {
                    warn!(place_id, attempt, error = %err, "Detail fetch failed, retrying")
                },
            )
            .await;

        match fetched {
            Ok(Some(details)) => {
                let mut cache = self.cache.lock().expect("detail cache lock poisoned");
                cache
                    .entries
                    .insert(place_id.to_string(), details.clone());
                Some(details)
            }
            Ok(None) => {
                warn!(place_id, "Venue gone from catalog, no details");
                None
            }
            // Exhausted retries: treat as "no reviews for this venue".
            Err(err) => {
                warn!(place_id, error = %err, "Detail fetch failed, continuing without reviews");
                None
            }
        }
    }

    fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.lock().expect("detail cache lock poisoned");
        CacheStats {
            hits: cache.hits,
            misses: cache.misses,
        }
    }
}
