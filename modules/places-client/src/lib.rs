pub mod error;
pub mod types;

pub use error::{PlacesError, Result};
pub use types::{Geometry, LatLng, Place, PlaceDetails, Review};

use std::time::Duration;

use types::{DetailsResponse, SearchResponse};

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Fields requested from the details endpoint. Reviews are the point;
/// the rest keeps the record self-describing.
const DETAILS_FIELDS: &str = "place_id,name,rating,user_ratings_total,reviews";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct PlacesClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PlacesClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Search for venues of one category around a coordinate.
    ///
    /// `ZERO_RESULTS` is an empty list, not an error. Results are capped
    /// at `max_results` client-side; the API page size already bounds the
    /// response at 20.
    pub async fn nearby_search(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
        category: &str,
        max_results: usize,
    ) -> Result<Vec<Place>> {
        let url = format!("{}/nearbysearch/json", self.base_url);
        let location = format!("{lat},{lng}");
        let radius = radius_m.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", category),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: SearchResponse = resp.json().await?;
        match body.status.as_str() {
            "OK" => {
                let mut results = body.results;
                results.truncate(max_results);
                tracing::debug!(category, count = results.len(), "Nearby search complete");
                Ok(results)
            }
            "ZERO_RESULTS" => Ok(Vec::new()),
            other => Err(PlacesError::Status {
                status: other.to_string(),
                message: body.error_message.unwrap_or_default(),
            }),
        }
    }

    /// Fetch the detail record (with reviews) for one venue.
    ///
    /// `NOT_FOUND` maps to `Ok(None)`: the id was valid once but the
    /// venue is gone from the catalog.
    pub async fn place_details(&self, place_id: &str) -> Result<Option<PlaceDetails>> {
        let url = format!("{}/details/json", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("place_id", place_id),
                ("fields", DETAILS_FIELDS),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: DetailsResponse = resp.json().await?;
        match body.status.as_str() {
            "OK" => {
                let details = body.result.ok_or_else(|| {
                    PlacesError::Parse("OK response without a result object".to_string())
                })?;
                tracing::debug!(place_id, reviews = details.reviews.len(), "Details fetched");
                Ok(Some(details))
            }
            "NOT_FOUND" | "ZERO_RESULTS" => Ok(None),
            other => Err(PlacesError::Status {
                status: other.to_string(),
                message: body.error_message.unwrap_or_default(),
            }),
        }
    }
}
