//! Pure venue aggregation: qualify, rank, and bound the review text
//! that goes to the classifier. No I/O.

use places_client::{Place, PlaceDetails};

/// Minimum rating count for a venue to feed scoring. Below-threshold
/// venues are still persisted, they just carry too little signal to
/// spend a detail fetch on.
pub const MIN_RATING_COUNT: u32 = 5;

/// How many ranked venues get a detail/review fetch per cell. Bounds
/// the per-cell detail cost regardless of venue density.
pub const TOP_VENUES_PER_CELL: usize = 5;

/// Character budget for the aggregated review text sent to the
/// classifier. Snippets never get cut mid-text; aggregation stops
/// before the snippet that would overflow.
pub const REVIEW_TEXT_BUDGET: usize = 6000;

/// Venues with enough ratings to be worth ranking.
pub fn qualified(places: &[Place], min_rating_count: u32) -> Vec<Place> {
    places
        .iter()
        .filter(|p| p.user_ratings_total.unwrap_or(0) >= min_rating_count)
        .cloned()
        .collect()
}

/// Composite popularity-weighted score. Volume dominates: a venue a
/// hundred people bothered to rate says more about the block than one
/// five-star outlier.
pub fn composite_score(place: &Place) -> f64 {
    0.7 * place.user_ratings_total.unwrap_or(0) as f64 + 0.3 * place.rating.unwrap_or(0.0)
}

/// Sort descending by composite score. Stable, so ties keep input order.
pub fn rank(mut places: Vec<Place>) -> Vec<Place> {
    places.sort_by(|a, b| {
        composite_score(b)
            .partial_cmp(&composite_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    places
}

/// Concatenate trimmed non-empty review snippets in fetch order,
/// blank-line separated, stopping before the snippet that would exceed
/// `budget` characters.
///
/// Returns the bounded text plus the total count of non-empty snippets
/// seen; the count reflects evidentiary volume and may exceed what the
/// text embeds.
pub fn aggregate_review_text(details: &[PlaceDetails], budget: usize) -> (String, u32) {
    let mut text = String::new();
    let mut total = 0u32;
    let mut full = false;

    for detail in details {
        for review in &detail.reviews {
            let snippet = review.text.trim();
            if snippet.is_empty() {
                continue;
            }
            total += 1;
            if full {
                continue;
            }
            let needed = if text.is_empty() {
                snippet.len()
            } else {
                text.len() + 2 + snippet.len()
            };
            if needed > budget {
                full = true;
                continue;
            }
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(snippet);
        }
    }

    (text, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use places_client::{Geometry, LatLng, Review};

    fn place(id: &str, rating: Option<f64>, count: Option<u32>) -> Place {
        Place {
            place_id: id.to_string(),
            name: id.to_string(),
            rating,
            user_ratings_total: count,
            types: vec!["restaurant".to_string()],
            geometry: Geometry {
                location: LatLng { lat: 0.0, lng: 0.0 },
            },
        }
    }

    fn details_with(texts: &[&str]) -> PlaceDetails {
        PlaceDetails {
            place_id: "p".to_string(),
            name: "p".to_string(),
            rating: None,
            user_ratings_total: None,
            reviews: texts
                .iter()
                .map(|t| Review {
                    text: t.to_string(),
                    rating: None,
                    relative_time_description: None,
                })
                .collect(),
        }
    }

    #[test]
    fn qualification_filters_below_threshold() {
        let places = vec![
            place("a", Some(4.5), Some(3)),
            place("b", Some(4.0), Some(5)),
            place("c", None, None),
        ];
        let q = qualified(&places, 5);
        assert_eq!(q.len(), 1);
        assert_eq!(q[0].place_id, "b");
    }

    #[test]
    fn rating_volume_dominates_rating_value() {
        // A(rating=5, count=1) vs B(rating=1, count=100): B wins.
        let ranked = rank(vec![
            place("a", Some(5.0), Some(1)),
            place("b", Some(1.0), Some(100)),
        ]);
        assert_eq!(ranked[0].place_id, "b");
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let ranked = rank(vec![
            place("first", Some(4.0), Some(10)),
            place("second", Some(4.0), Some(10)),
            place("third", Some(4.0), Some(10)),
        ]);
        let ids: Vec<_> = ranked.iter().map(|p| p.place_id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[test]
    fn missing_fields_rank_as_zero() {
        let ranked = rank(vec![place("none", None, None), place("some", Some(3.0), Some(2))]);
        assert_eq!(ranked[0].place_id, "some");
    }

    #[test]
    fn aggregation_respects_budget_without_mid_snippet_cuts() {
        let details = vec![details_with(&["aaaa", "bbbb", "cccc"])];
        // Budget fits "aaaa\n\nbbbb" (10 chars) but not the third snippet.
        let (text, total) = aggregate_review_text(&details, 11);
        assert_eq!(text, "aaaa\n\nbbbb");
        assert_eq!(total, 3);
        assert!(text.len() <= 11);
    }

    #[test]
    fn empty_and_whitespace_snippets_are_ignored() {
        let details = vec![details_with(&["  ", "", "real review"])];
        let (text, total) = aggregate_review_text(&details, 100);
        assert_eq!(text, "real review");
        assert_eq!(total, 1);
    }

    #[test]
    fn count_exceeds_embedded_snippets_when_truncated() {
        let details = vec![details_with(&["one", "two", "three", "four"])];
        let (text, total) = aggregate_review_text(&details, 8);
        assert_eq!(text, "one\n\ntwo");
        assert_eq!(total, 4);
    }
}
