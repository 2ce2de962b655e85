//! Orchestrator behavior against the trait-boundary mocks: failure
//! isolation, resume/force semantics, the top-K detail bound, dry-run,
//! and the null-score path for empty cells.

use std::sync::Arc;

use vibemap_ingest::ingest::{Ingestor, RunOptions};
use vibemap_ingest::testing::{cell, details, place, MockCatalog, MockCellStore, MockScorer};
use vibemap_ingest::traits::DimensionScores;
use vibemap_common::{VibeScoreSet, VIBE_DIMENSIONS};

const AREA: &str = "downtown";

fn scores(pairs: &[(&str, f64)]) -> DimensionScores {
    let mut scores: DimensionScores = VIBE_DIMENSIONS
        .iter()
        .map(|d| (d.to_string(), None))
        .collect();
    for (dim, value) in pairs {
        scores.insert(dim.to_string(), Some(*value));
    }
    scores
}

fn options(area: &str) -> RunOptions {
    RunOptions::builder().area(area.to_string()).build()
}

fn ingestor(
    catalog: Arc<MockCatalog>,
    scorer: Arc<MockScorer>,
    store: Arc<MockCellStore>,
    options: RunOptions,
) -> Ingestor {
    Ingestor::new(catalog, scorer, store, options)
}

#[tokio::test]
async fn cell_with_no_qualified_venues_gets_null_scores() {
    // One venue below the rating-count threshold: persisted as a venue,
    // but the cell's score set is all-null with zero provenance.
    let catalog = Arc::new(
        MockCatalog::new().on_search(10.0, 20.0, vec![place("v1", "Quiet Cafe", 4.8, 2)]),
    );
    let scorer = Arc::new(MockScorer::returning(scores(&[("lively", 0.9)])));
    let store = Arc::new(MockCellStore::new().with_area(AREA, vec![cell("c1", AREA, 10.0, 20.0)]));

    let (stats, log) = ingestor(catalog, scorer.clone(), store.clone(), options(AREA))
        .run()
        .await
        .expect("run");

    assert_eq!(stats.cells_succeeded, 1);
    assert!(log.is_empty());
    assert_eq!(store.venues().len(), 1);
    assert!(scorer.received().is_empty(), "classifier must not run");

    let set = store.score_for("c1").expect("score persisted");
    assert!(set.scores.values().all(|v| v.is_none()));
    assert_eq!(set.source_review_count, 0);
    assert_eq!(set.model, None);
}

#[tokio::test]
async fn scored_cell_carries_provenance_and_classifies_once() {
    let catalog = Arc::new(
        MockCatalog::new()
            .on_search(
                10.0,
                20.0,
                vec![place("v1", "Busy Bar", 4.2, 50), place("v2", "Diner", 3.9, 30)],
            )
            .on_details(details("v1", &["loud and fun", "great crowd"]))
            .on_details(details("v2", &["quiet booths"])),
    );
    let scorer = Arc::new(MockScorer::returning(scores(&[("lively", 0.8), ("cozy", 0.3)])));
    let store = Arc::new(MockCellStore::new().with_area(AREA, vec![cell("c1", AREA, 10.0, 20.0)]));

    let (stats, _) = ingestor(catalog.clone(), scorer.clone(), store.clone(), options(AREA))
        .run()
        .await
        .expect("run");

    assert_eq!(stats.classifier_calls, 1);
    let received = scorer.received();
    assert_eq!(received.len(), 1, "one classifier call per cell");
    // Review text follows rank order: v1 (count 50) before v2 (count 30).
    assert_eq!(received[0], "loud and fun\n\ngreat crowd\n\nquiet booths");

    let set = store.score_for("c1").expect("score persisted");
    assert_eq!(set.scores["lively"], Some(0.8));
    assert_eq!(set.scores["cozy"], Some(0.3));
    assert_eq!(set.source_review_count, 3);
    assert_eq!(set.model.as_deref(), Some("mock-model-1"));
}

#[tokio::test]
async fn failing_cell_lands_in_ledger_and_run_continues() {
    let catalog = Arc::new(
        MockCatalog::new()
            .failing_search(10.0, 20.0)
            .on_search(11.0, 20.0, vec![]),
    );
    let scorer = Arc::new(MockScorer::returning(scores(&[])));
    let store = Arc::new(MockCellStore::new().with_area(
        AREA,
        vec![cell("bad", AREA, 10.0, 20.0), cell("good", AREA, 11.0, 20.0)],
    ));

    let (stats, log) = ingestor(catalog, scorer, store.clone(), options(AREA))
        .run()
        .await
        .expect("run survives a failing cell");

    assert_eq!(stats.cells_processed, 2);
    assert_eq!(stats.cells_failed, 1);
    assert_eq!(stats.cells_succeeded, 1);

    assert_eq!(log.failures().len(), 1);
    assert_eq!(log.failures()[0].cell_id, "bad");
    assert!(log.failures()[0].error.contains("search failed"));

    // The failed cell has no score; the empty-but-healthy one does.
    assert!(store.score_for("bad").is_none());
    assert!(store.score_for("good").is_some());
}

#[tokio::test]
async fn already_scored_cells_are_skipped_unless_forced() {
    let existing = VibeScoreSet::empty("c1", chrono::Utc::now());

    let catalog = Arc::new(
        MockCatalog::new().on_search(10.0, 20.0, vec![place("v1", "Bar", 4.0, 40)]),
    );
    let scorer = Arc::new(MockScorer::returning(scores(&[("social", 0.7)])));
    let store = Arc::new(
        MockCellStore::new()
            .with_area(AREA, vec![cell("c1", AREA, 10.0, 20.0)])
            .with_score(existing),
    );

    // Non-forced run: the cell is subtracted before processing.
    let (stats, _) = ingestor(catalog.clone(), scorer.clone(), store.clone(), options(AREA))
        .run()
        .await
        .expect("run");
    assert_eq!(stats.cells_processed, 0);
    assert_eq!(stats.cells_skipped_scored, 1);
    assert_eq!(store.score_writes(), 0);

    // Forced run: reprocessed and replaced, still exactly one live set.
    let forced = RunOptions::builder().area(AREA.to_string()).force(true).build();
    let catalog = Arc::new(
        MockCatalog::new()
            .on_search(10.0, 20.0, vec![place("v1", "Bar", 4.0, 40)])
            .on_details(details("v1", &["good crowd"])),
    );
    let (stats, _) = ingestor(catalog, scorer, store.clone(), forced)
        .run()
        .await
        .expect("forced run");
    assert_eq!(stats.cells_processed, 1);
    assert_eq!(store.score_writes(), 1);
    let set = store.score_for("c1").expect("replaced score");
    assert_eq!(set.scores["social"], Some(0.7));
}

#[tokio::test]
async fn forced_reruns_are_idempotent() {
    let scorer = Arc::new(MockScorer::returning(scores(&[("artsy", 0.6)])));
    let store = Arc::new(MockCellStore::new().with_area(AREA, vec![cell("c1", AREA, 10.0, 20.0)]));
    let forced = RunOptions::builder().area(AREA.to_string()).force(true).build();

    let mut sets = Vec::new();
    for _ in 0..2 {
        let catalog = Arc::new(
            MockCatalog::new()
                .on_search(10.0, 20.0, vec![place("v1", "Gallery", 4.6, 25)])
                .on_details(details("v1", &["lovely exhibits"])),
        );
        ingestor(catalog, scorer.clone(), store.clone(), forced.clone())
            .run()
            .await
            .expect("run");
        sets.push(store.score_for("c1").expect("score"));
    }

    assert_eq!(sets[0].scores, sets[1].scores);
    assert_eq!(sets[0].source_review_count, sets[1].source_review_count);
    assert_eq!(sets[0].model, sets[1].model);
}

#[tokio::test]
async fn detail_fetches_are_bounded_to_top_ranked_venues() {
    // Seven qualified venues; only the five highest-volume ones get a
    // detail fetch, in rank order.
    let venues: Vec<_> = (0..7)
        .map(|i| place(&format!("v{i}"), &format!("Venue {i}"), 4.0, 10 + i as u32 * 10))
        .collect();
    let mut catalog = MockCatalog::new().on_search(10.0, 20.0, venues);
    for i in 0..7 {
        catalog = catalog.on_details(details(&format!("v{i}"), &["fine"]));
    }
    let catalog = Arc::new(catalog);
    let scorer = Arc::new(MockScorer::returning(scores(&[("lively", 0.5)])));
    let store = Arc::new(MockCellStore::new().with_area(AREA, vec![cell("c1", AREA, 10.0, 20.0)]));

    ingestor(catalog.clone(), scorer, store, options(AREA))
        .run()
        .await
        .expect("run");

    // Rank is by rating count descending: v6, v5, v4, v3, v2.
    assert_eq!(catalog.detail_fetches(), ["v6", "v5", "v4", "v3", "v2"]);
}

#[tokio::test]
async fn dry_run_exercises_the_cost_path_without_writes() {
    let catalog = Arc::new(
        MockCatalog::new()
            .on_search(10.0, 20.0, vec![place("v1", "Bar", 4.0, 40)])
            .on_details(details("v1", &["packed on weekends"])),
    );
    let scorer = Arc::new(MockScorer::returning(scores(&[("lively", 0.9)])));
    let store = Arc::new(MockCellStore::new().with_area(AREA, vec![cell("c1", AREA, 10.0, 20.0)]));
    let dry = RunOptions::builder().area(AREA.to_string()).dry_run(true).build();

    let (stats, _) = ingestor(catalog.clone(), scorer.clone(), store.clone(), dry)
        .run()
        .await
        .expect("run");

    // The external calls happened...
    assert_eq!(catalog.detail_fetches(), ["v1"]);
    assert_eq!(scorer.received().len(), 1);
    assert_eq!(stats.classifier_calls, 1);
    // ...but nothing was persisted.
    assert!(store.venues().is_empty());
    assert_eq!(store.score_writes(), 0);
}

#[tokio::test]
async fn offset_and_limit_select_a_window() {
    let cells: Vec<_> = (0..5)
        .map(|i| cell(&format!("c{i}"), AREA, 10.0 + i as f64, 20.0))
        .collect();
    let mut catalog = MockCatalog::new();
    for i in 0..5 {
        catalog = catalog.on_search(10.0 + i as f64, 20.0, vec![]);
    }
    let catalog = Arc::new(catalog);
    let scorer = Arc::new(MockScorer::returning(scores(&[])));
    let store = Arc::new(MockCellStore::new().with_area(AREA, cells));

    let windowed = RunOptions::builder()
        .area(AREA.to_string())
        .offset(Some(1))
        .limit(Some(2))
        .build();
    let (stats, _) = ingestor(catalog, scorer, store.clone(), windowed)
        .run()
        .await
        .expect("run");

    assert_eq!(stats.cells_processed, 2);
    assert!(store.score_for("c0").is_none());
    assert!(store.score_for("c1").is_some());
    assert!(store.score_for("c2").is_some());
    assert!(store.score_for("c3").is_none());
}

#[tokio::test]
async fn shared_venue_details_are_fetched_once_across_cells() {
    // The same venue is nearest to c1 but inside c2's radius too; its
    // detail record must cost one fetch for the whole run.
    let shared = place("shared", "Corner Bar", 4.1, 60);
    let catalog = Arc::new(
        MockCatalog::new()
            .on_search(10.0, 20.0, vec![shared.clone()])
            .on_search(10.01, 20.0, vec![shared])
            .on_details(details("shared", &["neighborhood staple"])),
    );
    let scorer = Arc::new(MockScorer::returning(scores(&[("social", 0.6)])));
    let store = Arc::new(MockCellStore::new().with_area(
        AREA,
        vec![cell("c1", AREA, 10.0, 20.0), cell("c2", AREA, 10.01, 20.0)],
    ));

    let (stats, _) = ingestor(catalog.clone(), scorer, store, options(AREA))
        .run()
        .await
        .expect("run");

    assert_eq!(catalog.detail_fetches(), ["shared"]);
    assert_eq!(stats.detail_cache_hits, 1);
    assert_eq!(stats.detail_cache_misses, 1);
}

#[tokio::test]
async fn unknown_area_is_fatal() {
    let catalog = Arc::new(MockCatalog::new());
    let scorer = Arc::new(MockScorer::returning(scores(&[])));
    let store = Arc::new(MockCellStore::new());

    let err = ingestor(catalog, scorer, store, options("nowhere"))
        .run()
        .await
        .expect_err("unknown area must abort");
    assert!(err.to_string().contains("nowhere"));
}
