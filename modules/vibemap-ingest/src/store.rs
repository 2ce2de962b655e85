//! Postgres-backed `CellStore`. The schema (cells, venues, cell_scores)
//! is provisioned by the geometry/migration tooling; this module only
//! issues the four narrow queries the pipeline needs.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use vibemap_common::{GeoCell, VenueRecord, VibeScoreSet};

use crate::traits::CellStore;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CellStore for PgStore {
    async fn cells_for_area(&self, area_id: &str) -> Result<Vec<GeoCell>> {
        // row/col ordering is the deterministic geographic order the
        // resume offset relies on.
        let rows = sqlx::query(
            r#"
            SELECT id, area_id, center_lat, center_lng
            FROM cells
            WHERE area_id = $1
            ORDER BY row_idx, col_idx
            "#,
        )
        .bind(area_id)
        .fetch_all(&self.pool)
        .await
        .context("loading cells for area")?;

        Ok(rows
            .into_iter()
            .map(|row| GeoCell {
                id: row.get("id"),
                area_id: row.get("area_id"),
                center_lat: row.get("center_lat"),
                center_lng: row.get("center_lng"),
            })
            .collect())
    }

    async fn scored_cell_ids(&self, cell_ids: &[String]) -> Result<HashSet<String>> {
        let rows = sqlx::query(
            r#"
            SELECT cell_id FROM cell_scores WHERE cell_id = ANY($1)
            "#,
        )
        .bind(cell_ids)
        .fetch_all(&self.pool)
        .await
        .context("listing scored cells")?;

        Ok(rows.into_iter().map(|row| row.get("cell_id")).collect())
    }

    async fn upsert_venues(&self, records: &[VenueRecord]) -> Result<()> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO venues
                    (place_id, cell_id, name, primary_category, rating, rating_count, lat, lng)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (place_id) DO UPDATE SET
                    cell_id = EXCLUDED.cell_id,
                    name = EXCLUDED.name,
                    primary_category = EXCLUDED.primary_category,
                    rating = EXCLUDED.rating,
                    rating_count = EXCLUDED.rating_count,
                    lat = EXCLUDED.lat,
                    lng = EXCLUDED.lng
                "#,
            )
            .bind(&record.place_id)
            .bind(&record.cell_id)
            .bind(&record.name)
            .bind(&record.primary_category)
            .bind(record.rating)
            .bind(record.rating_count.map(|c| c as i64))
            .bind(record.lat)
            .bind(record.lng)
            .execute(&self.pool)
            .await
            .with_context(|| format!("upserting venue {}", record.place_id))?;
        }
        Ok(())
    }

    async fn replace_cell_scores(&self, scores: &VibeScoreSet) -> Result<()> {
        // Delete-then-insert inside one transaction keeps the "at most
        // one live score set per cell" invariant across re-runs.
        let mut tx = self.pool.begin().await.context("opening transaction")?;

        sqlx::query("DELETE FROM cell_scores WHERE cell_id = $1")
            .bind(&scores.cell_id)
            .execute(&mut *tx)
            .await
            .context("invalidating prior scores")?;

        let scores_json =
            serde_json::to_value(&scores.scores).context("serializing dimension scores")?;

        sqlx::query(
            r#"
            INSERT INTO cell_scores
                (cell_id, scores, source_review_count, model, dimensions_version, computed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&scores.cell_id)
        .bind(scores_json)
        .bind(scores.source_review_count as i64)
        .bind(&scores.model)
        .bind(&scores.dimensions_version)
        .bind(scores.computed_at)
        .execute(&mut *tx)
        .await
        .context("inserting scores")?;

        tx.commit().await.context("committing score replacement")?;
        Ok(())
    }
}
