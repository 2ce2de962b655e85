//! Per-run failure ledger. Failures never go to the primary store;
//! a non-empty ledger is written to a timestamped JSON artifact at the
//! end of the run so failed cells are discoverable, not silently lost.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use vibemap_common::FailureRecord;

#[derive(Debug)]
pub struct RunLog {
    pub run_id: Uuid,
    pub area: String,
    pub started_at: DateTime<Utc>,
    failures: Vec<FailureRecord>,
}

#[derive(Serialize)]
struct LedgerArtifact<'a> {
    run_id: Uuid,
    area: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    failures: &'a [FailureRecord],
}

impl RunLog {
    pub fn new(area: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            area: area.to_string(),
            started_at: Utc::now(),
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, cell_id: &str, error: &anyhow::Error) {
        self.failures.push(FailureRecord {
            cell_id: cell_id.to_string(),
            error: format!("{error:#}"),
            ts: Utc::now(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Write the ledger to `dir` as a timestamped JSON file and return
    /// its path. Callers skip this when the ledger is empty.
    pub fn save_artifact(&self, dir: &Path) -> Result<PathBuf> {
        let filename = format!(
            "vibemap-failures-{}-{}.json",
            self.area,
            self.started_at.format("%Y%m%dT%H%M%SZ")
        );
        let path = dir.join(filename);

        let artifact = LedgerArtifact {
            run_id: self.run_id,
            area: &self.area,
            started_at: self.started_at,
            finished_at: Utc::now(),
            failures: &self.failures,
        };

        let json = serde_json::to_string_pretty(&artifact).context("serializing ledger")?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing ledger to {}", path.display()))?;

        info!(path = %path.display(), failures = self.failures.len(), "Failure ledger saved");
        Ok(path)
    }
}
