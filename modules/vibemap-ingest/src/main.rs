use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_client::LlmClient;
use places_client::PlacesClient;
use vibemap_common::Config;
use vibemap_ingest::catalog::CatalogClient;
use vibemap_ingest::classifier::VibeClassifier;
use vibemap_ingest::ingest::{Ingestor, RunOptions};
use vibemap_ingest::retry::DEFAULT_RETRY;
use vibemap_ingest::store::PgStore;

/// Ingest points-of-interest data for an area into per-cell vibe scores.
#[derive(Parser, Debug)]
#[command(name = "vibemap-ingest")]
struct Args {
    /// Area slug to process (e.g. "minneapolis-downtown").
    #[arg(long)]
    area: String,

    /// Reprocess cells that already have a score.
    #[arg(long)]
    force: bool,

    /// Run the full read/compute path without writing to the store.
    #[arg(long)]
    dry_run: bool,

    /// Skip the first N cells of the area's ordering.
    #[arg(long)]
    offset: Option<usize>,

    /// Process at most N cells.
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(area = %args.area, "Vibemap ingest starting");

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    let catalog = CatalogClient::new(
        PlacesClient::new(config.places_api_key.clone()),
        config.places_rate,
        DEFAULT_RETRY,
    );
    let classifier = VibeClassifier::new(
        LlmClient::new(&config.anthropic_api_key, &config.classifier_model),
        config.llm_rate,
        DEFAULT_RETRY,
    );

    let options = RunOptions::builder()
        .area(args.area)
        .force(args.force)
        .dry_run(args.dry_run)
        .offset(args.offset)
        .limit(args.limit)
        .build();

    let ingestor = Ingestor::new(
        Arc::new(catalog),
        Arc::new(classifier),
        Arc::new(PgStore::new(pool)),
        options,
    );

    let (stats, log) = ingestor.run().await?;
    println!("{stats}");

    if !log.is_empty() {
        let path = log.save_artifact(std::path::Path::new(&config.artifact_dir))?;
        println!("Failure ledger: {}", path.display());
    }

    Ok(())
}
