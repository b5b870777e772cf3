//! Fetch building insights for a plain latitude/longitude CSV.
//!
//! Reads `COORDINATE_CSV` (columns `LATITUDE_COLUMN`/`LONGITUDE_COLUMN`),
//! archives every raw response as `response_<row>.json` and writes the
//! consolidated insights to `OUTPUT_JSON`.
use solar_insights_enrichment::config::Config;
use solar_insights_enrichment::enrichment::run_coordinates_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    solar_insights_enrichment::init_tracing();

    let config = Config::from_env()?;
    tracing::info!("=== Coordinate Batch ===");
    tracing::info!("Reading {}", config.coordinate_csv.display());

    let table = run_coordinates_from_config(&config).await?;
    table.summary.log();

    Ok(())
}
