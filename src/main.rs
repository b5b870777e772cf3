use solar_insights_enrichment::config::Config;
use solar_insights_enrichment::enrichment::run_from_config;

/// Main entry point for the application.
///
/// Loads configuration, enriches every row of the input table and writes the
/// deliverables. Per-record failures are logged and counted; configuration and
/// write failures abort the run.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    solar_insights_enrichment::init_tracing();

    let config = Config::from_env()?;

    let output = match run_from_config(&config).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!("Run aborted: {}", e);
            return Err(e.into());
        }
    };

    output.table.summary.log();
    tracing::info!(
        "Deliverables: {} data verification rows, {} output verification rows, {} insights",
        output.report.data_verification_rows,
        output.report.output_verification_rows,
        output.report.insight_entries
    );

    Ok(())
}
