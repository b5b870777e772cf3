//! Solar Insights Enrichment Library
//!
//! This library enriches a table of store addresses with building solar
//! potential, flags suspicious results and writes the deliverables.
//!
//! # Modules
//!
//! - `address_table`: Input CSV loading.
//! - `archive`: Raw response archiving.
//! - `config`: Configuration management.
//! - `deliverables`: Output CSV/JSON writers.
//! - `enrichment`: Per-record pipeline and run summary.
//! - `errors`: Error handling types.
//! - `flagging`: Data and output verification flags.
//! - `models`: Records and API payload models.
//! - `services`: Geocoding and Solar API clients.

pub mod address_table;
pub mod archive;
pub mod config;
pub mod deliverables;
pub mod enrichment;
pub mod errors;
pub mod flagging;
pub mod models;
pub mod services;

/// Installs the fmt subscriber used by every binary.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solar_insights_enrichment=info,batch_coordinates=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
