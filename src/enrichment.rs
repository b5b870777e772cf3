//! Per-row enrichment pipeline shared by the binaries
//!
//! Each record goes through, in order:
//! 1. Geocode the address when the input has no coordinates
//! 2. Fetch building insights (HIGH, then MEDIUM on NOT_FOUND)
//! 3. Archive the raw response
//! 4. Filter and flag
//! 5. Write deliverables
use chrono::{DateTime, Utc};

use crate::address_table::AddressTable;
use crate::archive::ResponseArchiver;
use crate::config::Config;
use crate::deliverables::{self, DeliverableReport};
use crate::errors::AppError;
use crate::flagging::{self, Thresholds};
use crate::models::{AddressRecord, BuildingInsight, EnrichedRecord, QualityTier};
use crate::services::{FetchOutcome, GeocodingService, SolarInsightsService};

/// Counters for one run, reported at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub high_quality: usize,
    pub medium_quality: usize,
    pub not_found: usize,
    /// Network, decode and non-NOT_FOUND service errors.
    pub failed: usize,
    pub geocoded: usize,
    pub geocode_failures: usize,
    /// Records that never got coordinates and were not queried.
    pub missing_coordinates: usize,
    pub archived: usize,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            total: 0,
            high_quality: 0,
            medium_quality: 0,
            not_found: 0,
            failed: 0,
            geocoded: 0,
            geocode_failures: 0,
            missing_coordinates: 0,
            archived: 0,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn elapsed_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn record_fetch(&mut self, outcome: &Result<BuildingInsight, AppError>) {
        match outcome {
            Ok(insight) if insight.quality_tier == QualityTier::High => self.high_quality += 1,
            Ok(_) => self.medium_quality += 1,
            Err(e) if e.is_not_found() => self.not_found += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn log(&self) {
        tracing::info!("Total execution time: {:.2} seconds", self.elapsed_seconds());
        tracing::info!("Total queries: {}", self.total);
        tracing::info!("High quality queries: {}", self.high_quality);
        tracing::info!("Medium quality queries: {}", self.medium_quality);
        tracing::info!("No response: {}", self.not_found);
        if self.failed > 0 {
            tracing::warn!("Failed queries: {}", self.failed);
        }
        if self.geocoded + self.geocode_failures > 0 {
            tracing::info!(
                "Geocoded: {} (failures: {})",
                self.geocoded,
                self.geocode_failures
            );
        }
        if self.missing_coordinates > 0 {
            tracing::warn!("Records without coordinates: {}", self.missing_coordinates);
        }
    }
}

/// Records produced by one pass over the table.
#[derive(Debug)]
pub struct EnrichedTable {
    /// Every input record, in input order.
    pub records: Vec<EnrichedRecord>,
    /// Records that passed the panel filter, with flags set.
    pub flagged: Vec<EnrichedRecord>,
    pub summary: RunSummary,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutput {
    pub table: EnrichedTable,
    pub report: DeliverableReport,
}

pub struct Pipeline<'a> {
    geocoder: &'a GeocodingService,
    insights: &'a SolarInsightsService,
    archiver: Option<&'a ResponseArchiver>,
    thresholds: Thresholds,
    request_delay: std::time::Duration,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        geocoder: &'a GeocodingService,
        insights: &'a SolarInsightsService,
        archiver: Option<&'a ResponseArchiver>,
        config: &Config,
    ) -> Self {
        Self {
            geocoder,
            insights,
            archiver,
            thresholds: config.thresholds,
            request_delay: config.request_delay,
        }
    }

    /// Fill in missing coordinates. Failures leave them unset.
    pub async fn locate(&self, mut record: AddressRecord, summary: &mut RunSummary) -> AddressRecord {
        if record.coordinates().is_some() {
            return record;
        }
        if record.address.trim().is_empty() {
            tracing::warn!(
                "Row {} ({}) has neither coordinates nor an address",
                record.row,
                record.store_name
            );
            return record;
        }

        match self.geocoder.geocode(&record.address).await {
            Ok(location) => {
                summary.geocoded += 1;
                record.latitude = Some(location.lat);
                record.longitude = Some(location.lng);
            }
            Err(e) => {
                summary.geocode_failures += 1;
                tracing::warn!("Geocoding failed for row {} ({}): {}", record.row, record.address, e);
            }
        }
        record
    }

    /// Enrich a single record. Only fatal archive failures are returned.
    pub async fn enrich(&self, record: AddressRecord, summary: &mut RunSummary) -> Result<EnrichedRecord, AppError> {
        summary.total += 1;
        let record = self.locate(record, summary).await;

        let Some((lat, lng)) = record.coordinates() else {
            summary.missing_coordinates += 1;
            return Ok(EnrichedRecord::new(record, None));
        };

        let FetchOutcome { raw, result } = self.insights.fetch(lat, lng).await;

        if let (Some(archiver), Some(raw)) = (self.archiver, raw.as_ref()) {
            match archiver.archive(&record.archive_key(), raw) {
                Ok(_) => summary.archived += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!("Row {}: response not archived: {}", record.row, e),
            }
        }

        summary.record_fetch(&result);

        let insight = match result {
            Ok(insight) => Some(insight),
            Err(e) => {
                tracing::warn!("Row {} ({}): {}", record.row, record.store_name, e);
                None
            }
        };
        Ok(EnrichedRecord::new(record, insight))
    }

    /// Enrich the whole table in order, then filter and flag.
    pub async fn run(&self, table: AddressTable) -> Result<EnrichedTable, AppError> {
        let mut summary = RunSummary::start();
        let total = table.len();
        let mut records = Vec::with_capacity(total);

        for (idx, record) in table.records.into_iter().enumerate() {
            tracing::info!("[{}/{}] Processing {}", idx + 1, total, record.store_name);
            records.push(self.enrich(record, &mut summary).await?);

            if !self.request_delay.is_zero() && idx + 1 < total {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        let flagged = flagging::flag_all(flagging::retain_flaggable(&records), &self.thresholds);
        summary.finish();
        Ok(EnrichedTable {
            records,
            flagged,
            summary,
        })
    }
}

/// Load, enrich, flag and write, using the services built from `config`.
pub async fn run_from_config(config: &Config) -> Result<RunOutput, AppError> {
    let table = AddressTable::load(&config.input_csv, &config.columns)?;

    let geocoder = GeocodingService::new(config)?;
    let insights = SolarInsightsService::new(config)?;
    let archiver = if config.save_origin_response {
        Some(ResponseArchiver::new(&config.origin_response_dir)?)
    } else {
        None
    };

    let pipeline = Pipeline::new(&geocoder, &insights, archiver.as_ref(), config);
    let table = pipeline.run(table).await?;
    let report = deliverables::write(&table.records, &table.flagged, &config.outputs)?;

    Ok(RunOutput { table, report })
}

/// Coordinate-only variant: no geocoding, no flag deliverables, just the
/// insights JSON and the archived responses.
pub async fn run_coordinates_from_config(config: &Config) -> Result<EnrichedTable, AppError> {
    let table = AddressTable::load_coordinates(&config.coordinate_csv, &config.columns)?;

    let geocoder = GeocodingService::new(config)?;
    let insights = SolarInsightsService::new(config)?;
    let archiver = if config.save_origin_response {
        Some(ResponseArchiver::new(&config.origin_response_dir)?)
    } else {
        None
    };

    let pipeline = Pipeline::new(&geocoder, &insights, archiver.as_ref(), config);
    let table = pipeline.run(table).await?;
    deliverables::write_json(
        &config.outputs.insights_json,
        &deliverables::insight_summaries(&table.records),
    )?;
    tracing::info!("Wrote {}", config.outputs.insights_json.display());

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insight(tier: QualityTier) -> BuildingInsight {
        BuildingInsight {
            center_latitude: 0.0,
            center_longitude: 0.0,
            panel_count: 12,
            yearly_energy_kwh: 5000.0,
            solar_area_m2: 30.0,
            quality_tier: tier,
        }
    }

    #[test]
    fn counts_by_outcome() {
        let mut summary = RunSummary::start();
        summary.record_fetch(&Ok(insight(QualityTier::High)));
        summary.record_fetch(&Ok(insight(QualityTier::Medium)));
        summary.record_fetch(&Ok(insight(QualityTier::Medium)));
        summary.record_fetch(&Err(AppError::NotFound("x".into())));
        summary.record_fetch(&Err(AppError::RequestFailed("x".into())));
        assert_eq!(summary.high_quality, 1);
        assert_eq!(summary.medium_quality, 2);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn elapsed_is_non_negative() {
        let mut summary = RunSummary::start();
        summary.finish();
        assert!(summary.elapsed_seconds() >= 0.0);
    }
}
