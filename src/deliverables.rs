use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::OutputPaths;
use crate::errors::{AppError, ResultExt};
use crate::models::*;

pub const DATA_VERIFICATION_HEADER: &[&str] = &[
    "Store_Name",
    "Address",
    "lat",
    "lng",
    "center_latitude",
    "center_longitude",
    "DataVerificationFlag",
];

pub const OUTPUT_VERIFICATION_HEADER: &[&str] = &[
    "Store_Name",
    "Address",
    "lat",
    "lng",
    "max_solar_count",
    "max_yearly_generation",
    "max_solar_array_size",
    "OutputVerificationFlag",
];

pub const ENRICHED_HEADER: &[&str] = &[
    "Store_Name",
    "Address",
    "lat",
    "lng",
    "center_latitude",
    "center_longitude",
    "max_solar_count",
    "max_yearly_generation",
    "max_solar_array_size",
    "quality",
    "DataVerificationFlag",
    "OutputVerificationFlag",
];

/// What was written and where.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverableReport {
    pub data_verification_rows: usize,
    pub output_verification_rows: usize,
    pub insight_entries: usize,
    pub enriched_rows: Option<usize>,
    pub written: Vec<PathBuf>,
}

/// Projects enriched records into the two flag views.
pub fn data_verification_rows(flagged: &[EnrichedRecord]) -> Vec<DataVerificationRow<'_>> {
    flagged
        .iter()
        .filter_map(|r| {
            let insight = r.insight.as_ref()?;
            Some(DataVerificationRow {
                store_name: &r.record.store_name,
                address: &r.record.address,
                lat: r.record.latitude,
                lng: r.record.longitude,
                center_latitude: insight.center_latitude,
                center_longitude: insight.center_longitude,
                data_verification_flag: u8::from(r.data_verification),
            })
        })
        .collect()
}

pub fn output_verification_rows(flagged: &[EnrichedRecord]) -> Vec<OutputVerificationRow<'_>> {
    flagged
        .iter()
        .filter_map(|r| {
            let insight = r.insight.as_ref()?;
            Some(OutputVerificationRow {
                store_name: &r.record.store_name,
                address: &r.record.address,
                lat: r.record.latitude,
                lng: r.record.longitude,
                max_solar_count: insight.panel_count,
                max_yearly_generation: insight.yearly_energy_kwh,
                max_solar_array_size: insight.solar_area_m2,
                output_verification_flag: u8::from(r.output_verification),
            })
        })
        .collect()
}

/// Every record that received an insight, in input order.
pub fn insight_summaries(records: &[EnrichedRecord]) -> Vec<InsightSummary> {
    records
        .iter()
        .filter_map(|r| r.insight.as_ref().map(InsightSummary::from))
        .collect()
}

pub fn enriched_rows(records: &[EnrichedRecord]) -> Vec<EnrichedRow<'_>> {
    records
        .iter()
        .map(|r| {
            let insight = r.insight.as_ref();
            EnrichedRow {
                store_name: &r.record.store_name,
                address: &r.record.address,
                lat: r.record.latitude,
                lng: r.record.longitude,
                center_latitude: insight.map(|i| i.center_latitude),
                center_longitude: insight.map(|i| i.center_longitude),
                max_solar_count: insight.map(|i| i.panel_count),
                max_yearly_generation: insight.map(|i| i.yearly_energy_kwh),
                max_solar_array_size: insight.map(|i| i.solar_area_m2),
                quality: insight.map(|i| i.quality_tier.as_str()),
                data_verification_flag: u8::from(r.data_verification),
                output_verification_flag: u8::from(r.output_verification),
            }
        })
        .collect()
}

/// Writes both deliverables and the insights JSON.
///
/// `all` is every processed record in input order; `flagged` is the filtered,
/// flagged subset. The enriched table, when configured, carries flags for rows
/// present in `flagged` and zeros otherwise.
///
/// Every file is first written to a temporary beside its target. Targets are
/// only replaced once all of them were written, so a failed write leaves the
/// previous outputs untouched.
pub fn write(
    all: &[EnrichedRecord],
    flagged: &[EnrichedRecord],
    outputs: &OutputPaths,
) -> Result<DeliverableReport, AppError> {
    let mut staged = Staged::default();

    let data_rows = data_verification_rows(flagged);
    staged.csv(&outputs.data_verification_csv, DATA_VERIFICATION_HEADER, &data_rows)?;

    let output_rows = output_verification_rows(flagged);
    staged.csv(&outputs.output_verification_csv, OUTPUT_VERIFICATION_HEADER, &output_rows)?;

    let summaries = insight_summaries(all);
    staged.json(&outputs.insights_json, &summaries)?;

    let enriched_count = match &outputs.enriched_csv {
        Some(path) => {
            let merged = merge_flags(all, flagged);
            let rows = enriched_rows(&merged);
            staged.csv(path, ENRICHED_HEADER, &rows)?;
            Some(rows.len())
        }
        None => None,
    };

    let written = staged.commit()?;
    for path in &written {
        tracing::info!("Wrote {}", path.display());
    }

    Ok(DeliverableReport {
        data_verification_rows: data_rows.len(),
        output_verification_rows: output_rows.len(),
        insight_entries: summaries.len(),
        enriched_rows: enriched_count,
        written,
    })
}

fn merge_flags(all: &[EnrichedRecord], flagged: &[EnrichedRecord]) -> Vec<EnrichedRecord> {
    let by_row: HashMap<usize, &EnrichedRecord> = flagged.iter().map(|f| (f.record.row, f)).collect();
    all.iter()
        .map(|r| by_row.get(&r.record.row).map_or_else(|| r.clone(), |f| (*f).clone()))
        .collect()
}

/// Outputs written to temporaries, waiting to be renamed onto their targets.
/// Dropping it without `commit` removes the temporaries.
#[derive(Default)]
struct Staged {
    files: Vec<(NamedTempFile, PathBuf)>,
}

impl Staged {
    fn csv<T: Serialize>(&mut self, path: &Path, header: &[&str], rows: &[T]) -> Result<(), AppError> {
        let mut tmp = temp_beside(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        writer
            .write_record(header)
            .map_err(AppError::from)
            .with_context(|| format!("Failed to write header to {}", path.display()))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(AppError::from)
                .with_context(|| format!("Failed to write row to {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        drop(writer);
        self.files.push((tmp, path.to_path_buf()));
        Ok(())
    }

    fn json<T: Serialize>(&mut self, path: &Path, value: &T) -> Result<(), AppError> {
        let mut tmp = temp_beside(path)?;
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(AppError::from)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        drop(writer);
        self.files.push((tmp, path.to_path_buf()));
        Ok(())
    }

    fn commit(self) -> Result<Vec<PathBuf>, AppError> {
        let mut written = Vec::with_capacity(self.files.len());
        for (tmp, path) in self.files {
            tmp.persist(&path)
                .map_err(|e| e.error)
                .with_context(|| format!("Failed to move output into place at {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }
}

fn temp_beside(path: &Path) -> Result<NamedTempFile, AppError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
            parent
        }
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).with_context(|| format!("Failed to create temporary file for {}", path.display()))
}

/// Writes `header` followed by one line per row, so empty deliverables still
/// carry their column names.
pub fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), AppError> {
    let mut staged = Staged::default();
    staged.csv(path, header, rows)?;
    staged.commit().map(|_| ())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let mut staged = Staged::default();
    staged.json(path, value)?;
    staged.commit().map(|_| ())
}
