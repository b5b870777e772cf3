//! Loading of the input address table.
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::ColumnNames;
use crate::errors::AppError;
use crate::models::AddressRecord;

/// Ordered input records, in file order.
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    pub records: Vec<AddressRecord>,
}

impl AddressTable {
    pub fn load(path: &Path, columns: &ColumnNames) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::Configuration(format!("Failed to open input CSV '{}': {}", path.display(), e))
        })?;
        Self::from_reader(file, columns)
    }

    /// Parses a table from any reader. Fails before yielding any record when a
    /// required column is missing.
    pub fn from_reader<R: Read>(reader: R, columns: &ColumnNames) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| AppError::Configuration(format!("Failed to read CSV headers: {}", e)))?
            .clone();
        let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

        let required = |name: &str| {
            index.get(name).copied().ok_or_else(|| {
                AppError::Configuration(format!("Input CSV is missing required column '{}'", name))
            })
        };
        let store_idx = required(&columns.store_name)?;
        let address_idx = required(&columns.address)?;
        let lat_idx = index.get(columns.latitude.as_str()).copied();
        let lng_idx = index.get(columns.longitude.as_str()).copied();

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let line = result?;
            let cell = |idx: usize| line.get(idx).unwrap_or("").to_string();
            let coordinate = |idx: Option<usize>| idx.and_then(|i| parse_coordinate(line.get(i)));

            records.push(AddressRecord {
                row,
                store_name: cell(store_idx),
                address: cell(address_idx),
                latitude: coordinate(lat_idx),
                longitude: coordinate(lng_idx),
            });
        }

        tracing::info!("Loaded {} input records", records.len());
        Ok(Self { records })
    }

    pub fn load_coordinates(path: &Path, columns: &ColumnNames) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::Configuration(format!("Failed to open coordinate CSV '{}': {}", path.display(), e))
        })?;
        Self::coordinates_from_reader(file, columns)
    }

    /// Parses a latitude/longitude-only table. Both coordinate columns are
    /// required; store name and address stay empty.
    pub fn coordinates_from_reader<R: Read>(reader: R, columns: &ColumnNames) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| AppError::Configuration(format!("Failed to read CSV headers: {}", e)))?
            .clone();
        let position = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                AppError::Configuration(format!("Coordinate CSV is missing required column '{}'", name))
            })
        };
        let lat_idx = position(&columns.latitude)?;
        let lng_idx = position(&columns.longitude)?;

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let line = result?;
            records.push(AddressRecord {
                row,
                store_name: String::new(),
                address: String::new(),
                latitude: parse_coordinate(line.get(lat_idx)),
                longitude: parse_coordinate(line.get(lng_idx)),
            });
        }

        tracing::info!("Loaded {} coordinate rows", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Blank, unparsable and non-finite cells count as absent.
pub fn parse_coordinate(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
