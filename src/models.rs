use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Pipeline Records ============

/// One row of the input address table. `row` is the zero-based position in the
/// source file and is the record's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    pub row: usize,
    pub store_name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AddressRecord {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Key used to name archived responses for this record. Coordinate-only
    /// rows fall back to their row index.
    pub fn archive_key(&self) -> String {
        if self.store_name.is_empty() && self.address.is_empty() {
            format!("response_{}", self.row)
        } else {
            format!("{}_{}", self.store_name, self.address)
        }
    }
}

/// Confidence level the insights service attaches to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityTier {
    High,
    Medium,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::High => "HIGH",
            QualityTier::Medium => "MEDIUM",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingInsight {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub panel_count: i64,
    pub yearly_energy_kwh: f64,
    pub solar_area_m2: f64,
    pub quality_tier: QualityTier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: AddressRecord,
    pub insight: Option<BuildingInsight>,
    pub data_verification: bool,
    pub output_verification: bool,
}

impl EnrichedRecord {
    pub fn new(record: AddressRecord, insight: Option<BuildingInsight>) -> Self {
        Self {
            record,
            insight,
            data_verification: false,
            output_verification: false,
        }
    }
}

// ============ Geocoding API ============

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    pub geometry: GeocodeGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeGeometry {
    pub location: LatLng,
}

// ============ Solar Building Insights API ============

#[derive(Debug, Clone, Deserialize)]
pub struct SolarError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildingInsightsResponse {
    pub center: SolarLatLng,
    #[serde(rename = "solarPotential")]
    pub solar_potential: SolarPotential,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolarLatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolarPotential {
    #[serde(rename = "maxArrayAreaMeters2")]
    pub max_array_area_meters2: f64,
    #[serde(rename = "solarPanelConfigs", default)]
    pub solar_panel_configs: Vec<SolarPanelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolarPanelConfig {
    #[serde(rename = "panelsCount")]
    pub panels_count: i64,
    #[serde(rename = "yearlyEnergyDcKwh")]
    pub yearly_energy_dc_kwh: f64,
}

// ============ Deliverable Rows ============

/// Entry of the consolidated insights JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSummary {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub max_solar_count: i64,
    pub max_yearly_generation: f64,
    pub max_solar_array_size: f64,
}

impl From<&BuildingInsight> for InsightSummary {
    fn from(insight: &BuildingInsight) -> Self {
        Self {
            center_latitude: insight.center_latitude,
            center_longitude: insight.center_longitude,
            max_solar_count: insight.panel_count,
            max_yearly_generation: insight.yearly_energy_kwh,
            max_solar_array_size: insight.solar_area_m2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DataVerificationRow<'a> {
    #[serde(rename = "Store_Name")]
    pub store_name: &'a str,
    #[serde(rename = "Address")]
    pub address: &'a str,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub center_latitude: f64,
    pub center_longitude: f64,
    #[serde(rename = "DataVerificationFlag")]
    pub data_verification_flag: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputVerificationRow<'a> {
    #[serde(rename = "Store_Name")]
    pub store_name: &'a str,
    #[serde(rename = "Address")]
    pub address: &'a str,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub max_solar_count: i64,
    pub max_yearly_generation: f64,
    pub max_solar_array_size: f64,
    #[serde(rename = "OutputVerificationFlag")]
    pub output_verification_flag: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRow<'a> {
    #[serde(rename = "Store_Name")]
    pub store_name: &'a str,
    #[serde(rename = "Address")]
    pub address: &'a str,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub center_latitude: Option<f64>,
    pub center_longitude: Option<f64>,
    pub max_solar_count: Option<i64>,
    pub max_yearly_generation: Option<f64>,
    pub max_solar_array_size: Option<f64>,
    pub quality: Option<&'static str>,
    #[serde(rename = "DataVerificationFlag")]
    pub data_verification_flag: u8,
    #[serde(rename = "OutputVerificationFlag")]
    pub output_verification_flag: u8,
}
