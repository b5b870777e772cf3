use std::path::PathBuf;
use std::time::Duration;

use crate::flagging::Thresholds;

pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://maps.googleapis.com";
pub const DEFAULT_SOLAR_BASE_URL: &str = "https://solar.googleapis.com";

/// Names of the input table columns.
#[derive(Debug, Clone)]
pub struct ColumnNames {
    pub store_name: String,
    pub address: String,
    pub latitude: String,
    pub longitude: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            store_name: "Store_Name".to_string(),
            address: "Address".to_string(),
            latitude: "lat".to_string(),
            longitude: "lng".to_string(),
        }
    }
}

/// Where the run writes its results.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub data_verification_csv: PathBuf,
    pub output_verification_csv: PathBuf,
    pub insights_json: PathBuf,
    /// Every input row with whatever enrichment it received.
    pub enriched_csv: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub input_csv: PathBuf,
    pub coordinate_csv: PathBuf,
    pub columns: ColumnNames,
    pub outputs: OutputPaths,
    pub save_origin_response: bool,
    pub origin_response_dir: PathBuf,
    pub thresholds: Thresholds,
    pub geocoding_base_url: String,
    pub solar_base_url: String,
    pub request_timeout: Duration,
    pub request_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values behave like unset ones.
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let path_or = |key: &str, default: &str| PathBuf::from(get(key).unwrap_or_else(|| default.to_string()));
        let column_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let api_key = get("SOLAR_API_KEY")
            .or_else(|| get("API_KEY"))
            .ok_or_else(|| anyhow::anyhow!("SOLAR_API_KEY environment variable required"))?;

        let defaults = ColumnNames::default();
        let columns = ColumnNames {
            store_name: column_or("STORE_NAME_COLUMN", &defaults.store_name),
            address: column_or("ADDRESS_COLUMN", &defaults.address),
            latitude: column_or("LATITUDE_COLUMN", &defaults.latitude),
            longitude: column_or("LONGITUDE_COLUMN", &defaults.longitude),
        };

        let outputs = OutputPaths {
            data_verification_csv: path_or("OUTPUT_DATA_VERIFICATION_CSV", "deliverable1.csv"),
            output_verification_csv: path_or("OUTPUT_OUTPUT_VERIFICATION_CSV", "deliverable2.csv"),
            insights_json: path_or("OUTPUT_JSON", "output.json"),
            enriched_csv: get("OUTPUT_ENRICHED_CSV").map(PathBuf::from),
        };

        let save_origin_response = match get("SAVE_ORIGIN_RESPONSE") {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                anyhow::anyhow!("SAVE_ORIGIN_RESPONSE must be true/false, got '{}'", raw)
            })?,
        };

        let coord_tolerance: f64 = parse_or(&get, "LAT_LNG_THRESHOLD", 0.0005)?;
        if !coord_tolerance.is_finite() || coord_tolerance < 0.0 {
            anyhow::bail!("LAT_LNG_THRESHOLD must be a non-negative number");
        }
        let min_panels: i64 = parse_or(&get, "MIN_PANELS", 10)?;
        let max_panels: i64 = parse_or(&get, "MAX_PANELS", 2000)?;
        if max_panels < min_panels {
            anyhow::bail!(
                "MAX_PANELS ({}) must not be below MIN_PANELS ({})",
                max_panels,
                min_panels
            );
        }

        let request_timeout_secs: u64 = parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?;
        if request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be at least 1");
        }

        let geocoding_base_url = base_url(
            get("GEOCODING_BASE_URL"),
            DEFAULT_GEOCODING_BASE_URL,
            "GEOCODING_BASE_URL",
        )?;
        let solar_base_url = base_url(get("SOLAR_BASE_URL"), DEFAULT_SOLAR_BASE_URL, "SOLAR_BASE_URL")?;

        let config = Self {
            api_key,
            input_csv: path_or("INPUT_CSV", "addr_lat_lng.csv"),
            coordinate_csv: path_or("COORDINATE_CSV", "coor.csv"),
            columns,
            outputs,
            save_origin_response,
            origin_response_dir: path_or("ORIGIN_RESPONSE_DIR", "original_response"),
            thresholds: Thresholds {
                coord_tolerance,
                min_panels,
                max_panels,
            },
            geocoding_base_url,
            solar_base_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            request_delay: Duration::from_millis(parse_or(&get, "REQUEST_DELAY_MS", 0)?),
        };

        // Log successful configuration load (without the API key)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Input CSV: {}", config.input_csv.display());
        tracing::debug!("Geocoding Base URL: {}", config.geocoding_base_url);
        tracing::debug!("Solar Base URL: {}", config.solar_base_url);
        tracing::debug!(
            "Thresholds: tolerance={} panels=[{}, {}]",
            config.thresholds.coord_tolerance,
            config.thresholds.min_panels,
            config.thresholds.max_panels
        );
        if config.save_origin_response {
            tracing::debug!(
                "Raw responses archived under {}",
                config.origin_response_dir.display()
            );
        }

        Ok(config)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got '{}'", key, raw)),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn base_url(value: Option<String>, default: &str, key: &str) -> anyhow::Result<String> {
    let raw = value.unwrap_or_else(|| default.to_string());
    let parsed = url::Url::parse(&raw).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", key, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", key);
    }
    Ok(raw.trim_end_matches('/').to_string())
}
