use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use reqwest::Client;
use serde_json::Value;

fn build_client(config: &Config) -> Result<Client, AppError> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| AppError::RequestFailed(format!("Failed to create HTTP client: {}", e)))
}

// ============ Geocoding API Integration ============

pub struct GeocodingService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeocodingService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.geocoding_base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Resolve a free-text address to the coordinates of the first candidate.
    pub async fn geocode(&self, address: &str) -> Result<LatLng, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/maps/api/geocode/json", self.base_url),
            &[("address", address), ("key", self.api_key.as_str())],
        )
        .map_err(|e| AppError::RequestFailed(format!("Failed to build URL: {}", e)))?;

        tracing::debug!("Geocoding URL: {}/maps/api/geocode/json?address={}&key=[REDACTED]", self.base_url, address);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::RequestFailed(format!("Geocoding request failed: {}", e)))?;

        let status = response.status();
        let body: GeocodeResponse = response.json().await.map_err(|e| {
            AppError::RequestFailed(format!(
                "Failed to parse geocoding response (HTTP {}): {}",
                status, e
            ))
        })?;

        if body.status != "OK" {
            let detail = body.error_message.unwrap_or_default();
            return Err(AppError::NotFound(format!(
                "Geocoding returned {} for '{}' {}",
                body.status, address, detail
            )
            .trim_end()
            .to_string()));
        }

        body.results
            .first()
            .map(|candidate| candidate.geometry.location)
            .ok_or_else(|| AppError::NotFound(format!("No geocoding results for '{}'", address)))
    }
}

// ============ Solar Building Insights Integration ============

/// Raw body of the final attempt plus what came of it. `raw` is `None` only
/// when no body was received at all.
#[derive(Debug)]
pub struct FetchOutcome {
    pub raw: Option<Value>,
    pub result: Result<BuildingInsight, AppError>,
}

enum AttemptOutcome {
    Found(BuildingInsight),
    /// The service answered with an error status.
    ServiceError(SolarError),
    /// Anything unexpected, network or decode.
    Failed(AppError),
}

pub struct SolarInsightsService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SolarInsightsService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.solar_base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Find the closest building, trying HIGH quality first and MEDIUM once
    /// when HIGH reports NOT_FOUND.
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> FetchOutcome {
        let mut tier = QualityTier::High;
        loop {
            let (raw, outcome) = self.attempt(latitude, longitude, tier).await;
            let result = match (tier, outcome) {
                (_, AttemptOutcome::Found(insight)) => Ok(insight),
                (QualityTier::High, AttemptOutcome::ServiceError(err)) if err.status == "NOT_FOUND" => {
                    tracing::debug!(
                        "No HIGH quality insight for ({}, {}), retrying at MEDIUM",
                        latitude,
                        longitude
                    );
                    tier = QualityTier::Medium;
                    continue;
                }
                (QualityTier::High, AttemptOutcome::ServiceError(err)) => {
                    Err(AppError::ExternalApiError(format!("{}: {}", err.status, err.message)))
                }
                (QualityTier::Medium, AttemptOutcome::ServiceError(err)) => Err(AppError::NotFound(
                    format!("No HIGH or MEDIUM quality insight: {}", err.message),
                )),
                (_, AttemptOutcome::Failed(err)) => Err(err),
            };
            let result = result.with_context(|| {
                format!("Building insights for ({}, {}) at {}", latitude, longitude, tier)
            });
            return FetchOutcome { raw, result };
        }
    }

    async fn attempt(
        &self,
        latitude: f64,
        longitude: f64,
        tier: QualityTier,
    ) -> (Option<Value>, AttemptOutcome) {
        let raw = match self.request(latitude, longitude, tier).await {
            Ok(raw) => raw,
            Err(e) => return (None, AttemptOutcome::Failed(e)),
        };

        let outcome = if let Some(error) = raw.get("error") {
            match serde_json::from_value::<SolarError>(error.clone()) {
                Ok(err) => AttemptOutcome::ServiceError(err),
                Err(e) => AttemptOutcome::Failed(AppError::RequestFailed(format!(
                    "Malformed error object: {}",
                    e
                ))),
            }
        } else {
            match extract_insight(&raw, tier) {
                Ok(insight) => AttemptOutcome::Found(insight),
                Err(e) => AttemptOutcome::Failed(e),
            }
        };
        (Some(raw), outcome)
    }

    async fn request(&self, latitude: f64, longitude: f64, tier: QualityTier) -> Result<Value, AppError> {
        let lat = latitude.to_string();
        let lng = longitude.to_string();
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v1/buildingInsights:findClosest", self.base_url),
            &[
                ("location.latitude", lat.as_str()),
                ("location.longitude", lng.as_str()),
                ("requiredQuality", tier.as_str()),
                ("key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| AppError::RequestFailed(format!("Failed to build URL: {}", e)))?;

        tracing::debug!(
            "Solar URL: {}/v1/buildingInsights:findClosest?location.latitude={}&location.longitude={}&requiredQuality={}&key=[REDACTED]",
            self.base_url,
            lat,
            lng,
            tier
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::RequestFailed(format!("Solar API request failed: {}", e)))?;

        // Error statuses carry a JSON error object, so the body is decoded either way.
        let status = response.status();
        response.json::<Value>().await.map_err(|e| {
            AppError::RequestFailed(format!("Failed to parse Solar API response (HTTP {}): {}", status, e))
        })
    }
}

/// Pull the maximum panel configuration out of a successful response. The
/// configurations arrive sorted ascending by panel count, so the last one wins.
pub fn extract_insight(raw: &Value, tier: QualityTier) -> Result<BuildingInsight, AppError> {
    let parsed: BuildingInsightsResponse = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::RequestFailed(format!("Unexpected building insights payload: {}", e)))?;

    let best = parsed
        .solar_potential
        .solar_panel_configs
        .last()
        .ok_or_else(|| AppError::RequestFailed("Response has no solar panel configurations".to_string()))?;

    Ok(BuildingInsight {
        center_latitude: parsed.center.latitude,
        center_longitude: parsed.center.longitude,
        panel_count: best.panels_count,
        yearly_energy_kwh: best.yearly_energy_dc_kwh,
        solar_area_m2: parsed.solar_potential.max_array_area_meters2,
        quality_tier: tier,
    })
}
