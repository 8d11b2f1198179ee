//! VIN decoding through the NHTSA vPIC API.

use std::time::Duration;

use askmycar_config::NhtsaConfig;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::VehicleError;

pub const VIN_LENGTH: usize = 17;

/// What the decoder could tell us about a VIN. Unknown fields are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedVehicle {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub trim: String,
    pub engine: String,
    pub body_style: String,
    pub drive_type: String,
    pub fuel_type: String,
    pub manufacturer: String,
}

impl DecodedVehicle {
    /// Build from vPIC `Results`; `fallback_year` is used when the model year
    /// is missing or unparseable.
    pub fn from_results(results: &[DecodeVariable], fallback_year: u16) -> Self {
        let get = |name: &str| extract(results, name);

        let year = get("Model Year").parse().ok().filter(|y| *y > 0).unwrap_or(fallback_year);

        let trim = Some(get("Trim"))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| get("Series"));

        let displacement = get("Displacement (L)");
        let cylinders = get("Engine Number of Cylinders");
        let engine = [
            (!displacement.is_empty()).then(|| format!("{displacement}L")),
            (!cylinders.is_empty()).then(|| format!("{cylinders}-cyl")),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

        Self {
            make: get("Make"),
            model: get("Model"),
            year,
            trim,
            engine,
            body_style: get("Body Class"),
            drive_type: get("Drive Type"),
            fuel_type: get("Fuel Type - Primary"),
            manufacturer: get("Manufacturer Name"),
        }
    }

    /// Whether enough was decoded to identify the vehicle.
    pub fn is_identified(&self) -> bool {
        !self.make.is_empty() && !self.model.is_empty()
    }
}

/// One `{Variable, Value}` pair from a vPIC decode.
#[derive(Debug, Clone, Deserialize)]
pub struct DecodeVariable {
    #[serde(rename = "Variable", default)]
    pub variable: String,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DecodeResponse {
    #[serde(rename = "Results", default)]
    results: Vec<DecodeVariable>,
}

fn extract(results: &[DecodeVariable], name: &str) -> String {
    results
        .iter()
        .find(|r| r.variable == name)
        .and_then(|r| r.value.as_deref())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Check length and normalize case. Only ASCII letters and digits pass,
/// since the VIN becomes a URL path segment.
pub fn normalize_vin(vin: &str) -> Result<String, VehicleError> {
    if vin.len() != VIN_LENGTH || !vin.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(VehicleError::InvalidVin);
    }
    Ok(vin.to_ascii_uppercase())
}

fn current_year() -> u16 {
    u16::try_from(chrono::Utc::now().year()).unwrap_or(u16::MAX)
}

pub struct VinDecoder {
    client: reqwest::Client,
    base_url: String,
}

impl VinDecoder {
    pub fn new(config: &NhtsaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Decode `vin`. Fails with [`VehicleError::NotDecoded`] when NHTSA
    /// cannot name the make and model.
    pub async fn decode(&self, vin: &str) -> Result<DecodedVehicle, VehicleError> {
        let vin = normalize_vin(vin)?;
        let url = format!("{}/DecodeVin/{vin}", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("format", "json")])
            .send()
            .await?
            .error_for_status()?;

        let body: DecodeResponse = response.json().await?;
        let decoded = DecodedVehicle::from_results(&body.results, current_year());
        debug!(%vin, make = %decoded.make, model = %decoded.model, "VIN decoded");

        if !decoded.is_identified() {
            return Err(VehicleError::NotDecoded);
        }
        Ok(decoded)
    }
}
