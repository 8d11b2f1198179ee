//! Owner's manual lookup via the vehicledatabases.com manuals API.
//!
//! The API only tells us where the manual lives; the model still answers from
//! its own knowledge of the vehicle. Any failure falls back to text telling
//! the model to do exactly that.

use std::time::Duration;

use askmycar_config::VehicleDbConfig;
use askmycar_core::Vehicle;
use serde::Deserialize;
use tracing::{debug, warn};

pub struct ManualLookup {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ManualLookup {
    pub fn new(config: &VehicleDbConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Look up the manual for `vehicle`. Never fails.
    pub async fn lookup(&self, vehicle: &Vehicle, topic: &str) -> String {
        let Some(key) = self.api_key.as_deref() else {
            return fallback_text(vehicle, topic);
        };

        match self.find_manual_url(vehicle, key).await {
            Ok(Some(url)) => {
                debug!(%url, "Manual located");
                found_text(vehicle, topic, &url)
            }
            Ok(None) => fallback_text(vehicle, topic),
            Err(e) => {
                warn!(error = %e, vehicle = %vehicle, "Vehicle manual lookup failed");
                fallback_text(vehicle, topic)
            }
        }
    }

    async fn find_manual_url(&self, vehicle: &Vehicle, key: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}/vehicle-manuals", self.base_url);
        let request = self.client.get(&url).header("x-AuthKey", key);

        let request = match vehicle.vin_number() {
            Some(vin) => request.query(&[("vin", vin)]),
            None => request.query(&[
                ("year", vehicle.year.to_string().as_str()),
                ("make", vehicle.make.as_str()),
                ("model", vehicle.model.as_str()),
            ]),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            debug!(status = response.status().as_u16(), "Manual API returned non-success");
            return Ok(None);
        }

        let body: ManualResponse = response.json().await?;
        Ok(body.manual_url())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ManualResponse {
    #[serde(default)]
    data: Option<ManualData>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ManualData {
    #[serde(default, rename = "manualUrl")]
    manual_url: Option<String>,
}

impl ManualResponse {
    /// `data.manualUrl`, then top-level `url`; blanks don't count.
    fn manual_url(self) -> Option<String> {
        self.data
            .and_then(|d| d.manual_url)
            .filter(|u| !u.is_empty())
            .or_else(|| self.url.filter(|u| !u.is_empty()))
    }
}

fn found_text(vehicle: &Vehicle, topic: &str, url: &str) -> String {
    format!(
        "Manual found at {url}. Topic requested: \"{topic}\". Note: I'll use my knowledge of the {vehicle} owner's manual to answer about \"{topic}\"."
    )
}

fn fallback_text(vehicle: &Vehicle, topic: &str) -> String {
    format!(
        "Using built-in knowledge of the {vehicle} owner's manual for topic: \"{topic}\". I'll provide accurate information based on this vehicle's specifications."
    )
}
