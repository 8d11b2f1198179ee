//! Vehicle lookup endpoints: `GET /api/vin` and `GET /api/car-image`.

use askmycar_vehicle::DecodedVehicle;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{ApiError, SharedState, api_error};

#[derive(Debug, Deserialize)]
pub(crate) struct VinQuery {
    #[serde(default)]
    vin: Option<String>,
}

pub(crate) async fn vin_handler(
    State(state): State<SharedState>,
    Query(query): Query<VinQuery>,
) -> Result<Json<DecodedVehicle>, ApiError> {
    let vin = query.vin.unwrap_or_default();

    state.vin_decoder.decode(&vin).await.map(Json).map_err(|e| {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(%vin, error = ?e, "VIN decode failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        api_error(status, e.to_string())
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageQuery {
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    make: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

impl ImageQuery {
    fn parts(&self) -> Option<(u16, &str, &str)> {
        let year = self.year.as_deref()?.trim().parse::<u16>().ok().filter(|y| *y > 0)?;
        let make = self.make.as_deref().filter(|m| !m.is_empty())?;
        let model = self.model.as_deref().filter(|m| !m.is_empty())?;
        Some((year, make, model))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub url: Option<String>,
}

pub(crate) async fn car_image_handler(
    State(state): State<SharedState>,
    Query(query): Query<ImageQuery>,
) -> Result<Json<ImageResponse>, ApiError> {
    let (year, make, model) = query
        .parts()
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing year, make, or model"))?;

    let url = state.images.url_for(year, make, model).await;
    Ok(Json(ImageResponse { url }))
}
