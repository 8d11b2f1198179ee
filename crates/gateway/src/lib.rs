//! HTTP gateway for AskMyCar.
//!
//! Routes:
//! - `GET  /health`        liveness and version
//! - `POST /api/chat`      streaming chat (server-sent events)
//! - `GET  /api/vin`       VIN decoding via NHTSA
//! - `GET  /api/car-image` representative vehicle photo
//!
//! Built on Axum.

pub mod chat;
pub mod lookup;

use std::sync::Arc;

use askmycar_agent::ChatLoop;
use askmycar_config::{AppConfig, GatewayConfig};
use askmycar_core::ProviderError;
use askmycar_providers::AnthropicProvider;
use askmycar_tools::VehicleTools;
use askmycar_vehicle::{CarImages, VinDecoder};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use chat::ChatRequest;
pub use lookup::ImageResponse;

/// Shared application state for the gateway.
pub struct AppState {
    pub chat: Arc<ChatLoop>,
    pub vin_decoder: VinDecoder,
    pub images: CarImages,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(chat: ChatLoop, vin_decoder: VinDecoder, images: CarImages) -> Self {
        Self {
            chat: Arc::new(chat),
            vin_decoder,
            images,
        }
    }

    /// Wire the live provider, tools, and lookup services.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let provider = Arc::new(AnthropicProvider::from_config(&config.anthropic)?);
        let tools = Arc::new(VehicleTools::from_config(config));
        let chat = ChatLoop::from_config(provider, tools, config);

        Ok(Self::new(
            chat,
            VinDecoder::new(&config.nhtsa),
            CarImages::from_config(&config.images, &config.search),
        ))
    }
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Build the Axum router with all gateway routes.
///
/// Layers:
/// - CORS limited to the configured origins
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/vin", get(lookup::vin_handler))
        .route("/api/car-image", get(lookup::car_image_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(gateway.max_body_bytes))
        .layer(cors_layer(&gateway.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server and serve until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState::from_config(&config)?);
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, model = %config.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
