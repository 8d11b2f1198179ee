//! Tool implementations for AskMyCar.
//!
//! Two tools back the assistant: an owner's manual lookup and a web search.
//! Both degrade to fallback text when credentials are missing or the
//! upstream service misbehaves, so a tool call never fails a chat.

pub mod fetch_manual;
pub mod web_search;

use askmycar_config::AppConfig;
use askmycar_core::{ToolExecutor, ToolInvocation, Vehicle};
use async_trait::async_trait;

pub use fetch_manual::ManualLookup;
pub use web_search::WebSearch;

/// The live tool set, wired from configuration.
pub struct VehicleTools {
    manual: ManualLookup,
    search: WebSearch,
}

impl VehicleTools {
    pub fn new(manual: ManualLookup, search: WebSearch) -> Self {
        Self { manual, search }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ManualLookup::new(&config.vehicle_db), WebSearch::new(&config.search))
    }

    pub fn manual(&self) -> &ManualLookup {
        &self.manual
    }

    pub fn search(&self) -> &WebSearch {
        &self.search
    }
}

#[async_trait]
impl ToolExecutor for VehicleTools {
    async fn execute(&self, vehicle: &Vehicle, invocation: &ToolInvocation) -> String {
        tracing::info!(tool = %invocation.kind(), "Executing tool");
        match invocation {
            ToolInvocation::FetchManual { topic } => self.manual.lookup(vehicle, topic).await,
            ToolInvocation::WebSearch { query } => self.search.search(query).await,
        }
    }
}
