//! The vehicle a chat is about.

use serde::{Deserialize, Serialize};

/// The user's car, as registered in the browser.
///
/// Supplied with every chat request and never persisted server-side.
/// Browser-only fields (nickname, image, maintenance log...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub year: u16,
    pub make: String,
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
}

impl Vehicle {
    pub fn new(year: u16, make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            year,
            make: make.into(),
            model: model.into(),
            trim: None,
            engine: None,
            vin: None,
        }
    }

    pub fn with_vin(mut self, vin: impl Into<String>) -> Self {
        self.vin = Some(vin.into());
        self
    }

    /// Trim, ignoring blanks.
    pub fn trim_level(&self) -> Option<&str> {
        non_blank(&self.trim)
    }

    /// Engine description, ignoring blanks.
    pub fn engine_desc(&self) -> Option<&str> {
        non_blank(&self.engine)
    }

    /// VIN, ignoring blanks.
    pub fn vin_number(&self) -> Option<&str> {
        non_blank(&self.vin)
    }
}

impl std::fmt::Display for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.year, self.make, self.model)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
