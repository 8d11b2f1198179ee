use thiserror::Error;

/// Errors from vehicle lookups.
///
/// Display strings are user-facing; upstream detail is kept for logs.
#[derive(Debug, Error)]
pub enum VehicleError {
    #[error("VIN must be 17 characters")]
    InvalidVin,

    #[error("Could not decode VIN — check the number and try again")]
    NotDecoded,

    #[error("Failed to decode VIN")]
    Upstream(String),
}

impl VehicleError {
    /// Whether the caller supplied bad input, as opposed to an upstream fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, VehicleError::InvalidVin | VehicleError::NotDecoded)
    }
}

impl From<reqwest::Error> for VehicleError {
    fn from(e: reqwest::Error) -> Self {
        VehicleError::Upstream(e.to_string())
    }
}
