use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("access forbidden: {0}")]
    Forbidden(String),
    #[error("source not found: {0}")]
    NotFound(String),
    #[error("request blocked: {0}")]
    Blocked(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid source: {0}")]
    InvalidSource(String),
    #[error("acquisition failed: {0}")]
    Generic(String),
}

impl AcquisitionError {
    /// Stable cause code used for user messaging.
    pub fn code(&self) -> &'static str {
        match self {
            AcquisitionError::Forbidden(_) => "forbidden",
            AcquisitionError::NotFound(_) => "not_found",
            AcquisitionError::Blocked(_) => "blocked",
            AcquisitionError::Timeout(_) => "timeout",
            AcquisitionError::Unavailable(_) => "unavailable",
            AcquisitionError::InvalidSource(_) => "invalid_source",
            AcquisitionError::Generic(_) => "generic",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionProgress {
    pub percent: u8,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcquiredMedia {
    pub local_path: PathBuf,
    pub title: String,
    pub duration_secs: Option<f64>,
}

/// Fetches remote media into local storage. `on_progress` is invoked from the
/// calling thread; implementations must not retain it.
pub trait MediaAcquisitionPort: Send + Sync {
    fn fetch(
        &self,
        source_ref: &str,
        on_progress: &mut dyn FnMut(AcquisitionProgress),
    ) -> Result<AcquiredMedia, AcquisitionError>;
}
