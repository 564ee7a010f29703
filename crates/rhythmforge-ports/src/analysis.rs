use crate::types::{Seconds, Waveform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("empty waveform")]
    EmptyWaveform,
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnsetSensitivity {
    Standard,
    /// Lower threshold and shorter refractory wait; used when a track is too sparse.
    Loose,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Onset times keyed by detection method name, each sorted ascending.
    pub onsets_by_method: BTreeMap<String, Vec<Seconds>>,
    pub tempo: f64,
    pub beat_times: Vec<Seconds>,
}

/// Thread model: called from background generation jobs, never from a session.
pub trait AudioAnalysisPort: Send + Sync {
    fn analyze(&self, waveform: &Waveform) -> Result<AnalysisReport, AnalysisError>;

    fn detect_onsets(
        &self,
        waveform: &Waveform,
        sensitivity: OnsetSensitivity,
    ) -> Result<Vec<Seconds>, AnalysisError>;
}
