use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_method() -> String {
    "balanced_beat".to_string()
}

fn default_lanes() -> usize {
    LANE_COUNT
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub time: Seconds,
    pub lane: Lane,
}

/// Persisted and transmitted chart form. Field names are part of the wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartRecord {
    pub song_title: String,
    pub audio_file: String,
    #[serde(default)]
    pub bpm: f64,
    #[serde(default)]
    pub duration: Seconds,
    pub notes: Vec<NoteRecord>,
    #[serde(default)]
    pub note_count: usize,
    #[serde(default = "default_lanes")]
    pub lanes: usize,
    #[serde(default = "default_method")]
    pub created_method: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    pub chart_ref: ChartRef,
    pub title: String,
    pub bpm: f64,
    pub duration: Seconds,
    pub note_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub min_interval: Seconds,
    pub escalation_min_interval: Seconds,
    pub low_density_threshold: usize,
    pub floor_threshold: usize,
    pub start_delay: Seconds,
    pub min_grid_tempo: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            min_interval: 0.12,
            escalation_min_interval: 0.10,
            low_density_threshold: 20,
            floor_threshold: 10,
            start_delay: 0.5,
            min_grid_tempo: 60.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub judgment_tolerances: ToleranceConfig,
    pub charts_dir: Option<String>,
    pub media_dir: Option<String>,
    #[serde(default = "default_method")]
    pub default_method: String,
    pub generation: GenerationSettings,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            judgment_tolerances: ToleranceConfig::live(),
            charts_dir: None,
            media_dir: None,
            default_method: default_method(),
            generation: GenerationSettings::default(),
        }
    }
}

pub trait ChartStorePort: Send + Sync {
    fn save_chart(&self, record: &ChartRecord) -> Result<ChartRef, StorageError>;
    fn load_chart(&self, chart_ref: &ChartRef) -> Result<ChartRecord, StorageError>;
    fn list_charts(&self) -> Result<Vec<ChartSummary>, StorageError>;
    fn delete_chart(&self, chart_ref: &ChartRef) -> Result<(), StorageError>;
    fn delete_all_charts(&self) -> Result<usize, StorageError>;
}

pub trait SettingsPort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
