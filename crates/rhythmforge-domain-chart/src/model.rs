use crate::builder::ChartBuilder;
use rhythmforge_ports::storage::{ChartRecord, NoteRecord};
use rhythmforge_ports::types::{Lane, Seconds};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("no onsets detected")]
    NoOnsetsDetected,
    #[error("invalid chart: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    #[default]
    BalancedBeat,
    #[serde(alias = "energy_analysis")]
    Energy,
}

impl GenerationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMethod::BalancedBeat => "balanced_beat",
            GenerationMethod::Energy => "energy",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "balanced_beat" => Some(GenerationMethod::BalancedBeat),
            "energy" | "energy_analysis" => Some(GenerationMethod::Energy),
            _ => None,
        }
    }

    /// Unknown names select `balanced_beat` instead of failing.
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            log::warn!("unsupported generation method '{name}', using balanced_beat");
            GenerationMethod::BalancedBeat
        })
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartNote {
    pub time: Seconds,
    pub lane: Lane,
}

/// A validated chart. Notes are sorted ascending by time and every lane is
/// below `lane_count`; construct through [`ChartBuilder`] or [`Chart::from_record`].
#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    pub title: String,
    pub source_audio_ref: String,
    pub bpm: f64,
    pub duration: Seconds,
    pub notes: Vec<ChartNote>,
    pub lane_count: usize,
    pub generation_method: GenerationMethod,
}

impl Chart {
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn to_record(&self) -> ChartRecord {
        ChartRecord {
            song_title: self.title.clone(),
            audio_file: self.source_audio_ref.clone(),
            bpm: self.bpm,
            duration: self.duration,
            notes: self
                .notes
                .iter()
                .map(|n| NoteRecord {
                    time: n.time,
                    lane: n.lane,
                })
                .collect(),
            note_count: self.notes.len(),
            lanes: self.lane_count,
            created_method: self.generation_method.as_str().to_string(),
        }
    }

    pub fn from_record(record: ChartRecord) -> Result<Self, ChartError> {
        if record.note_count != 0 && record.note_count != record.notes.len() {
            log::debug!(
                "chart '{}' declares {} notes but carries {}",
                record.song_title,
                record.note_count,
                record.notes.len()
            );
        }
        let notes = record
            .notes
            .iter()
            .map(|n| ChartNote {
                time: n.time,
                lane: n.lane,
            })
            .collect();

        ChartBuilder::new()
            .title(record.song_title)
            .source_audio_ref(record.audio_file)
            .bpm(record.bpm)
            .duration(record.duration)
            .lane_count(record.lanes)
            .method(GenerationMethod::from_name(&record.created_method))
            .notes(notes)
            .build()
    }
}
