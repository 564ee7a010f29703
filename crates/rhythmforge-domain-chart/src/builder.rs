use crate::model::{Chart, ChartError, ChartNote, GenerationMethod};
use rhythmforge_ports::types::{Seconds, LANE_COUNT};

#[derive(Clone, Debug)]
pub struct ChartBuilder {
    title: Option<String>,
    source_audio_ref: Option<String>,
    bpm: f64,
    duration: Seconds,
    notes: Vec<ChartNote>,
    lane_count: usize,
    method: GenerationMethod,
}

impl ChartBuilder {
    pub fn new() -> Self {
        Self {
            title: None,
            source_audio_ref: None,
            bpm: 0.0,
            duration: 0.0,
            notes: Vec::new(),
            lane_count: LANE_COUNT,
            method: GenerationMethod::default(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn source_audio_ref(mut self, audio_ref: impl Into<String>) -> Self {
        self.source_audio_ref = Some(audio_ref.into());
        self
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn duration(mut self, duration: Seconds) -> Self {
        self.duration = duration;
        self
    }

    pub fn notes(mut self, notes: Vec<ChartNote>) -> Self {
        self.notes = notes;
        self
    }

    pub fn lane_count(mut self, lane_count: usize) -> Self {
        self.lane_count = lane_count;
        self
    }

    pub fn method(mut self, method: GenerationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn build(self) -> Result<Chart, ChartError> {
        let title = required_text(self.title, "song_title")?;
        let source_audio_ref = required_text(self.source_audio_ref, "audio_file")?;

        if self.lane_count == 0 || self.lane_count > usize::from(u8::MAX) + 1 {
            return Err(ChartError::Invalid(format!(
                "lane count {} out of range",
                self.lane_count
            )));
        }
        if !self.bpm.is_finite() || self.bpm < 0.0 {
            return Err(ChartError::Invalid(format!("bpm {} is not valid", self.bpm)));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ChartError::Invalid(format!(
                "duration {} is not valid",
                self.duration
            )));
        }
        if self.notes.is_empty() {
            return Err(ChartError::Invalid("chart has no notes".to_string()));
        }

        for (idx, note) in self.notes.iter().enumerate() {
            if !note.time.is_finite() || note.time < 0.0 {
                return Err(ChartError::Invalid(format!(
                    "note {idx} has invalid time {}",
                    note.time
                )));
            }
            if usize::from(note.lane) >= self.lane_count {
                return Err(ChartError::Invalid(format!(
                    "note {idx} lane {} outside 0..{}",
                    note.lane, self.lane_count
                )));
            }
        }

        let mut notes = self.notes;
        notes.sort_by(|a, b| a.time.total_cmp(&b.time));

        Ok(Chart {
            title,
            source_audio_ref,
            bpm: self.bpm,
            duration: self.duration,
            notes,
            lane_count: self.lane_count,
            generation_method: self.method,
        })
    }
}

impl Default for ChartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ChartError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ChartError::Invalid(format!("missing field: {field}"))),
    }
}
