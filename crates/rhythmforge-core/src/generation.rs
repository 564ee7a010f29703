//! Chart generation pipeline: decode, analyze, aggregate onsets, assign
//! lanes, validate, persist.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rhythmforge_domain_chart::{
    AggregationInput, AggregationReport, AssignmentInput, Chart, ChartBuilder, ChartError,
    GenerationMethod, OnsetAggregator,
};
use rhythmforge_ports::analysis::{AnalysisError, AudioAnalysisPort, OnsetSensitivity};
use rhythmforge_ports::audio::{AudioDecodePort, DecodeError};
use rhythmforge_ports::storage::{ChartStorePort, GenerationSettings, StorageError};
use rhythmforge_ports::types::ChartRef;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("generation cancelled")]
    Cancelled,
}

impl GenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Decode(_) => "decode_failed",
            GenerationError::Analysis(_) => "analysis_failed",
            GenerationError::Chart(ChartError::NoOnsetsDetected) => "no_onsets_detected",
            GenerationError::Chart(ChartError::Invalid(_)) => "chart_invalid",
            GenerationError::Storage(_) => "storage_failed",
            GenerationError::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub audio_path: PathBuf,
    pub song_title: Option<String>,
    pub method: GenerationMethod,
    /// Fixed seed for reproducible lane assignment; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(audio_path: impl Into<PathBuf>, method: GenerationMethod) -> Self {
        Self {
            audio_path: audio_path.into(),
            song_title: None,
            method,
            seed: None,
        }
    }

    /// Explicit title, or the audio file stem.
    pub fn resolved_title(&self) -> String {
        self.song_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| file_stem(&self.audio_path))
    }
}

#[derive(Clone, Debug)]
pub struct GeneratedChart {
    pub chart_ref: ChartRef,
    pub chart: Chart,
    pub report: AggregationReport,
}

pub struct ChartGenerator<'a> {
    decoder: &'a dyn AudioDecodePort,
    analyzer: &'a dyn AudioAnalysisPort,
    store: &'a dyn ChartStorePort,
    settings: GenerationSettings,
}

impl<'a> ChartGenerator<'a> {
    pub fn new(
        decoder: &'a dyn AudioDecodePort,
        analyzer: &'a dyn AudioAnalysisPort,
        store: &'a dyn ChartStorePort,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            decoder,
            analyzer,
            store,
            settings,
        }
    }

    /// Runs the full pipeline. `is_cancelled` is polled between stages and
    /// `progress` receives `(status, message)` pairs.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        is_cancelled: &dyn Fn() -> bool,
        progress: &mut dyn FnMut(&str, &str),
    ) -> Result<GeneratedChart, GenerationError> {
        let checkpoint = || {
            if is_cancelled() {
                Err(GenerationError::Cancelled)
            } else {
                Ok(())
            }
        };

        progress("decoding", "decoding audio");
        let waveform = self.decoder.decode(&request.audio_path)?;
        checkpoint()?;

        progress(
            "analyzing",
            &format!("analyzing audio with {} method", request.method),
        );
        let analysis = self.analyzer.analyze(&waveform)?;
        checkpoint()?;

        progress("aggregating", "merging onsets");
        let duration = waveform.duration_secs();
        let input = AggregationInput {
            onset_lists: analysis
                .onsets_by_method
                .values()
                .map(Vec::as_slice)
                .collect(),
            beat_times: &analysis.beat_times,
            tempo: analysis.tempo,
            duration,
        };
        let aggregator = OnsetAggregator::new(self.settings);
        let (onsets, report) = aggregator.aggregate(&input, || {
            self.analyzer
                .detect_onsets(&waveform, OnsetSensitivity::Loose)
                .unwrap_or_else(|err| {
                    log::warn!("loose onset re-detection failed: {err}");
                    Vec::new()
                })
        })?;
        checkpoint()?;

        progress(
            "assigning",
            &format!("assigning {} notes to lanes", onsets.len()),
        );
        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let notes = request.method.assign_lanes(
            &AssignmentInput {
                onsets: &onsets,
                beat_times: &analysis.beat_times,
                waveform: Some(&waveform),
            },
            &mut rng,
        );

        let chart = ChartBuilder::new()
            .title(request.resolved_title())
            .source_audio_ref(file_name(&request.audio_path))
            .bpm(analysis.tempo)
            .duration(duration)
            .notes(notes)
            .method(request.method)
            .build()?;
        checkpoint()?;

        progress("saving", "saving chart");
        let chart_ref = self.store.save_chart(&chart.to_record())?;
        log::info!(
            "generated '{}' as {chart_ref}: {} notes, {:.1} bpm, {:.1}s",
            chart.title,
            chart.note_count(),
            chart.bpm,
            chart.duration
        );
        Ok(GeneratedChart {
            chart_ref,
            chart,
            report,
        })
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "untitled".to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
