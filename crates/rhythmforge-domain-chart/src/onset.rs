//! Merges raw onset detections and the beat grid into one playable sequence
//! of note times.
//!
//! The pipeline is: union + dedupe, proximity filter, density escalation
//! (loose re-detection, then a synthetic tempo grid), reaction-time trim.
//! Low density is absorbed locally; only an empty result is an error.

use crate::model::ChartError;
use rhythmforge_ports::storage::GenerationSettings;
use rhythmforge_ports::types::Seconds;

#[derive(Clone, Debug)]
pub struct AggregationInput<'a> {
    pub onset_lists: Vec<&'a [Seconds]>,
    pub beat_times: &'a [Seconds],
    pub tempo: f64,
    pub duration: Seconds,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AggregationReport {
    pub merged: usize,
    pub filtered: usize,
    pub escalated: bool,
    pub grid_filled: bool,
    pub trimmed: usize,
}

#[derive(Clone, Debug)]
pub struct OnsetAggregator {
    config: GenerationSettings,
}

impl OnsetAggregator {
    pub fn new(config: GenerationSettings) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationSettings {
        &self.config
    }

    /// `redetect_loose` runs only when the first pass is below the low-density
    /// threshold; a failed re-detection should return an empty list.
    pub fn aggregate<F>(
        &self,
        input: &AggregationInput<'_>,
        redetect_loose: F,
    ) -> Result<(Vec<Seconds>, AggregationReport), ChartError>
    where
        F: FnOnce() -> Vec<Seconds>,
    {
        let cfg = &self.config;
        let mut report = AggregationReport::default();

        let mut lists = input.onset_lists.clone();
        lists.push(input.beat_times);
        let merged = merge_unique(&lists);
        report.merged = merged.len();

        let mut filtered = filter_close(&merged, cfg.min_interval);
        log::info!(
            "onsets merged: {} -> {} after proximity filter",
            merged.len(),
            filtered.len()
        );

        if filtered.len() < cfg.low_density_threshold {
            log::info!(
                "only {} onsets, re-detecting with loose sensitivity",
                filtered.len()
            );
            let loose = redetect_loose();
            let merged = merge_unique(&[&filtered, &loose, input.beat_times]);
            filtered = filter_close(&merged, cfg.escalation_min_interval);
            report.escalated = true;
        }

        if filtered.len() < cfg.floor_threshold {
            log::info!("only {} onsets, filling with tempo grid", filtered.len());
            let grid = beat_grid(input.tempo, input.duration, cfg.min_grid_tempo);
            let merged = merge_unique(&[&filtered, &grid]);
            filtered = filter_close(&merged, cfg.escalation_min_interval);
            report.grid_filled = true;
        }
        report.filtered = filtered.len();

        let trimmed = trim_before(&filtered, cfg.start_delay);
        report.trimmed = filtered.len() - trimmed.len();
        if report.trimmed > 0 {
            log::debug!(
                "removed {} onsets before {:.2}s reaction offset",
                report.trimmed,
                cfg.start_delay
            );
        }

        if trimmed.is_empty() {
            return Err(ChartError::NoOnsetsDetected);
        }
        Ok((trimmed, report))
    }
}

impl Default for OnsetAggregator {
    fn default() -> Self {
        Self::new(GenerationSettings::default())
    }
}

/// Union of all lists, sorted ascending with exact duplicates and non-finite values removed.
pub fn merge_unique(lists: &[&[Seconds]]) -> Vec<Seconds> {
    let mut all: Vec<Seconds> = lists
        .iter()
        .flat_map(|list| list.iter().copied())
        .filter(|t| t.is_finite())
        .collect();
    all.sort_by(|a, b| a.total_cmp(b));
    all.dedup();
    all
}

/// Keeps the first time, then every time at least `min_interval` after the last kept one.
pub fn filter_close(sorted: &[Seconds], min_interval: Seconds) -> Vec<Seconds> {
    let mut kept: Vec<Seconds> = Vec::with_capacity(sorted.len());
    for &t in sorted {
        match kept.last() {
            Some(&last) if t - last < min_interval => {}
            _ => kept.push(t),
        }
    }
    kept
}

pub fn trim_before(sorted: &[Seconds], start_delay: Seconds) -> Vec<Seconds> {
    sorted.iter().copied().filter(|&t| t >= start_delay).collect()
}

/// Uniform grid `0, i, 2i, ...` below `duration`, where `i = 60 / max(tempo, min_tempo)`.
pub fn beat_grid(tempo: f64, duration: Seconds, min_tempo: f64) -> Vec<Seconds> {
    let tempo = tempo.max(min_tempo);
    if !tempo.is_finite() || tempo <= 0.0 || !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }
    let interval = 60.0 / tempo;
    let steps = (duration / interval).ceil() as usize;
    (0..steps)
        .map(|i| i as f64 * interval)
        .filter(|&t| t < duration)
        .collect()
}
