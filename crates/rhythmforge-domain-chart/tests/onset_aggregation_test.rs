use rhythmforge_domain_chart::{
    beat_grid, filter_close, merge_unique, trim_before, AggregationInput, ChartError,
    OnsetAggregator,
};
use rhythmforge_ports::storage::GenerationSettings;
use std::cell::Cell;

fn spaced(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

#[test]
fn proximity_filter_drops_clustered_onsets() {
    assert_eq!(filter_close(&[0.10, 0.20, 0.40], 0.15), vec![0.10, 0.40]);
}

#[test]
fn proximity_filter_measures_from_last_kept() {
    // 0.25 is 0.15 after 0.10 even though 0.20 was dropped in between.
    assert_eq!(filter_close(&[0.10, 0.20, 0.25], 0.15), vec![0.10, 0.25]);
}

#[test]
fn reaction_trim_removes_early_onsets() {
    assert_eq!(trim_before(&[0.30, 0.51], 0.5), vec![0.51]);
    assert_eq!(trim_before(&[0.5], 0.5), vec![0.5]);
}

#[test]
fn merge_dedupes_and_sorts() {
    let a = [2.0, 1.0, f64::NAN];
    let b = [1.0, 3.0];
    assert_eq!(merge_unique(&[&a, &b]), vec![1.0, 2.0, 3.0]);
}

#[test]
fn beat_grid_clamps_slow_tempo() {
    assert_eq!(beat_grid(30.0, 5.0, 60.0), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(beat_grid(120.0, 1.2, 60.0), vec![0.0, 0.5, 1.0]);
    assert!(beat_grid(120.0, 0.0, 60.0).is_empty());
}

#[test]
fn dense_input_skips_escalation() {
    let onsets = spaced(1.0, 0.2, 30);
    let input = AggregationInput {
        onset_lists: vec![&onsets],
        beat_times: &[],
        tempo: 120.0,
        duration: 10.0,
    };
    let called = Cell::new(false);
    let (notes, report) = OnsetAggregator::default()
        .aggregate(&input, || {
            called.set(true);
            Vec::new()
        })
        .expect("aggregation should succeed");

    assert!(!called.get());
    assert!(!report.escalated);
    assert_eq!(notes.len(), 30);
}

#[test]
fn sparse_input_merges_loose_redetection() {
    let onsets = spaced(1.0, 1.0, 5);
    let loose = spaced(1.5, 1.0, 20);
    let input = AggregationInput {
        onset_lists: vec![&onsets],
        beat_times: &[],
        tempo: 120.0,
        duration: 30.0,
    };
    let (notes, report) = OnsetAggregator::default()
        .aggregate(&input, || loose.clone())
        .expect("aggregation should succeed");

    assert!(report.escalated);
    assert!(!report.grid_filled);
    assert_eq!(notes.len(), 25);
    assert!(notes.windows(2).all(|w| w[1] - w[0] >= 0.10));
}

#[test]
fn empty_detection_falls_back_to_tempo_grid() {
    let input = AggregationInput {
        onset_lists: vec![],
        beat_times: &[],
        tempo: 120.0,
        duration: 10.0,
    };
    let (notes, report) = OnsetAggregator::default()
        .aggregate(&input, Vec::new)
        .expect("grid fallback should produce notes");

    assert!(report.escalated);
    assert!(report.grid_filled);
    assert_eq!(notes.len(), 19);
    assert_eq!(notes[0], 0.5);
    assert_eq!(report.trimmed, 1);
}

#[test]
fn nothing_playable_reports_no_onsets() {
    let onsets = [0.1, 0.2];
    let input = AggregationInput {
        onset_lists: vec![&onsets],
        beat_times: &[],
        tempo: 120.0,
        duration: 0.4,
    };
    let result = OnsetAggregator::default().aggregate(&input, Vec::new);
    assert_eq!(result, Err(ChartError::NoOnsetsDetected));
}

#[test]
fn custom_settings_drive_the_filter() {
    let settings = GenerationSettings {
        min_interval: 0.5,
        low_density_threshold: 0,
        floor_threshold: 0,
        start_delay: 0.0,
        ..GenerationSettings::default()
    };
    let onsets = [0.0, 0.2, 0.6, 0.9, 1.2];
    let input = AggregationInput {
        onset_lists: vec![&onsets],
        beat_times: &[],
        tempo: 120.0,
        duration: 2.0,
    };
    let (notes, _) = OnsetAggregator::new(settings)
        .aggregate(&input, Vec::new)
        .expect("aggregation should succeed");
    assert_eq!(notes, vec![0.0, 0.6, 1.2]);
}
