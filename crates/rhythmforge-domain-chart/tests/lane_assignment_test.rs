use rand::rngs::StdRng;
use rand::SeedableRng;
use rhythmforge_domain_chart::{
    assign_balanced_beat, assign_energy, is_on_beat, AssignmentInput, ChartNote,
    GenerationMethod, LaneCounters,
};
use rhythmforge_ports::types::{Waveform, LANE_COUNT};

fn onsets(count: usize) -> Vec<f64> {
    (0..count).map(|i| 0.5 + 0.25 * i as f64).collect()
}

fn sine(freq_hz: f64, seconds: f64, sample_rate_hz: u32) -> Waveform {
    let len = (seconds * sample_rate_hz as f64) as usize;
    let samples = (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate_hz as f64;
            (0.8 * (2.0 * std::f64::consts::PI * freq_hz * t).sin()) as f32
        })
        .collect();
    Waveform::new(samples, sample_rate_hz)
}

/// Sum of sines given as (frequency, amplitude) pairs, audible only where
/// `audible(t)` holds.
fn tones(
    partials: &[(f64, f64)],
    seconds: f64,
    sample_rate_hz: u32,
    audible: impl Fn(f64) -> bool,
) -> Waveform {
    let len = (seconds * sample_rate_hz as f64) as usize;
    let samples = (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate_hz as f64;
            if !audible(t) {
                return 0.0;
            }
            partials
                .iter()
                .map(|&(freq, amp)| amp * (2.0 * std::f64::consts::PI * freq * t).sin())
                .sum::<f64>() as f32
        })
        .collect();
    Waveform::new(samples, sample_rate_hz)
}

fn lanes(notes: &[ChartNote]) -> Vec<u8> {
    notes.iter().map(|n| n.lane).collect()
}

#[test]
fn balanced_beat_keeps_every_prefix_balanced() {
    for seed in 0..16u64 {
        let times = onsets(203);
        let input = AssignmentInput {
            onsets: &times,
            beat_times: &[0.5, 1.0, 1.5, 2.0],
            waveform: None,
        };
        let notes = assign_balanced_beat(&input, &mut StdRng::seed_from_u64(seed));
        assert_eq!(notes.len(), times.len());

        let mut counters = LaneCounters::default();
        for note in &notes {
            assert!(usize::from(note.lane) < LANE_COUNT);
            counters.increment(note.lane);
            assert!(counters.spread() <= 1, "seed {seed} broke balance");
        }
    }
}

#[test]
fn balanced_beat_is_reproducible_with_a_seed() {
    let times = onsets(64);
    let input = AssignmentInput {
        onsets: &times,
        beat_times: &[],
        waveform: None,
    };
    let a = assign_balanced_beat(&input, &mut StdRng::seed_from_u64(7));
    let b = assign_balanced_beat(&input, &mut StdRng::seed_from_u64(7));
    assert_eq!(a, b);
}

#[test]
fn notes_keep_onset_times_in_order() {
    let times = onsets(10);
    let input = AssignmentInput {
        onsets: &times,
        beat_times: &[],
        waveform: None,
    };
    let notes = GenerationMethod::BalancedBeat.assign_lanes(&input, &mut StdRng::seed_from_u64(1));
    let got: Vec<f64> = notes.iter().map(|n| n.time).collect();
    assert_eq!(got, times);
}

#[test]
fn on_beat_uses_inclusive_tolerance() {
    let beats = [1.0, 2.0];
    assert!(is_on_beat(1.05, &beats));
    // Both sit exactly 0.1s from a beat; the float distances land either side of 0.1.
    assert!(is_on_beat(1.9, &beats));
    assert!(is_on_beat(2.1, &beats));
    assert!(!is_on_beat(2.1001, &beats));
    assert!(!is_on_beat(1.5, &beats));
    assert!(!is_on_beat(1.0, &[]));
}

#[test]
fn energy_without_waveform_balances_and_avoids_repeats() {
    let times = onsets(40);
    let input = AssignmentInput {
        onsets: &times,
        beat_times: &[],
        waveform: None,
    };
    let notes = assign_energy(&input, &mut StdRng::seed_from_u64(3));

    let mut counters = LaneCounters::default();
    for note in &notes {
        counters.increment(note.lane);
        assert!(counters.spread() <= 1);
    }
    assert!(notes.windows(2).all(|w| w[0].lane != w[1].lane));
}

#[test]
fn energy_follows_dominant_band() {
    let wave = sine(2000.0, 3.0, 22_050);
    let times = [0.5];
    let input = AssignmentInput {
        onsets: &times,
        beat_times: &[],
        waveform: Some(&wave),
    };
    let notes = assign_energy(&input, &mut StdRng::seed_from_u64(0));
    assert_eq!(lanes(&notes), vec![2]);
}

#[test]
fn energy_breaks_long_runs_on_one_band() {
    let wave = sine(100.0, 6.0, 22_050);
    let times: Vec<f64> = (1..=10).map(|i| 0.5 * i as f64).collect();
    let input = AssignmentInput {
        onsets: &times,
        beat_times: &[],
        waveform: Some(&wave),
    };
    let notes = assign_energy(&input, &mut StdRng::seed_from_u64(11));
    let got = lanes(&notes);

    assert_eq!(&got[..3], &[0, 0, 0]);
    assert_ne!(got[3], 0);
    let longest_run = got
        .chunk_by(|a, b| a == b)
        .map(|run| run.len())
        .max()
        .unwrap_or(0);
    assert!(longest_run <= 3, "lanes {got:?}");
}

#[test]
fn energy_falls_back_when_window_is_truncated() {
    let wave = sine(100.0, 1.0, 22_050);
    // Both notes sit too close to an edge for a full analysis window.
    let times = [0.005, 0.995];
    let input = AssignmentInput {
        onsets: &times,
        beat_times: &[],
        waveform: Some(&wave),
    };
    let notes = assign_energy(&input, &mut StdRng::seed_from_u64(5));
    assert_ne!(notes[0].lane, notes[1].lane);
}

#[test]
fn unknown_method_name_falls_back_to_balanced_beat() {
    assert_eq!(GenerationMethod::from_name("chaos"), GenerationMethod::BalancedBeat);
    assert_eq!(GenerationMethod::from_name("energy_analysis"), GenerationMethod::Energy);
    assert_eq!(GenerationMethod::parse("energy"), Some(GenerationMethod::Energy));
    assert_eq!(GenerationMethod::parse("chaos"), None);
}

#[test]
fn energy_breaks_a_run_with_a_strong_second_band() {
    // Bass dominates; the 2 kHz partial carries about half its power.
    let wave = tones(&[(100.0, 1.0), (2000.0, 0.7)], 4.0, 22_050, |_| true);
    let times = [0.5, 1.0, 1.5, 2.0];
    let input = AssignmentInput {
        onsets: &times,
        beat_times: &[],
        waveform: Some(&wave),
    };
    let notes = assign_energy(&input, &mut StdRng::seed_from_u64(2));
    assert_eq!(lanes(&notes), vec![0, 0, 0, 2]);
}

#[test]
fn energy_nudges_on_beat_notes_toward_an_underused_band() {
    // Tones around x.5s, silence around whole seconds. Silent notes fall back
    // to balancing, so the bass lane never runs three in a row and only the
    // on-beat nudge can move a tone note off lane 0.
    let wave = tones(&[(100.0, 1.0), (2000.0, 0.7)], 11.0, 22_050, |t| {
        let phase = t.fract();
        (0.25..0.75).contains(&phase)
    });
    let times: Vec<f64> = (0..20).map(|i| 0.5 + 0.5 * i as f64).collect();
    let tone_times: Vec<f64> = times.iter().copied().step_by(2).collect();

    let off_beat = AssignmentInput {
        onsets: &times,
        beat_times: &[],
        waveform: Some(&wave),
    };
    let plain = assign_energy(&off_beat, &mut StdRng::seed_from_u64(9));
    assert!(plain.iter().step_by(2).all(|n| n.lane == 0), "{:?}", lanes(&plain));

    let on_beat = AssignmentInput {
        onsets: &times,
        beat_times: &tone_times,
        waveform: Some(&wave),
    };
    let nudged = assign_energy(&on_beat, &mut StdRng::seed_from_u64(9));
    let tone_lanes: Vec<u8> = nudged.iter().step_by(2).map(|n| n.lane).collect();
    assert!(tone_lanes.contains(&2), "tone lanes {tone_lanes:?}");
    assert!(tone_lanes.iter().all(|&l| l == 0 || l == 2));
}
