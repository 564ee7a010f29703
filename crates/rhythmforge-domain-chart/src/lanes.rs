//! Lane assignment strategies.
//!
//! Both strategies consume the same ordered onset times and return one note
//! per onset. Random tie-breaks go through the caller's RNG so a seeded RNG
//! reproduces a chart exactly.

use crate::model::{ChartNote, GenerationMethod};
use crate::spectrum::{rank_bands, BandAnalyzer};
use rand::Rng;
use rhythmforge_ports::types::{Lane, Seconds, Waveform, LANE_COUNT};

/// Max distance from the nearest beat for a note to count as on-beat.
pub const BEAT_TOLERANCE: Seconds = 0.1;

/// Absorbs float error so a distance of exactly the tolerance still counts.
const BEAT_EPSILON: Seconds = 1e-9;

/// Second band must reach this share of the top band to break a repeat.
pub const SECOND_BAND_RATIO: f64 = 0.3;

/// Repeat count at which the energy strategy tries a different lane.
pub const MAX_CONSECUTIVE: u32 = 2;

/// How far above the minimum a lane may drift before an on-beat note is nudged.
pub const BEAT_NUDGE_SLACK: u32 = 2;

#[derive(Clone, Copy, Debug)]
pub struct AssignmentInput<'a> {
    pub onsets: &'a [Seconds],
    pub beat_times: &'a [Seconds],
    pub waveform: Option<&'a Waveform>,
}

impl GenerationMethod {
    pub fn assign_lanes<R: Rng + ?Sized>(
        &self,
        input: &AssignmentInput<'_>,
        rng: &mut R,
    ) -> Vec<ChartNote> {
        let notes = match self {
            GenerationMethod::BalancedBeat => assign_balanced_beat(input, rng),
            GenerationMethod::Energy => assign_energy(input, rng),
        };
        if log::log_enabled!(log::Level::Debug) {
            let mut counts = [0usize; LANE_COUNT];
            for note in &notes {
                counts[usize::from(note.lane)] += 1;
            }
            log::debug!("{self} lane distribution: {counts:?}");
        }
        notes
    }
}

#[derive(Clone, Debug, Default)]
pub struct LaneCounters {
    counts: [u32; LANE_COUNT],
}

impl LaneCounters {
    pub fn get(&self, lane: Lane) -> u32 {
        self.counts[usize::from(lane)]
    }

    pub fn increment(&mut self, lane: Lane) {
        self.counts[usize::from(lane)] += 1;
    }

    pub fn min(&self) -> u32 {
        self.counts.iter().copied().min().unwrap_or(0)
    }

    pub fn spread(&self) -> u32 {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        max - self.min()
    }

    pub fn min_lanes(&self) -> Vec<Lane> {
        let min = self.min();
        (0..LANE_COUNT as Lane)
            .filter(|&lane| self.get(lane) == min)
            .collect()
    }

    /// Uniform pick among least-used lanes, skipping `avoid` when another choice exists.
    pub fn pick_least_used<R: Rng + ?Sized>(&self, avoid: Option<Lane>, rng: &mut R) -> Lane {
        let min_lanes = self.min_lanes();
        let preferred: Vec<Lane> = min_lanes
            .iter()
            .copied()
            .filter(|&lane| Some(lane) != avoid)
            .collect();
        let candidates = if preferred.is_empty() {
            &min_lanes
        } else {
            &preferred
        };
        pick(candidates, rng)
    }
}

fn pick<R: Rng + ?Sized>(candidates: &[Lane], rng: &mut R) -> Lane {
    match candidates {
        [] => 0,
        [only] => *only,
        _ => candidates[rng.random_range(0..candidates.len())],
    }
}

pub fn nearest_beat_distance(time: Seconds, beat_times: &[Seconds]) -> Seconds {
    beat_times
        .iter()
        .map(|beat| (time - beat).abs())
        .fold(f64::INFINITY, f64::min)
}

pub fn is_on_beat(time: Seconds, beat_times: &[Seconds]) -> bool {
    nearest_beat_distance(time, beat_times) <= BEAT_TOLERANCE + BEAT_EPSILON
}

/// Every note goes to a least-used lane, so lane counts never differ by more than one.
pub fn assign_balanced_beat<R: Rng + ?Sized>(
    input: &AssignmentInput<'_>,
    rng: &mut R,
) -> Vec<ChartNote> {
    let mut counters = LaneCounters::default();
    let mut notes = Vec::with_capacity(input.onsets.len());

    for &time in input.onsets {
        let on_beat = is_on_beat(time, input.beat_times);
        let lane = pick(&counters.min_lanes(), rng);
        counters.increment(lane);
        log::trace!(
            "{time:.3}s {} -> lane {lane}",
            if on_beat { "on beat" } else { "off beat" }
        );
        notes.push(ChartNote { time, lane });
    }
    notes
}

/// Maps each note to the dominant frequency band around it, with
/// anti-repetition and an on-beat nudge toward underused lanes.
pub fn assign_energy<R: Rng + ?Sized>(input: &AssignmentInput<'_>, rng: &mut R) -> Vec<ChartNote> {
    let mut analyzer = BandAnalyzer::new();
    let mut counters = LaneCounters::default();
    let mut last_lane: Option<Lane> = None;
    let mut consecutive = 0u32;
    let mut notes = Vec::with_capacity(input.onsets.len());

    for &time in input.onsets {
        let energies = input
            .waveform
            .and_then(|waveform| analyzer.band_energies(waveform, time))
            .filter(|energies| energies.iter().sum::<f64>() > 0.0);

        let lane = match energies {
            Some(energies) => {
                let ranked = rank_bands(&energies);
                let top = ranked[0] as Lane;
                let second = ranked[1] as Lane;
                let mut lane = top;

                if last_lane == Some(lane) && consecutive >= MAX_CONSECUTIVE {
                    if energies[ranked[1]] >= energies[ranked[0]] * SECOND_BAND_RATIO {
                        lane = second;
                    } else {
                        let balance: Vec<Lane> = counters
                            .min_lanes()
                            .into_iter()
                            .filter(|&l| Some(l) != last_lane)
                            .collect();
                        if !balance.is_empty() {
                            lane = pick(&balance, rng);
                        }
                    }
                }

                if is_on_beat(time, input.beat_times) {
                    let min = counters.min();
                    if counters.get(lane) > min + BEAT_NUDGE_SLACK {
                        let nudge = counters
                            .min_lanes()
                            .into_iter()
                            .find(|&l| (l == top || l == second) && Some(l) != last_lane);
                        if let Some(underused) = nudge {
                            lane = underused;
                        }
                    }
                }

                if Some(lane) == last_lane {
                    consecutive += 1;
                } else {
                    consecutive = 0;
                }
                lane
            }
            None => {
                consecutive = 0;
                counters.pick_least_used(last_lane, rng)
            }
        };

        counters.increment(lane);
        last_lane = Some(lane);
        notes.push(ChartNote { time, lane });
    }
    notes
}
