use crate::score::Tier;
use crate::stats::GameStats;
use rhythmforge_domain_chart::ChartNote;
use rhythmforge_ports::types::{Lane, Seconds, ToleranceConfig};
use serde::{Deserialize, Serialize};

/// Max distance between a reported auto-miss time and the note it refers to.
pub const AUTO_MISS_EPSILON: Seconds = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayNote {
    pub time: Seconds,
    pub lane: Lane,
    pub hit: bool,
    pub judgment: Option<Tier>,
}

/// A session's private copy of a chart's notes with per-note play state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Playfield {
    notes: Vec<PlayNote>,
}

impl Playfield {
    pub fn from_chart_notes(notes: &[ChartNote]) -> Self {
        Self {
            notes: notes
                .iter()
                .map(|n| PlayNote {
                    time: n.time,
                    lane: n.lane,
                    hit: false,
                    judgment: None,
                })
                .collect(),
        }
    }

    pub fn notes(&self) -> &[PlayNote] {
        &self.notes
    }

    pub fn remaining(&self) -> usize {
        self.notes.iter().filter(|n| !n.hit).count()
    }

    fn resolve(&mut self, idx: usize, tier: Tier) {
        let note = &mut self.notes[idx];
        debug_assert!(!note.hit, "note {idx} resolved twice");
        note.hit = true;
        note.judgment = Some(tier);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitOutcome {
    pub tier: Tier,
    pub note_index: Option<usize>,
    pub note_time: Option<Seconds>,
    pub diff: Option<Seconds>,
    pub points: u64,
    pub combo: u32,
}

impl HitOutcome {
    /// True when a chart note was consumed by this input.
    pub fn is_hit(&self) -> bool {
        self.note_index.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoMissOutcome {
    Marked { note_index: usize },
    /// No unresolved note in that lane at that time; stats untouched.
    NoMatch,
}

pub struct JudgmentEngine {
    tolerances: ToleranceConfig,
}

impl JudgmentEngine {
    pub fn new(tolerances: ToleranceConfig) -> Self {
        Self { tolerances }
    }

    pub fn tolerances(&self) -> ToleranceConfig {
        self.tolerances
    }

    pub fn classify(&self, diff: Seconds) -> Option<Tier> {
        let t = &self.tolerances;
        if diff <= t.perfect {
            Some(Tier::Perfect)
        } else if diff <= t.great {
            Some(Tier::Great)
        } else if diff <= t.good {
            Some(Tier::Good)
        } else {
            None
        }
    }

    /// Judges an input on `lane` at session time `now` against the nearest
    /// unresolved note in that lane. With no note in range the input counts
    /// as a miss and no note is consumed.
    pub fn hit_note(
        &self,
        field: &mut Playfield,
        stats: &mut GameStats,
        lane: Lane,
        now: Seconds,
    ) -> HitOutcome {
        let mut best: Option<(usize, Tier, Seconds)> = None;
        for (idx, note) in field.notes.iter().enumerate() {
            if note.lane != lane || note.hit {
                continue;
            }
            let diff = (now - note.time).abs();
            let Some(tier) = self.classify(diff) else {
                continue;
            };
            if best.map_or(true, |(_, _, best_diff)| diff < best_diff) {
                best = Some((idx, tier, diff));
            }
        }

        match best {
            Some((idx, tier, diff)) => {
                field.resolve(idx, tier);
                let points = stats.record(tier);
                log::debug!("lane {lane} {tier} at {now:.3}s (diff {diff:.3}s)");
                HitOutcome {
                    tier,
                    note_index: Some(idx),
                    note_time: Some(field.notes[idx].time),
                    diff: Some(diff),
                    points,
                    combo: stats.combo,
                }
            }
            None => {
                stats.record(Tier::Miss);
                log::debug!("lane {lane} miss at {now:.3}s");
                HitOutcome {
                    tier: Tier::Miss,
                    note_index: None,
                    note_time: None,
                    diff: None,
                    points: 0,
                    combo: stats.combo,
                }
            }
        }
    }

    /// Resolves a note whose window passed without input. Idempotent: a note
    /// already resolved is left alone and no second miss is recorded.
    pub fn auto_miss(
        &self,
        field: &mut Playfield,
        stats: &mut GameStats,
        lane: Lane,
        note_time: Seconds,
    ) -> AutoMissOutcome {
        let target = field.notes.iter().position(|n| {
            n.lane == lane && !n.hit && (n.time - note_time).abs() < AUTO_MISS_EPSILON
        });
        match target {
            Some(idx) => {
                field.resolve(idx, Tier::Miss);
                stats.record(Tier::Miss);
                AutoMissOutcome::Marked { note_index: idx }
            }
            None => AutoMissOutcome::NoMatch,
        }
    }
}
