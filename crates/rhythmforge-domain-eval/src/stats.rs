use crate::score::{accuracy, grade, score_for, Grade, Tier};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentCounts {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
}

impl JudgmentCounts {
    pub fn get(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Perfect => self.perfect,
            Tier::Great => self.great,
            Tier::Good => self.good,
            Tier::Miss => self.miss,
        }
    }

    pub fn add(&mut self, tier: Tier) {
        let slot = match tier {
            Tier::Perfect => &mut self.perfect,
            Tier::Great => &mut self.great,
            Tier::Good => &mut self.good,
            Tier::Miss => &mut self.miss,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.perfect + self.great + self.good + self.miss
    }
}

/// Running score state for one play. `combo` resets only on a miss and
/// `score` never decreases.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameStats {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub judgments: JudgmentCounts,
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameResults {
    pub score: u64,
    pub max_combo: u32,
    pub accuracy: f64,
    pub grade: Grade,
    pub judgments: JudgmentCounts,
    pub play_time: f64,
    pub total_notes: u32,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl GameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Applies combo bookkeeping first, then scores with the updated combo.
    /// Returns the points awarded.
    pub fn record(&mut self, tier: Tier) -> u64 {
        self.judgments.add(tier);
        if tier.is_miss() {
            self.combo = 0;
            return 0;
        }
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        let points = score_for(tier, self.combo);
        self.score += points;
        points
    }

    pub fn accuracy(&self) -> f64 {
        accuracy(&self.judgments)
    }

    pub fn results(&self, play_time: f64) -> GameResults {
        let accuracy = self.accuracy();
        GameResults {
            score: self.score,
            max_combo: self.max_combo,
            accuracy,
            grade: grade(accuracy),
            judgments: self.judgments,
            play_time,
            total_notes: self.judgments.total(),
            start_time: self.start_time.and_then(unix_secs),
            end_time: self.end_time.and_then(unix_secs),
        }
    }
}

fn unix_secs(at: SystemTime) -> Option<f64> {
    at.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs_f64())
}
