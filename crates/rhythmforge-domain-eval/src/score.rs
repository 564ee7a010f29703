use crate::stats::JudgmentCounts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Combo at which the score multiplier starts growing.
pub const COMBO_BONUS_THRESHOLD: u32 = 10;

// Multiplier is tracked in tenths so scoring stays exact.
const MULTIPLIER_BASE_TENTHS: u64 = 10;
const MULTIPLIER_MAX_TENTHS: u64 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Perfect,
    Great,
    Good,
    Miss,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Perfect, Tier::Great, Tier::Good, Tier::Miss];

    pub fn base_score(self) -> u64 {
        match self {
            Tier::Perfect => 1000,
            Tier::Great => 700,
            Tier::Good => 300,
            Tier::Miss => 0,
        }
    }

    pub fn accuracy_weight(self) -> f64 {
        match self {
            Tier::Perfect => 1.0,
            Tier::Great => 0.8,
            Tier::Good => 0.5,
            Tier::Miss => 0.0,
        }
    }

    pub fn is_miss(self) -> bool {
        self == Tier::Miss
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Perfect => "perfect",
            Tier::Great => "great",
            Tier::Good => "good",
            Tier::Miss => "miss",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    SS,
    S,
    A,
    B,
    C,
    D,
}

fn multiplier_tenths(combo: u32) -> u64 {
    if combo < COMBO_BONUS_THRESHOLD {
        return MULTIPLIER_BASE_TENTHS;
    }
    let bonus = u64::from(combo - COMBO_BONUS_THRESHOLD);
    (MULTIPLIER_BASE_TENTHS + bonus).min(MULTIPLIER_MAX_TENTHS)
}

/// `1.0` below the threshold, then `+0.1` per combo step, capped at `2.0`.
pub fn combo_multiplier(combo: u32) -> f64 {
    multiplier_tenths(combo) as f64 / 10.0
}

/// Points for one judgment. `combo` must already include this judgment.
pub fn score_for(tier: Tier, combo: u32) -> u64 {
    tier.base_score() * multiplier_tenths(combo) / 10
}

/// Weighted accuracy in percent, `0.0` when nothing was judged.
pub fn accuracy(counts: &JudgmentCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }
    let weighted: f64 = Tier::ALL
        .iter()
        .map(|&tier| counts.get(tier) as f64 * tier.accuracy_weight())
        .sum();
    weighted / total as f64 * 100.0
}

pub fn grade(accuracy: f64) -> Grade {
    if accuracy >= 95.0 {
        Grade::SS
    } else if accuracy >= 90.0 {
        Grade::S
    } else if accuracy >= 80.0 {
        Grade::A
    } else if accuracy >= 70.0 {
        Grade::B
    } else if accuracy >= 60.0 {
        Grade::C
    } else {
        Grade::D
    }
}
