use serde::{Deserialize, Serialize};
use std::fmt;

pub type Seconds = f64;
pub type Lane = u8;

/// Number of input lanes every generated chart uses.
pub const LANE_COUNT: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChartRef(pub String);

/// Opaque identity of a player connection; one session per connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

/// Mono PCM samples in [-1, 1].
#[derive(Clone, Debug, Default)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    pub fn duration_secs(&self) -> Seconds {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Judgment timing thresholds in seconds, ascending perfect < great < good.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    pub perfect: Seconds,
    pub great: Seconds,
    pub good: Seconds,
}

impl ToleranceConfig {
    /// Tight windows used when authoring and previewing charts.
    pub fn authoring() -> Self {
        Self {
            perfect: 0.05,
            great: 0.10,
            good: 0.15,
        }
    }

    /// Looser windows for live play over a network transport.
    pub fn live() -> Self {
        Self {
            perfect: 0.08,
            great: 0.15,
            good: 0.25,
        }
    }

    pub fn is_valid(&self) -> bool {
        let all_finite =
            self.perfect.is_finite() && self.great.is_finite() && self.good.is_finite();
        all_finite && self.perfect > 0.0 && self.perfect < self.great && self.great < self.good
    }
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self::live()
    }
}

impl fmt::Display for ChartRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}
