/// Peak picking windows in frames. Max windows are `[n - pre, n + post)`,
/// average windows likewise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakPick {
    pub pre_max: usize,
    pub post_max: usize,
    pub pre_avg: usize,
    pub post_avg: usize,
    pub delta: f32,
    pub wait: usize,
}

impl PeakPick {
    /// Wide windows and a long refractory wait; few, strong onsets.
    pub const COMPLEX: PeakPick = PeakPick {
        pre_max: 20,
        post_max: 20,
        pre_avg: 100,
        post_avg: 100,
        delta: 0.1,
        wait: 50,
    };

    pub const ENERGY: PeakPick = PeakPick {
        delta: 0.15,
        wait: 30,
        ..PeakPick::SHORT
    };

    pub const LOOSE: PeakPick = PeakPick {
        delta: 0.05,
        wait: 20,
        ..PeakPick::SHORT
    };

    const SHORT: PeakPick = PeakPick {
        pre_max: 1,
        post_max: 1,
        pre_avg: 4,
        post_avg: 5,
        delta: 0.07,
        wait: 1,
    };

    /// Frame indices of peaks in a normalised envelope.
    pub fn pick(&self, env: &[f32]) -> Vec<usize> {
        let mut peaks = Vec::new();
        let mut last: Option<usize> = None;
        for n in 0..env.len() {
            let x = env[n];
            let max_lo = n.saturating_sub(self.pre_max);
            let max_hi = (n + self.post_max).min(env.len()).max(n + 1);
            let local_max = env[max_lo..max_hi]
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            if x < local_max {
                continue;
            }
            let avg_lo = n.saturating_sub(self.pre_avg);
            let avg_hi = (n + self.post_avg).min(env.len()).max(n + 1);
            let window = &env[avg_lo..avg_hi];
            let mean = window.iter().sum::<f32>() / window.len() as f32;
            if x < mean + self.delta {
                continue;
            }
            if last.is_some_and(|prev| n <= prev + self.wait) {
                continue;
            }
            peaks.push(n);
            last = Some(n);
        }
        peaks
    }
}
