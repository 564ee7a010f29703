//! Onset strength envelopes, one value per STFT frame.

/// Positive log-magnitude spectral flux averaged over bins.
pub fn spectral_flux(magnitudes: &[Vec<f32>]) -> Vec<f32> {
    let mut env = vec![0.0; magnitudes.len()];
    for t in 1..magnitudes.len() {
        let (prev, cur) = (&magnitudes[t - 1], &magnitudes[t]);
        let bins = cur.len().max(1);
        let rise: f32 = prev
            .iter()
            .zip(cur)
            .map(|(&p, &c)| (compress(c) - compress(p)).max(0.0))
            .sum();
        env[t] = rise / bins as f32;
    }
    env
}

/// Positive frame-to-frame change of RMS level.
pub fn energy_rise(rms: &[f32]) -> Vec<f32> {
    let mut env = vec![0.0; rms.len()];
    for t in 1..rms.len() {
        env[t] = (rms[t] - rms[t - 1]).max(0.0);
    }
    env
}

fn compress(mag: f32) -> f32 {
    (1.0 + 100.0 * mag).ln()
}

/// Rescales to [0, 1]. Returns `None` for a flat envelope.
pub fn normalize(env: &[f32]) -> Option<Vec<f32>> {
    let min = env.iter().copied().fold(f32::INFINITY, f32::min);
    let max = env.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        return None;
    }
    Some(env.iter().map(|v| (v - min) / range).collect())
}
