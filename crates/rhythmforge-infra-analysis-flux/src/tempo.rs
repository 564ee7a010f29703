//! Tempo by onset-envelope autocorrelation and beats by period stepping.

pub const MIN_BPM: f64 = 60.0;
pub const MAX_BPM: f64 = 200.0;
const PRIOR_BPM: f64 = 120.0;
/// Width of the tempo prior in octaves.
const PRIOR_OCTAVES: f64 = 1.0;

/// Estimated tempo in BPM, or `None` when the envelope is too short or flat.
/// `frame_rate` is envelope frames per second.
pub fn estimate_tempo(env: &[f32], frame_rate: f64) -> Option<f64> {
    let min_lag = (60.0 * frame_rate / MAX_BPM).ceil().max(1.0) as usize;
    let max_lag = (60.0 * frame_rate / MIN_BPM).floor() as usize;
    if max_lag < min_lag || env.len() <= max_lag + 1 {
        return None;
    }

    let mean = env.iter().map(|&v| v as f64).sum::<f64>() / env.len() as f64;
    let centred: Vec<f64> = env.iter().map(|&v| v as f64 - mean).collect();
    let autocorr = |lag: usize| -> f64 {
        centred
            .iter()
            .zip(&centred[lag..])
            .map(|(a, b)| a * b)
            .sum()
    };

    let scores: Vec<(usize, f64)> = ((min_lag - 1)..=(max_lag + 1))
        .map(|lag| (lag, autocorr(lag)))
        .collect();
    let weighted = |lag: usize, score: f64| -> f64 {
        let bpm = 60.0 * frame_rate / lag as f64;
        let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
        score * (-0.5 * octaves * octaves).exp()
    };

    let (best_idx, &(best_lag, best_score)) = scores
        .iter()
        .enumerate()
        .filter(|(_, (lag, _))| (min_lag..=max_lag).contains(lag))
        .max_by(|(_, a), (_, b)| weighted(a.0, a.1).total_cmp(&weighted(b.0, b.1)))?;
    if best_score <= 0.0 {
        return None;
    }

    // Parabolic refinement between neighbouring lags.
    let prev = scores[best_idx - 1].1;
    let next = scores[best_idx + 1].1;
    let denom = prev - 2.0 * best_score + next;
    let shift = if denom.abs() > f64::EPSILON {
        (0.5 * (prev - next) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    let lag = best_lag as f64 + shift;
    Some(60.0 * frame_rate / lag)
}

/// Beat frames spaced one period apart, phase chosen to sit on the strongest
/// onsets, each snapped to the local envelope maximum.
pub fn track_beats(env: &[f32], frame_rate: f64, bpm: f64) -> Vec<usize> {
    if env.is_empty() || !bpm.is_finite() || bpm <= 0.0 {
        return Vec::new();
    }
    let period = 60.0 * frame_rate / bpm;
    if period < 1.0 {
        return Vec::new();
    }
    let len = env.len();
    let steps = move |offset: f64| {
        (0u32..)
            .map(move |k| offset + k as f64 * period)
            .take_while(move |&pos| pos < len as f64)
            .map(|pos| pos.round() as usize)
            .filter(move |&frame| frame < len)
    };

    let phases = period.ceil() as usize;
    let best_phase = (0..phases)
        .max_by(|&a, &b| {
            let score = |phase: usize| steps(phase as f64).map(|f| env[f] as f64).sum::<f64>();
            score(a).total_cmp(&score(b))
        })
        .unwrap_or(0);

    let reach = ((period / 8.0).round() as usize).max(1);
    let mut beats: Vec<usize> = steps(best_phase as f64)
        .map(|frame| {
            let lo = frame.saturating_sub(reach);
            let hi = (frame + reach + 1).min(env.len());
            (lo..hi)
                .max_by(|&a, &b| env[a].total_cmp(&env[b]).then(b.cmp(&a)))
                .unwrap_or(frame)
        })
        .collect();
    beats.dedup();
    beats
}
