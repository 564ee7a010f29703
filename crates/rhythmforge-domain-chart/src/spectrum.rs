//! Per-note spectral band energies for the energy lane strategy.

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use rhythmforge_ports::types::{Seconds, Waveform, LANE_COUNT};
use std::sync::Arc;

/// Samples analysed around each note; shorter windows fall back to balancing.
pub const WINDOW_SIZE: usize = 512;

/// Frequency bands in Hz, mapped 1:1 to lanes 0..4 (bass to treble).
pub const BANDS_HZ: [(f64, f64); LANE_COUNT] = [
    (60.0, 250.0),
    (250.0, 1000.0),
    (1000.0, 4000.0),
    (4000.0, 12000.0),
];

pub type BandEnergies = [f64; LANE_COUNT];

pub struct BandAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    frame: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl BandAnalyzer {
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(WINDOW_SIZE);

        // Symmetric Hann.
        let denom = (WINDOW_SIZE - 1) as f32;
        let window = (0..WINDOW_SIZE)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / denom;
                0.5 - 0.5 * phase.cos()
            })
            .collect();

        Self {
            frame: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
            window,
        }
    }

    /// Energy per band of the window centred on `time`, or `None` when the
    /// window would run past either end of the waveform.
    pub fn band_energies(&mut self, waveform: &Waveform, time: Seconds) -> Option<BandEnergies> {
        if waveform.sample_rate_hz == 0 || !time.is_finite() || time < 0.0 {
            return None;
        }
        let center = (time * waveform.sample_rate_hz as f64) as usize;
        let start = center.saturating_sub(WINDOW_SIZE / 2);
        let end = (center + WINDOW_SIZE / 2).min(waveform.samples.len());
        if end <= start || end - start < WINDOW_SIZE {
            return None;
        }

        let segment = &waveform.samples[start..end];
        for ((dst, &sample), &w) in self.frame.iter_mut().zip(segment).zip(&self.window) {
            *dst = sample * w;
        }

        if let Err(e) =
            self.fft
                .process_with_scratch(&mut self.frame, &mut self.spectrum, &mut self.scratch)
        {
            log::debug!("band fft failed at {time:.3}s: {e:?}");
            return None;
        }

        let bin_hz = waveform.sample_rate_hz as f64 / WINDOW_SIZE as f64;
        let mut energies = [0.0f64; LANE_COUNT];
        // Nyquist bin excluded.
        for (k, bin) in self.spectrum.iter().take(WINDOW_SIZE / 2).enumerate() {
            let freq = k as f64 * bin_hz;
            let power = bin.norm_sqr() as f64;
            for (band, &(low, high)) in BANDS_HZ.iter().enumerate() {
                if freq >= low && freq <= high {
                    energies[band] += power;
                }
            }
        }
        Some(energies)
    }
}

impl Default for BandAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Band indices ordered by energy, highest first; ties keep the lower band first.
pub fn rank_bands(energies: &BandEnergies) -> [usize; LANE_COUNT] {
    let mut order = [0usize; LANE_COUNT];
    for (i, slot) in order.iter_mut().enumerate() {
        *slot = i;
    }
    order.sort_by(|&a, &b| energies[b].total_cmp(&energies[a]));
    order
}
