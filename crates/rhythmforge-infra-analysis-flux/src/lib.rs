//! Reference analysis provider: spectral-flux and energy onsets, tempo and
//! beats, computed on a centred STFT.

pub mod envelope;
pub mod peaks;
pub mod stft;
pub mod tempo;

use crate::envelope::{energy_rise, normalize, spectral_flux};
use crate::peaks::PeakPick;
use crate::stft::Stft;
use rhythmforge_ports::analysis::{
    AnalysisError, AnalysisReport, AudioAnalysisPort, OnsetSensitivity,
};
use rhythmforge_ports::types::{Seconds, Waveform};
use std::collections::BTreeMap;

/// Frame geometry is defined at this rate and scaled to the input rate so
/// frame timing stays the same.
pub const REFERENCE_RATE_HZ: u32 = 22_050;
pub const REFERENCE_HOP: usize = 512;
pub const REFERENCE_N_FFT: usize = 2048;

pub const METHOD_COMPLEX: &str = "complex";
pub const METHOD_ENERGY: &str = "energy";

#[derive(Clone, Copy, Debug, Default)]
pub struct FluxAnalyzer;

struct Envelopes {
    flux: Option<Vec<f32>>,
    energy: Option<Vec<f32>>,
    frame_rate: f64,
    hop_secs: f64,
}

impl FluxAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn geometry(sample_rate_hz: u32) -> (usize, usize) {
        let scale = sample_rate_hz as f64 / REFERENCE_RATE_HZ as f64;
        let hop = ((REFERENCE_HOP as f64 * scale).round() as usize).max(1);
        let n_fft = hop * (REFERENCE_N_FFT / REFERENCE_HOP);
        (n_fft, hop)
    }

    fn envelopes(&self, waveform: &Waveform) -> Result<Envelopes, AnalysisError> {
        if waveform.is_empty() {
            return Err(AnalysisError::EmptyWaveform);
        }
        if waveform.sample_rate_hz == 0 {
            return Err(AnalysisError::Backend("sample rate is zero".to_string()));
        }
        let (n_fft, hop) = Self::geometry(waveform.sample_rate_hz);
        let mut stft = Stft::new(n_fft, hop);
        let magnitudes = stft.magnitudes(&waveform.samples);
        let rms = stft.rms(&waveform.samples);
        let hop_secs = hop as f64 / waveform.sample_rate_hz as f64;
        Ok(Envelopes {
            flux: normalize(&spectral_flux(&magnitudes)),
            energy: normalize(&energy_rise(&rms)),
            frame_rate: 1.0 / hop_secs,
            hop_secs,
        })
    }
}

fn to_times(frames: &[usize], hop_secs: f64) -> Vec<Seconds> {
    frames.iter().map(|&f| f as f64 * hop_secs).collect()
}

fn pick(env: &Option<Vec<f32>>, params: &PeakPick, hop_secs: f64) -> Vec<Seconds> {
    env.as_deref()
        .map(|env| to_times(&params.pick(env), hop_secs))
        .unwrap_or_default()
}

impl AudioAnalysisPort for FluxAnalyzer {
    fn analyze(&self, waveform: &Waveform) -> Result<AnalysisReport, AnalysisError> {
        let env = self.envelopes(waveform)?;

        let mut onsets_by_method = BTreeMap::new();
        onsets_by_method.insert(
            METHOD_COMPLEX.to_string(),
            pick(&env.flux, &PeakPick::COMPLEX, env.hop_secs),
        );
        onsets_by_method.insert(
            METHOD_ENERGY.to_string(),
            pick(&env.energy, &PeakPick::ENERGY, env.hop_secs),
        );

        let (tempo, beat_times) = match env.flux.as_deref() {
            Some(flux) => match tempo::estimate_tempo(flux, env.frame_rate) {
                Some(bpm) => {
                    let beats = tempo::track_beats(flux, env.frame_rate, bpm);
                    (bpm, to_times(&beats, env.hop_secs))
                }
                None => (0.0, Vec::new()),
            },
            None => (0.0, Vec::new()),
        };

        log::info!(
            "analysis: {} complex / {} energy onsets, {:.1} bpm, {} beats",
            onsets_by_method[METHOD_COMPLEX].len(),
            onsets_by_method[METHOD_ENERGY].len(),
            tempo,
            beat_times.len()
        );
        Ok(AnalysisReport {
            onsets_by_method,
            tempo,
            beat_times,
        })
    }

    fn detect_onsets(
        &self,
        waveform: &Waveform,
        sensitivity: OnsetSensitivity,
    ) -> Result<Vec<Seconds>, AnalysisError> {
        let env = self.envelopes(waveform)?;
        let params = match sensitivity {
            OnsetSensitivity::Standard => PeakPick::COMPLEX,
            OnsetSensitivity::Loose => PeakPick::LOOSE,
        };
        Ok(pick(&env.flux, &params, env.hop_secs))
    }
}
