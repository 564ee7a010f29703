use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Centred short-time transform: frame `t` covers `t * hop` +/- `n_fft / 2`,
/// zero padded at both ends.
pub struct Stft {
    n_fft: usize,
    hop: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    frame: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        // Periodic Hann.
        let window = (0..n_fft)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / n_fft as f32;
                0.5 - 0.5 * phase.cos()
            })
            .collect();
        Self {
            n_fft,
            hop,
            frame: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
            window,
        }
    }

    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            1 + len / self.hop
        }
    }

    /// Magnitude spectra, one `n_fft / 2 + 1` row per frame.
    pub fn magnitudes(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        let frames = self.frame_count(samples.len());
        let mut out = Vec::with_capacity(frames);
        for t in 0..frames {
            fill_centred(&mut self.frame, samples, t * self.hop);
            for (x, w) in self.frame.iter_mut().zip(&self.window) {
                *x *= w;
            }
            let row = match self.fft.process_with_scratch(
                &mut self.frame,
                &mut self.spectrum,
                &mut self.scratch,
            ) {
                Ok(()) => self.spectrum.iter().map(|c| c.norm()).collect(),
                Err(e) => {
                    log::debug!("stft frame {t} failed: {e:?}");
                    vec![0.0; self.n_fft / 2 + 1]
                }
            };
            out.push(row);
        }
        out
    }

    /// Root-mean-square level of each (unwindowed) frame.
    pub fn rms(&mut self, samples: &[f32]) -> Vec<f32> {
        let frames = self.frame_count(samples.len());
        (0..frames)
            .map(|t| {
                fill_centred(&mut self.frame, samples, t * self.hop);
                let power: f32 = self.frame.iter().map(|x| x * x).sum();
                (power / self.n_fft as f32).sqrt()
            })
            .collect()
    }
}

fn fill_centred(frame: &mut [f32], samples: &[f32], centre: usize) {
    let half = frame.len() / 2;
    for (i, slot) in frame.iter_mut().enumerate() {
        let idx = (centre + i).checked_sub(half);
        *slot = idx.and_then(|j| samples.get(j)).copied().unwrap_or(0.0);
    }
}
