use hound::{SampleFormat, WavReader};
use rhythmforge_ports::audio::{AudioDecodePort, DecodeError};
use rhythmforge_ports::types::{Seconds, Waveform};
use std::io::Read;
use std::path::Path;

/// WAV decoder: integer or float PCM, any channel count, mixed down to mono.
#[derive(Clone, Copy, Debug, Default)]
pub struct HoundDecoder;

impl HoundDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode_reader<R: Read>(&self, reader: R) -> Result<Waveform, DecodeError> {
        let reader = WavReader::new(reader).map_err(map_err)?;
        read_mono(reader)
    }
}

impl AudioDecodePort for HoundDecoder {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError> {
        if !path.exists() {
            return Err(DecodeError::NotFound(path.display().to_string()));
        }
        let reader = WavReader::open(path).map_err(map_err)?;
        let waveform = read_mono(reader)?;
        log::debug!(
            "decoded {}: {:.1}s at {} Hz",
            path.display(),
            waveform.duration_secs(),
            waveform.sample_rate_hz
        );
        Ok(waveform)
    }

    fn probe_duration(&self, path: &Path) -> Result<Seconds, DecodeError> {
        if !path.exists() {
            return Err(DecodeError::NotFound(path.display().to_string()));
        }
        let reader = WavReader::open(path).map_err(map_err)?;
        let rate = reader.spec().sample_rate.max(1);
        Ok(f64::from(reader.duration()) / f64::from(rate))
    }
}

fn read_mono<R: Read>(mut reader: WavReader<R>) -> Result<Waveform, DecodeError> {
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(map_err)?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(DecodeError::UnsupportedFormat(format!(
                    "{}-bit integer samples",
                    spec.bits_per_sample
                )));
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(map_err)?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    Ok(Waveform::new(samples, spec.sample_rate))
}

fn map_err(err: hound::Error) -> DecodeError {
    match err {
        hound::Error::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
            DecodeError::NotFound(e.to_string())
        }
        hound::Error::FormatError(msg) => DecodeError::UnsupportedFormat(msg.to_string()),
        hound::Error::Unsupported => DecodeError::UnsupportedFormat("unsupported wav".to_string()),
        other => DecodeError::Backend(other.to_string()),
    }
}
