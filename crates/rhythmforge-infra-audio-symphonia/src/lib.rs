//! Compressed-format decoding (MP3, FLAC) through symphonia, plus a router
//! that keeps WAV on its dedicated decoder.

use rhythmforge_ports::audio::{AudioDecodePort, DecodeError};
use rhythmforge_ports::types::{Seconds, Waveform};
use std::fs::File;
use std::io;
use std::path::Path;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes an in-memory file. `extension` is only a probing hint.
    pub fn decode_bytes(
        &self,
        bytes: Vec<u8>,
        extension: Option<&str>,
    ) -> Result<Waveform, DecodeError> {
        decode_source(Box::new(io::Cursor::new(bytes)), extension)
    }
}

impl AudioDecodePort for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError> {
        let file = open(path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        let waveform = decode_source(Box::new(file), extension)?;
        log::debug!(
            "decoded {}: {:.1}s at {} Hz",
            path.display(),
            waveform.duration_secs(),
            waveform.sample_rate_hz
        );
        Ok(waveform)
    }

    /// Reads the frame count from the container when it declares one.
    fn probe_duration(&self, path: &Path) -> Result<Seconds, DecodeError> {
        let file = open(path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        let format = probe(Box::new(file), extension)?;
        let declared = format
            .default_track()
            .and_then(|t| Some((t.codec_params.n_frames?, t.codec_params.sample_rate?)));
        match declared {
            Some((frames, rate)) if rate > 0 => Ok(frames as f64 / f64::from(rate)),
            _ => self.decode(path).map(|waveform| waveform.duration_secs()),
        }
    }
}

fn open(path: &Path) -> Result<File, DecodeError> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DecodeError::NotFound(path.display().to_string()),
        _ => DecodeError::Backend(e.to_string()),
    })
}

fn probe(
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
) -> Result<Box<dyn FormatReader>, DecodeError> {
    let stream = MediaSourceStream::new(source, Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(map_err)?;
    Ok(probed.format)
}

fn decode_source(
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
) -> Result<Waveform, DecodeError> {
    let mut format = probe(source, extension)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::UnsupportedFormat("no audio track".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(map_err)?;

    let mut samples = Vec::new();
    let mut buffer: Option<(SampleBuffer<f32>, SignalSpec, usize)> = None;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(map_err(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("skipping undecodable packet: {msg}");
                continue;
            }
            Err(e) => return Err(map_err(e)),
        };

        let spec = *decoded.spec();
        let frames = decoded.capacity();
        sample_rate.get_or_insert(spec.rate);
        let reuse = matches!(&buffer, Some((_, s, cap)) if *s == spec && *cap >= frames);
        if !reuse {
            buffer = Some((SampleBuffer::new(frames as u64, spec), spec, frames));
        }
        if let Some((buf, _, _)) = buffer.as_mut() {
            buf.copy_interleaved_ref(decoded);
            let channels = spec.channels.count().max(1);
            samples.extend(
                buf.samples()
                    .chunks_exact(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }
    }

    let sample_rate = sample_rate
        .ok_or_else(|| DecodeError::UnsupportedFormat("unknown sample rate".to_string()))?;
    Ok(Waveform::new(samples, sample_rate))
}

fn map_err(err: SymphoniaError) -> DecodeError {
    match err {
        SymphoniaError::IoError(e) if e.kind() == io::ErrorKind::NotFound => {
            DecodeError::NotFound(e.to_string())
        }
        SymphoniaError::Unsupported(what) => DecodeError::UnsupportedFormat(what.to_string()),
        SymphoniaError::DecodeError(what) => DecodeError::UnsupportedFormat(what.to_string()),
        other => DecodeError::Backend(other.to_string()),
    }
}

/// Sends `.wav` files to `wav` and everything else to `other`.
pub struct ExtensionRouter {
    wav: Box<dyn AudioDecodePort>,
    other: Box<dyn AudioDecodePort>,
}

impl ExtensionRouter {
    pub fn new(wav: Box<dyn AudioDecodePort>, other: Box<dyn AudioDecodePort>) -> Self {
        Self { wav, other }
    }
}

impl AudioDecodePort for ExtensionRouter {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError> {
        if is_wav(path) {
            self.wav.decode(path)
        } else {
            self.other.decode(path)
        }
    }

    fn probe_duration(&self, path: &Path) -> Result<Seconds, DecodeError> {
        if is_wav(path) {
            self.wav.probe_duration(path)
        } else {
            self.other.probe_duration(path)
        }
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}
