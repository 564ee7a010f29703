use hound::{SampleFormat, WavSpec, WavWriter};
use pretty_assertions::assert_eq;
use rhythmforge_infra_audio_symphonia::{ExtensionRouter, SymphoniaDecoder};
use rhythmforge_ports::audio::{AudioDecodePort, DecodeError};
use rhythmforge_ports::types::Waveform;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn wav_bytes<S: hound::Sample + Copy>(spec: WavSpec, samples: &[S]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rf-symphonia-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

struct Fixed(f32);

impl AudioDecodePort for Fixed {
    fn decode(&self, _path: &Path) -> Result<Waveform, DecodeError> {
        Ok(Waveform::new(vec![self.0], 1_000))
    }
}

#[test]
fn float_wav_matches_the_written_samples() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let samples: Vec<f32> = (0..8_000).map(|i| (i % 4) as f32 * 0.25).collect();

    let waveform = SymphoniaDecoder::new()
        .decode_bytes(wav_bytes(spec, &samples), Some("wav"))
        .unwrap();

    assert_eq!(waveform.sample_rate_hz, 8_000);
    assert_eq!(waveform.samples, samples);
}

#[test]
fn int16_stereo_is_mixed_to_mono() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let bytes = wav_bytes(spec, &[16384i16, 0, -32768, -32768, 0, 16384]);
    let path = scratch_file("stereo.wav", &bytes);

    let waveform = SymphoniaDecoder::new().decode(&path).unwrap();

    assert_eq!(waveform.sample_rate_hz, 22_050);
    assert_eq!(waveform.samples, vec![0.25, -1.0, 0.25]);
}

#[test]
fn missing_file_is_not_found() {
    let err = SymphoniaDecoder::new()
        .decode(Path::new("/definitely/not/here.mp3"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::NotFound(_)), "{err:?}");
}

#[test]
fn garbage_mp3_is_unsupported() {
    let path = scratch_file("noise.mp3", b"this is not an mpeg stream at all");
    let err = SymphoniaDecoder::new().decode(&path).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedFormat(_)), "{err:?}");
}

#[test]
fn router_sends_wav_to_the_wav_decoder_regardless_of_case() {
    let router = ExtensionRouter::new(Box::new(Fixed(1.0)), Box::new(Fixed(2.0)));

    assert_eq!(router.decode(Path::new("a.wav")).unwrap().samples, vec![1.0]);
    assert_eq!(router.decode(Path::new("b.WAV")).unwrap().samples, vec![1.0]);
    assert_eq!(router.decode(Path::new("c.mp3")).unwrap().samples, vec![2.0]);
    assert_eq!(router.decode(Path::new("no_extension")).unwrap().samples, vec![2.0]);
}

#[test]
fn router_surfaces_compressed_format_errors() {
    let path = scratch_file("routed.mp3", b"still not audio");
    let router = ExtensionRouter::new(Box::new(Fixed(1.0)), Box::new(SymphoniaDecoder::new()));

    let err = router.decode(&path).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedFormat(_)), "{err:?}");
}

#[test]
fn duration_comes_from_the_container_header() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 4_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let bytes = wav_bytes(spec, &vec![0i16; 2 * 6_000]);
    let path = scratch_file("header.wav", &bytes);

    let decoder = SymphoniaDecoder::new();
    assert_eq!(decoder.probe_duration(&path).unwrap(), 1.5);

    let router = ExtensionRouter::new(Box::new(Fixed(1.0)), Box::new(decoder));
    let renamed = scratch_file("header.flac.bin", &bytes);
    assert_eq!(router.probe_duration(&renamed).unwrap(), 1.5);
}
