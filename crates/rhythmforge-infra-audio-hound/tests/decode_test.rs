use hound::{SampleFormat, WavSpec, WavWriter};
use pretty_assertions::assert_eq;
use rhythmforge_infra_audio_hound::HoundDecoder;
use rhythmforge_ports::audio::{AudioDecodePort, DecodeError};
use std::io::Cursor;
use std::path::Path;

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

#[test]
fn int16_stereo_is_mixed_to_mono() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let bytes = wav_bytes(spec, &[16384i16, 0, -32768, -32768, 0, 16384]);

    let waveform = HoundDecoder::new().decode_reader(Cursor::new(bytes)).unwrap();

    assert_eq!(waveform.sample_rate_hz, 22_050);
    assert_eq!(waveform.samples, vec![0.25, -1.0, 0.25]);
}

#[test]
fn float_mono_passes_through() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let samples: Vec<f32> = (0..8_000).map(|i| (i % 4) as f32 * 0.25).collect();
    let bytes = wav_bytes(spec, &samples);

    let waveform = HoundDecoder::new().decode_reader(Cursor::new(bytes)).unwrap();

    assert_eq!(waveform.samples, samples);
    assert_eq!(waveform.duration_secs(), 1.0);
}

#[test]
fn garbage_is_rejected() {
    let err = HoundDecoder::new()
        .decode_reader(Cursor::new(b"definitely not a wav file".to_vec()))
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::UnsupportedFormat(_) | DecodeError::Backend(_)
    ));
}

#[test]
fn missing_file_is_not_found() {
    let err = HoundDecoder::new()
        .decode(Path::new("/definitely/not/here.wav"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::NotFound(_)));
}

#[test]
fn duration_is_read_from_the_header() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let dir = std::env::temp_dir().join(format!("rf-hound-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("two_seconds.wav");
    std::fs::write(&path, wav_bytes(spec, &vec![0i16; 2 * 16_000])).unwrap();

    assert_eq!(HoundDecoder::new().probe_duration(&path).unwrap(), 2.0);
}
