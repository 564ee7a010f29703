use crate::types::{Seconds, Waveform};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Decodes an audio file into a mono waveform at its native sample rate.
pub trait AudioDecodePort: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError>;

    /// Length of the file in seconds. Backends that can read it from the
    /// header should override this; the fallback decodes the whole file.
    fn probe_duration(&self, path: &Path) -> Result<Seconds, DecodeError> {
        self.decode(path).map(|waveform| waveform.duration_secs())
    }
}
