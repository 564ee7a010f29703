use crate::storage::StorageError;
use crate::types::Seconds;
use serde::{Deserialize, Serialize};

/// File extensions the media library treats as playable audio.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "webm", "flac", "ogg"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioFileEntry {
    pub title: String,
    pub file_name: String,
    pub stem: String,
    pub path: String,
    /// Filled in by whoever can read the audio header; listings leave it empty.
    #[serde(default)]
    pub duration: Option<Seconds>,
    pub size_bytes: u64,
}

/// Downloaded and uploaded audio files. Paths passed to the delete
/// operations are reduced to their file name inside the library directory.
pub trait MediaLibraryPort: Send + Sync {
    fn list_audio(&self) -> Result<Vec<AudioFileEntry>, StorageError>;
    /// Returns the stem of the removed file.
    fn delete_audio(&self, path: &str) -> Result<String, StorageError>;
    fn delete_all_audio(&self) -> Result<usize, StorageError>;
}
