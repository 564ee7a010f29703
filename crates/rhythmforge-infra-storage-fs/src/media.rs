use rhythmforge_ports::media::{AudioFileEntry, MediaLibraryPort, AUDIO_EXTENSIONS};
use rhythmforge_ports::storage::StorageError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Audio files in a single flat directory, usually the acquisition output.
pub struct FsMediaLibrary {
    media_dir: PathBuf,
}

impl FsMediaLibrary {
    pub fn new(media_dir: PathBuf) -> Self {
        Self { media_dir }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    fn audio_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = match fs::read_dir(&self.media_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_audio(path))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Only the final component of `path` is used.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let name = Path::new(path.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.starts_with('.'))
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(self.media_dir.join(name))
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl MediaLibraryPort for FsMediaLibrary {
    fn list_audio(&self) -> Result<Vec<AudioFileEntry>, StorageError> {
        Ok(self
            .audio_files()?
            .into_iter()
            .map(|path| {
                let stem = file_stem(&path);
                AudioFileEntry {
                    title: stem.clone(),
                    file_name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    stem,
                    size_bytes: fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
                    path: path.to_string_lossy().into_owned(),
                    duration: None,
                }
            })
            .collect())
    }

    fn delete_audio(&self, path: &str) -> Result<String, StorageError> {
        let full = self.resolve(path)?;
        if !is_audio(&full) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        fs::remove_file(&full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(e.to_string()),
        })?;
        log::info!("audio deleted: {}", full.display());
        Ok(file_stem(&full))
    }

    fn delete_all_audio(&self) -> Result<usize, StorageError> {
        let mut deleted = 0;
        for path in self.audio_files()? {
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) => log::warn!("could not delete {}: {e}", path.display()),
            }
        }
        Ok(deleted)
    }
}
