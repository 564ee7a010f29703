mod media;

pub use media::FsMediaLibrary;

use rhythmforge_ports::storage::{
    ChartRecord, ChartStorePort, ChartSummary, SettingsDto, SettingsPort, StorageError,
};
use rhythmforge_ports::types::ChartRef;
use std::fs;
use std::path::{Path, PathBuf};

const CHART_EXT: &str = "json";

/// JSON files on disk: `settings.json` in the base directory and one
/// `<title>.json` per chart in the charts directory.
pub struct FsStorage {
    base_dir: PathBuf,
    charts_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        let charts_dir = base_dir.join("charts");
        Self {
            base_dir,
            charts_dir,
        }
    }

    pub fn with_charts_dir(mut self, charts_dir: PathBuf) -> Self {
        self.charts_dir = charts_dir;
        self
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("RhythmForge"))
    }

    /// Where downloaded media lands unless settings say otherwise.
    pub fn default_media_dir() -> PathBuf {
        dirs_next::audio_dir()
            .or_else(dirs_next::download_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("RhythmForge")
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn charts_dir(&self) -> &Path {
        &self.charts_dir
    }

    fn settings_path(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }

    /// Resolves a chart reference to a file inside the charts directory.
    /// Only the final path component is honoured.
    fn chart_path(&self, chart_ref: &ChartRef) -> Result<PathBuf, StorageError> {
        let name = Path::new(chart_ref.0.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.starts_with('.'))
            .ok_or_else(|| StorageError::NotFound(chart_ref.0.clone()))?;
        let has_ext = Path::new(name).extension().and_then(|e| e.to_str()) == Some(CHART_EXT);
        if has_ext {
            Ok(self.charts_dir.join(name))
        } else {
            Ok(self.charts_dir.join(format!("{name}.{CHART_EXT}")))
        }
    }

    fn chart_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = match fs::read_dir(&self.charts_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(CHART_EXT)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        let data = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
            _ => StorageError::Io(e.to_string()),
        })?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(base_dir)
    }
}

impl ChartStorePort for FsStorage {
    /// Writes `<title>.json`, replacing an existing chart of the same title.
    fn save_chart(&self, record: &ChartRecord) -> Result<ChartRef, StorageError> {
        let file_name = format!("{}.{CHART_EXT}", sanitize_file_stem(&record.song_title));
        let path = self.charts_dir.join(&file_name);
        Self::write_json(&path, record)?;
        log::info!("chart saved: {}", path.display());
        Ok(ChartRef(file_name))
    }

    fn load_chart(&self, chart_ref: &ChartRef) -> Result<ChartRecord, StorageError> {
        let path = self.chart_path(chart_ref)?;
        Self::read_json(&path)
    }

    fn list_charts(&self) -> Result<Vec<ChartSummary>, StorageError> {
        let mut charts = Vec::new();
        for path in self.chart_files()? {
            let record: ChartRecord = match Self::read_json(&path) {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("skipping unreadable chart {}: {err}", path.display());
                    continue;
                }
            };
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let note_count = if record.note_count > 0 {
                record.note_count
            } else {
                record.notes.len()
            };
            charts.push(ChartSummary {
                chart_ref: ChartRef(file_name),
                title: record.song_title,
                bpm: record.bpm,
                duration: record.duration,
                note_count,
            });
        }
        Ok(charts)
    }

    fn delete_chart(&self, chart_ref: &ChartRef) -> Result<(), StorageError> {
        let path = self.chart_path(chart_ref)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(chart_ref.0.clone()),
            _ => StorageError::Io(e.to_string()),
        })
    }

    fn delete_all_charts(&self) -> Result<usize, StorageError> {
        let mut deleted = 0;
        for path in self.chart_files()? {
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) => log::warn!("could not delete {}: {e}", path.display()),
            }
        }
        Ok(deleted)
    }
}

impl SettingsPort for FsStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(SettingsDto::default());
        }
        Self::read_json(&path)
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        let path = self.settings_path();
        Self::write_json(&path, s)
    }
}

/// Makes a chart title safe to use as a file stem.
pub fn sanitize_file_stem(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|ch| {
            if ch.is_control()
                || matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            {
                '_'
            } else {
                ch
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() {
        "chart".to_string()
    } else {
        cleaned
    }
}
