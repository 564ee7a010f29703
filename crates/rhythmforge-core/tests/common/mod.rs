#![allow(dead_code)]

use parking_lot::Mutex;
use rhythmforge_core::{AppCore, AppPorts, EventSink, ManualClock, Outbound};
use rhythmforge_ports::acquisition::{
    AcquiredMedia, AcquisitionError, AcquisitionProgress, MediaAcquisitionPort,
};
use rhythmforge_ports::analysis::{
    AnalysisError, AnalysisReport, AudioAnalysisPort, OnsetSensitivity,
};
use rhythmforge_ports::audio::{AudioDecodePort, DecodeError};
use rhythmforge_ports::media::{AudioFileEntry, MediaLibraryPort};
use rhythmforge_ports::storage::{
    ChartRecord, ChartStorePort, ChartSummary, NoteRecord, StorageError,
};
use rhythmforge_ports::types::{ChartRef, Seconds, SessionId, Waveform};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

#[derive(Default)]
pub struct MemoryStore {
    charts: Mutex<BTreeMap<String, ChartRecord>>,
}

impl MemoryStore {
    pub fn with(records: &[(&str, ChartRecord)]) -> Self {
        let store = Self::default();
        for (key, record) in records {
            store.charts.lock().insert(key.to_string(), record.clone());
        }
        store
    }

    pub fn len(&self) -> usize {
        self.charts.lock().len()
    }

    pub fn get(&self, key: &str) -> Option<ChartRecord> {
        self.charts.lock().get(key).cloned()
    }
}

impl ChartStorePort for MemoryStore {
    fn save_chart(&self, record: &ChartRecord) -> Result<ChartRef, StorageError> {
        let key = format!("{}.json", record.song_title);
        self.charts.lock().insert(key.clone(), record.clone());
        Ok(ChartRef(key))
    }

    fn load_chart(&self, chart_ref: &ChartRef) -> Result<ChartRecord, StorageError> {
        self.charts
            .lock()
            .get(&chart_ref.0)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(chart_ref.0.clone()))
    }

    fn list_charts(&self) -> Result<Vec<ChartSummary>, StorageError> {
        Ok(self
            .charts
            .lock()
            .iter()
            .map(|(key, r)| ChartSummary {
                chart_ref: ChartRef(key.clone()),
                title: r.song_title.clone(),
                bpm: r.bpm,
                duration: r.duration,
                note_count: r.notes.len(),
            })
            .collect())
    }

    fn delete_chart(&self, chart_ref: &ChartRef) -> Result<(), StorageError> {
        self.charts
            .lock()
            .remove(&chart_ref.0)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(chart_ref.0.clone()))
    }

    fn delete_all_charts(&self) -> Result<usize, StorageError> {
        let mut charts = self.charts.lock();
        let count = charts.len();
        charts.clear();
        Ok(count)
    }
}

/// Audio files by name, all under `/media`.
#[derive(Default)]
pub struct MemoryMedia {
    files: Mutex<BTreeMap<String, u64>>,
}

impl MemoryMedia {
    pub fn with(files: &[&str]) -> Self {
        let media = Self::default();
        for (i, name) in files.iter().enumerate() {
            media.files.lock().insert(name.to_string(), 1_000 * (i as u64 + 1));
        }
        media
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }
}

impl MediaLibraryPort for MemoryMedia {
    fn list_audio(&self) -> Result<Vec<AudioFileEntry>, StorageError> {
        Ok(self
            .files
            .lock()
            .iter()
            .map(|(name, &size_bytes)| {
                let stem = Path::new(name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                AudioFileEntry {
                    title: stem.clone(),
                    file_name: name.clone(),
                    stem,
                    path: format!("/media/{name}"),
                    duration: None,
                    size_bytes,
                }
            })
            .collect())
    }

    fn delete_audio(&self, path: &str) -> Result<String, StorageError> {
        let path = Path::new(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.files
            .lock()
            .remove(&name)
            .ok_or_else(|| StorageError::NotFound(name.clone()))?;
        Ok(path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default())
    }

    fn delete_all_audio(&self) -> Result<usize, StorageError> {
        let mut files = self.files.lock();
        let count = files.len();
        files.clear();
        Ok(count)
    }
}

/// Decodes every path to silence of a fixed length.
pub struct SilenceDecoder {
    pub seconds: f64,
}

impl AudioDecodePort for SilenceDecoder {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError> {
        if path.as_os_str().is_empty() {
            return Err(DecodeError::NotFound(String::new()));
        }
        let rate = 8_000;
        Ok(Waveform::new(
            vec![0.0; (self.seconds * rate as f64) as usize],
            rate,
        ))
    }
}

/// Signals when decoding starts and then waits to be released.
pub struct GatedDecoder {
    pub entered: Mutex<mpsc::Sender<()>>,
    pub release: Mutex<mpsc::Receiver<()>>,
}

impl AudioDecodePort for GatedDecoder {
    fn decode(&self, _path: &Path) -> Result<Waveform, DecodeError> {
        let _ = self.entered.lock().send(());
        let _ = self.release.lock().recv();
        Ok(Waveform::new(vec![0.0; 8_000 * 30], 8_000))
    }
}

pub struct FixedAnalyzer {
    pub onsets: Vec<Seconds>,
    pub beats: Vec<Seconds>,
    pub tempo: f64,
}

impl FixedAnalyzer {
    /// Onsets on the off-beats, beats every half second, for 30 seconds.
    pub fn steady() -> Self {
        Self {
            onsets: (0..60).map(|k| 0.25 + 0.5 * k as f64).collect(),
            beats: (0..60).map(|k| 0.5 * k as f64).collect(),
            tempo: 120.0,
        }
    }

    pub fn silent() -> Self {
        Self {
            onsets: Vec::new(),
            beats: Vec::new(),
            tempo: 0.0,
        }
    }
}

impl AudioAnalysisPort for FixedAnalyzer {
    fn analyze(&self, _waveform: &Waveform) -> Result<AnalysisReport, AnalysisError> {
        let mut onsets_by_method = BTreeMap::new();
        onsets_by_method.insert("complex".to_string(), self.onsets.clone());
        Ok(AnalysisReport {
            onsets_by_method,
            tempo: self.tempo,
            beat_times: self.beats.clone(),
        })
    }

    fn detect_onsets(
        &self,
        _waveform: &Waveform,
        _sensitivity: OnsetSensitivity,
    ) -> Result<Vec<Seconds>, AnalysisError> {
        Err(AnalysisError::Backend("loose detection unavailable".to_string()))
    }
}

pub struct ScriptedAcquirer {
    pub result: Result<AcquiredMedia, AcquisitionError>,
}

impl MediaAcquisitionPort for ScriptedAcquirer {
    fn fetch(
        &self,
        _source_ref: &str,
        on_progress: &mut dyn FnMut(AcquisitionProgress),
    ) -> Result<AcquiredMedia, AcquisitionError> {
        on_progress(AcquisitionProgress {
            percent: 50,
            message: "downloading".to_string(),
        });
        self.result.clone()
    }
}

pub fn media(title: &str) -> AcquiredMedia {
    AcquiredMedia {
        local_path: PathBuf::from(format!("/tmp/{title}.wav")),
        title: title.to_string(),
        duration_secs: Some(30.0),
    }
}

pub fn record(title: &str, notes: &[(f64, u8)]) -> ChartRecord {
    ChartRecord {
        song_title: title.to_string(),
        audio_file: format!("{title}.wav"),
        bpm: 120.0,
        duration: 30.0,
        notes: notes
            .iter()
            .map(|&(time, lane)| NoteRecord { time, lane })
            .collect(),
        note_count: notes.len(),
        lanes: 4,
        created_method: "balanced_beat".to_string(),
    }
}

pub fn conn(id: &str) -> SessionId {
    SessionId(id.to_string())
}

pub struct Harness {
    pub core: AppCore,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub async_events: Arc<Mutex<Vec<Outbound>>>,
}

impl Harness {
    pub fn new(store: MemoryStore) -> Self {
        Self::with_ports(
            store,
            Arc::new(SilenceDecoder { seconds: 30.0 }),
            Arc::new(FixedAnalyzer::steady()),
            None,
        )
    }

    pub fn with_media(store: MemoryStore, media: Arc<MemoryMedia>) -> Self {
        Self::build(
            store,
            Arc::new(SilenceDecoder { seconds: 30.0 }),
            Arc::new(FixedAnalyzer::steady()),
            None,
            Some(media),
        )
    }

    pub fn with_ports(
        store: MemoryStore,
        decoder: Arc<dyn AudioDecodePort>,
        analyzer: Arc<dyn AudioAnalysisPort>,
        acquirer: Option<Arc<dyn MediaAcquisitionPort>>,
    ) -> Self {
        Self::build(store, decoder, analyzer, acquirer, None)
    }

    fn build(
        store: MemoryStore,
        decoder: Arc<dyn AudioDecodePort>,
        analyzer: Arc<dyn AudioAnalysisPort>,
        acquirer: Option<Arc<dyn MediaAcquisitionPort>>,
        media: Option<Arc<MemoryMedia>>,
    ) -> Self {
        let store = Arc::new(store);
        let clock = Arc::new(ManualClock::new());
        let async_events = Arc::new(Mutex::new(Vec::new()));
        let captured = async_events.clone();
        let sink: EventSink = Arc::new(move |out: Outbound| captured.lock().push(out));
        let core = AppCore::new(
            AppPorts {
                charts: store.clone(),
                decoder,
                analyzer,
                acquirer,
                media: media.map(|m| m as Arc<dyn MediaLibraryPort>),
                settings: None,
            },
            clock.clone(),
            sink,
        );
        Self {
            core,
            clock,
            store,
            async_events,
        }
    }

    pub fn job_events(&self) -> Vec<Outbound> {
        self.async_events.lock().clone()
    }
}
