use crate::session::SessionState;
use rhythmforge_domain_eval::{GameResults, JudgmentCounts, Tier};
use rhythmforge_ports::media::AudioFileEntry;
use rhythmforge_ports::storage::{ChartRecord, ChartSummary, SettingsDto};
use rhythmforge_ports::types::{ChartRef, JobId, Lane, Seconds, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Command {
    Connect,
    Disconnect,
    StartGame {
        #[serde(alias = "chart_path")]
        chart_ref: ChartRef,
    },
    HitNote {
        lane: Lane,
        time: Seconds,
        #[serde(default)]
        note_time: Option<Seconds>,
    },
    AutoMiss {
        lane: Lane,
        note_time: Seconds,
    },
    PauseGame,
    ResumeGame,
    EndGame,
    GetGameState,
    GenerateChart {
        audio_path: String,
        #[serde(default)]
        song_title: Option<String>,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        seed: Option<u64>,
    },
    FetchMedia {
        source_ref: String,
    },
    CancelJob {
        job_id: JobId,
    },
    ListCharts,
    GetChart {
        chart_ref: ChartRef,
    },
    DeleteChart {
        chart_ref: ChartRef,
    },
    DeleteAllCharts,
    DeleteCharts {
        #[serde(alias = "chart_paths")]
        chart_refs: Vec<ChartRef>,
    },
    ListAudioFiles,
    /// Also removes charts whose file stem starts with the audio stem.
    DeleteAudio {
        #[serde(alias = "audio_path")]
        path: String,
    },
    DeleteAudioFiles {
        #[serde(alias = "audio_paths")]
        paths: Vec<String>,
    },
    /// Removes every audio file and every chart.
    DeleteAllAudio,
    GetSettings,
    UpdateSettings {
        settings: SettingsDto,
    },
}

impl Command {
    /// Session commands report failures as `game_error`.
    pub fn is_session_command(&self) -> bool {
        matches!(
            self,
            Command::StartGame { .. }
                | Command::HitNote { .. }
                | Command::AutoMiss { .. }
                | Command::PauseGame
                | Command::ResumeGame
                | Command::EndGame
                | Command::GetGameState
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    /// Classified acquisition cause, when the failure came from a download.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    GenerateChart,
    FetchMedia,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Event {
    Connected {
        message: String,
    },
    GameStarted {
        chart_ref: ChartRef,
        chart: ChartRecord,
        start_time: Option<f64>,
    },
    NoteJudgment {
        lane: Lane,
        judgment: Tier,
        hit: bool,
        score: u64,
        combo: u32,
        max_combo: u32,
        accuracy: f64,
        judgments: JudgmentCounts,
        note_time: Seconds,
    },
    GamePaused,
    GameResumed,
    GameEnded {
        results: GameResults,
    },
    GameError {
        error: ErrorPayload,
    },
    GameState {
        state: SessionState,
        is_playing: bool,
        is_paused: bool,
        current_time: Seconds,
        stats: Option<GameResults>,
    },
    JobStarted {
        job_id: JobId,
        kind: JobKind,
    },
    JobCancelRequested {
        job_id: JobId,
        active: bool,
    },
    ChartProgress {
        job_id: JobId,
        status: String,
        message: String,
    },
    ChartGenerated {
        job_id: JobId,
        chart_ref: ChartRef,
        chart: ChartRecord,
        method_used: String,
    },
    ChartFailed {
        job_id: JobId,
        error: ErrorPayload,
    },
    DownloadProgress {
        job_id: JobId,
        percent: u8,
        message: String,
    },
    DownloadCompleted {
        job_id: JobId,
        title: String,
        path: String,
        duration: Option<f64>,
    },
    DownloadFailed {
        job_id: JobId,
        error: ErrorPayload,
    },
    Charts {
        charts: Vec<ChartSummary>,
    },
    Chart {
        chart_ref: ChartRef,
        chart: ChartRecord,
    },
    ChartDeleted {
        chart_ref: ChartRef,
    },
    ChartsDeleted {
        count: usize,
    },
    AudioFiles {
        files: Vec<AudioFileEntry>,
    },
    AudioDeleted {
        path: String,
        charts_deleted: usize,
    },
    AudioFilesDeleted {
        deleted_count: usize,
        charts_deleted: usize,
    },
    Settings {
        settings: SettingsDto,
        /// Set when a changed directory only takes effect after a restart.
        #[serde(default)]
        restart_required: bool,
    },
    Error {
        error: ErrorPayload,
    },
}

/// An event addressed to one connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    pub connection: SessionId,
    pub event: Event,
}
