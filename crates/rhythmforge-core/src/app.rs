use crate::clock::Clock;
use crate::generation::{ChartGenerator, GenerationRequest};
use crate::ipc::{Command, ErrorPayload, Event, JobKind, Outbound};
use crate::jobs::{CancelToken, EventSink, JobHandle, JobRegistry};
use crate::session::{GameSession, SessionError};
use crate::sessions::{SessionManager, SharedSession};
use rhythmforge_domain_chart::{Chart, ChartError, GenerationMethod};
use rhythmforge_domain_eval::{AutoMissOutcome, GameStats, Tier};
use rhythmforge_ports::acquisition::{AcquisitionProgress, MediaAcquisitionPort};
use rhythmforge_ports::analysis::AudioAnalysisPort;
use rhythmforge_ports::audio::AudioDecodePort;
use rhythmforge_ports::media::MediaLibraryPort;
use rhythmforge_ports::storage::{ChartStorePort, SettingsDto, SettingsPort, StorageError};
use rhythmforge_ports::types::{ChartRef, JobId, Lane, Seconds, SessionId};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("acquisition failure: {0}")]
    Acquisition(String),
    #[error("audio file not found: {0}")]
    AudioNotFound(String),
    #[error("no media library configured")]
    NoMediaLibrary,
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("failed to start background job: {0}")]
    JobSpawn(String),
}

impl AppError {
    /// Stable cause code carried in error events.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Session(SessionError::ChartNotFound(_)) => "chart_not_found",
            AppError::Session(SessionError::ChartInvalid(_)) => "chart_invalid",
            AppError::Session(SessionError::InvalidState { .. }) => "invalid_state",
            AppError::SessionNotFound(_) => "session_not_found",
            AppError::Storage(StorageError::NotFound(_)) => "chart_not_found",
            AppError::Storage(_) => "storage_failed",
            AppError::Chart(ChartError::NoOnsetsDetected) => "no_onsets_detected",
            AppError::Chart(ChartError::Invalid(_)) => "chart_invalid",
            AppError::InvalidSettings(_) => "invalid_settings",
            AppError::Acquisition(_) => "acquisition_failure",
            AppError::AudioNotFound(_) => "audio_not_found",
            AppError::NoMediaLibrary => "storage_failed",
            AppError::InvalidCommand(_) => "invalid_command",
            AppError::JobSpawn(_) => "job_spawn_failed",
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            cause: None,
        }
    }
}

/// External collaborators the core drives.
pub struct AppPorts {
    pub charts: Arc<dyn ChartStorePort>,
    pub decoder: Arc<dyn AudioDecodePort>,
    pub analyzer: Arc<dyn AudioAnalysisPort>,
    pub acquirer: Option<Arc<dyn MediaAcquisitionPort>>,
    pub media: Option<Arc<dyn MediaLibraryPort>>,
    pub settings: Option<Box<dyn SettingsPort>>,
}

pub struct AppCore {
    ports: AppPorts,
    settings: SettingsDto,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
    jobs: JobRegistry,
    job_handles: Vec<JobHandle>,
    sink: EventSink,
    events: VecDeque<Outbound>,
}

impl AppCore {
    pub fn new(ports: AppPorts, clock: Arc<dyn Clock>, sink: EventSink) -> Self {
        let settings = match ports.settings.as_ref() {
            Some(store) => store.load_settings().unwrap_or_else(|err| {
                log::warn!("failed to load settings, using defaults: {err}");
                SettingsDto::default()
            }),
            None => SettingsDto::default(),
        };
        let settings = if settings.judgment_tolerances.is_valid() {
            settings
        } else {
            log::warn!("stored judgment tolerances are invalid, using defaults");
            SettingsDto {
                judgment_tolerances: SettingsDto::default().judgment_tolerances,
                ..settings
            }
        };

        Self {
            ports,
            settings,
            sessions: SessionManager::new(),
            clock,
            jobs: JobRegistry::new(),
            job_handles: Vec::new(),
            sink,
            events: VecDeque::new(),
        }
    }

    pub fn settings(&self) -> &SettingsDto {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Handles a command and turns any failure into an error event for the
    /// same connection.
    pub fn dispatch(&mut self, connection: &SessionId, cmd: Command) {
        let is_session = cmd.is_session_command();
        if let Err(err) = self.handle_command(connection, cmd) {
            log::warn!("command from {connection} failed: {err}");
            let error = err.payload();
            let event = if is_session {
                Event::GameError { error }
            } else {
                Event::Error { error }
            };
            self.push(connection, event);
        }
    }

    pub fn handle_command(&mut self, connection: &SessionId, cmd: Command) -> Result<(), AppError> {
        match cmd {
            Command::Connect => {
                if !self.sessions.contains(connection) {
                    self.sessions.insert(self.new_session(connection));
                }
                log::info!("client connected: {connection}");
                self.push(
                    connection,
                    Event::Connected {
                        message: "connected".to_string(),
                    },
                );
            }
            Command::Disconnect => {
                if let Some(session) = self.sessions.destroy(connection) {
                    session.lock().end();
                }
                log::info!("client disconnected: {connection}");
            }
            Command::StartGame { chart_ref } => self.start_game(connection, chart_ref)?,
            Command::HitNote {
                lane,
                time,
                note_time,
            } => {
                let session = self.session(connection)?;
                let mut session = session.lock();
                let outcome = session.hit(lane)?;
                let event = judgment_event(
                    lane,
                    outcome.tier,
                    outcome.is_hit(),
                    note_time.unwrap_or(time),
                    session.stats(),
                );
                drop(session);
                self.push(connection, event);
            }
            Command::AutoMiss { lane, note_time } => {
                let session = self.session(connection)?;
                let mut session = session.lock();
                let outcome = session.auto_miss(lane, note_time)?;
                if outcome == AutoMissOutcome::NoMatch {
                    log::debug!("auto miss on lane {lane} at {note_time:.3}s matched nothing");
                }
                let event = judgment_event(lane, Tier::Miss, false, note_time, session.stats());
                drop(session);
                self.push(connection, event);
            }
            Command::PauseGame => {
                self.session(connection)?.lock().pause();
                self.push(connection, Event::GamePaused);
            }
            Command::ResumeGame => {
                self.session(connection)?.lock().resume();
                self.push(connection, Event::GameResumed);
            }
            Command::EndGame => {
                let results = {
                    let session = self.session(connection)?;
                    let mut session = session.lock();
                    session.end();
                    session.results()
                };
                self.push(connection, Event::GameEnded { results });
            }
            Command::GetGameState => {
                let snapshot = self.session(connection)?.lock().snapshot();
                self.push(
                    connection,
                    Event::GameState {
                        state: snapshot.state,
                        is_playing: snapshot.is_playing,
                        is_paused: snapshot.is_paused,
                        current_time: snapshot.current_time,
                        stats: snapshot.stats,
                    },
                );
            }
            Command::GenerateChart {
                audio_path,
                song_title,
                method,
                seed,
            } => {
                let method = GenerationMethod::from_name(
                    method.as_deref().unwrap_or(&self.settings.default_method),
                );
                let request = GenerationRequest {
                    audio_path: PathBuf::from(audio_path),
                    song_title,
                    method,
                    seed,
                };
                self.start_generation(connection, request)?;
            }
            Command::FetchMedia { source_ref } => self.start_fetch(connection, source_ref)?,
            Command::CancelJob { job_id } => {
                let active = self.jobs.cancel(job_id);
                self.push(connection, Event::JobCancelRequested { job_id, active });
            }
            Command::ListCharts => {
                let charts = self.ports.charts.list_charts()?;
                self.push(connection, Event::Charts { charts });
            }
            Command::GetChart { chart_ref } => {
                let record = self.ports.charts.load_chart(&chart_ref)?;
                let chart = Chart::from_record(record)?;
                self.push(
                    connection,
                    Event::Chart {
                        chart_ref,
                        chart: chart.to_record(),
                    },
                );
            }
            Command::DeleteChart { chart_ref } => {
                self.ports.charts.delete_chart(&chart_ref)?;
                log::info!("deleted chart {chart_ref}");
                self.push(connection, Event::ChartDeleted { chart_ref });
            }
            Command::DeleteAllCharts => {
                let count = self.ports.charts.delete_all_charts()?;
                log::info!("deleted {count} charts");
                self.push(connection, Event::ChartsDeleted { count });
            }
            Command::DeleteCharts { chart_refs } => {
                if chart_refs.is_empty() {
                    return Err(AppError::InvalidCommand("no charts given".to_string()));
                }
                let count = chart_refs
                    .iter()
                    .filter(|chart_ref| self.delete_chart_quietly(chart_ref))
                    .count();
                log::info!("deleted {count} of {} charts", chart_refs.len());
                self.push(connection, Event::ChartsDeleted { count });
            }
            Command::ListAudioFiles => {
                let mut files = self.media()?.list_audio()?;
                for file in &mut files {
                    file.duration = match self.ports.decoder.probe_duration(Path::new(&file.path)) {
                        Ok(duration) => Some(duration),
                        Err(err) => {
                            log::debug!("no duration for {}: {err}", file.file_name);
                            None
                        }
                    };
                }
                self.push(connection, Event::AudioFiles { files });
            }
            Command::DeleteAudio { path } => {
                let stem = self.media()?.delete_audio(&path).map_err(audio_error)?;
                let charts_deleted = self.delete_charts_for(&stem);
                log::info!("deleted audio {path} and {charts_deleted} related charts");
                self.push(
                    connection,
                    Event::AudioDeleted {
                        path,
                        charts_deleted,
                    },
                );
            }
            Command::DeleteAudioFiles { paths } => {
                if paths.is_empty() {
                    return Err(AppError::InvalidCommand("no audio files given".to_string()));
                }
                let media = self.media()?;
                let mut deleted_count = 0;
                let mut charts_deleted = 0;
                for path in &paths {
                    match media.delete_audio(path) {
                        Ok(stem) => {
                            deleted_count += 1;
                            charts_deleted += self.delete_charts_for(&stem);
                        }
                        Err(err) => log::warn!("could not delete audio {path}: {err}"),
                    }
                }
                self.push(
                    connection,
                    Event::AudioFilesDeleted {
                        deleted_count,
                        charts_deleted,
                    },
                );
            }
            Command::DeleteAllAudio => {
                let deleted_count = self.media()?.delete_all_audio()?;
                let charts_deleted = self.ports.charts.delete_all_charts()?;
                log::info!("deleted {deleted_count} audio files and {charts_deleted} charts");
                self.push(
                    connection,
                    Event::AudioFilesDeleted {
                        deleted_count,
                        charts_deleted,
                    },
                );
            }
            Command::GetSettings => {
                let settings = self.settings.clone();
                self.push(
                    connection,
                    Event::Settings {
                        settings,
                        restart_required: false,
                    },
                );
            }
            Command::UpdateSettings { settings } => {
                validate_settings(&settings)?;
                if let Some(store) = self.ports.settings.as_ref() {
                    store.save_settings(&settings)?;
                }
                // Storage and acquisition directories are bound when the ports are built.
                let restart_required = settings.charts_dir != self.settings.charts_dir
                    || settings.media_dir != self.settings.media_dir;
                if restart_required {
                    log::warn!("directory settings changed; they apply after a restart");
                }
                self.settings = settings;
                let settings = self.settings.clone();
                self.push(
                    connection,
                    Event::Settings {
                        settings,
                        restart_required,
                    },
                );
            }
        }
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<Outbound> {
        self.events.drain(..).collect()
    }

    /// Waits for every background job spawned so far.
    pub fn join_jobs(&mut self) {
        for handle in self.job_handles.drain(..) {
            let id = handle.id;
            if handle.join().is_err() {
                log::error!("{id} panicked");
            }
        }
    }

    fn start_game(&mut self, connection: &SessionId, chart_ref: ChartRef) -> Result<(), AppError> {
        let mut session = self.new_session(connection);
        session.load(self.ports.charts.as_ref(), &chart_ref)?;
        session.start()?;
        let chart = session
            .chart()
            .map(Chart::to_record)
            .ok_or_else(|| ChartError::Invalid("session has no chart".to_string()))?;
        let start_time = session.results().start_time;
        if let Some(previous) = self.sessions.insert(session) {
            previous.lock().end();
        }
        self.push(
            connection,
            Event::GameStarted {
                chart_ref,
                chart,
                start_time,
            },
        );
        Ok(())
    }

    fn start_generation(
        &mut self,
        connection: &SessionId,
        request: GenerationRequest,
    ) -> Result<(), AppError> {
        let charts = self.ports.charts.clone();
        let decoder = self.ports.decoder.clone();
        let analyzer = self.ports.analyzer.clone();
        let settings = self.settings.generation;
        let sink = self.sink.clone();
        let owner = connection.clone();

        self.spawn_job(connection, JobKind::GenerateChart, move |job_id, token| {
            let emit = |event: Event| {
                sink(Outbound {
                    connection: owner.clone(),
                    event,
                })
            };
            let generator =
                ChartGenerator::new(decoder.as_ref(), analyzer.as_ref(), charts.as_ref(), settings);
            let result = generator.generate(
                &request,
                &|| token.is_cancelled(),
                &mut |status, message| {
                    emit(Event::ChartProgress {
                        job_id,
                        status: status.to_string(),
                        message: message.to_string(),
                    })
                },
            );
            match result {
                Ok(done) => emit(Event::ChartGenerated {
                    job_id,
                    chart_ref: done.chart_ref,
                    chart: done.chart.to_record(),
                    method_used: request.method.as_str().to_string(),
                }),
                Err(err) => {
                    log::warn!("{job_id} failed: {err}");
                    emit(Event::ChartFailed {
                        job_id,
                        error: ErrorPayload {
                            code: err.code().to_string(),
                            message: err.to_string(),
                            cause: None,
                        },
                    })
                }
            }
        })
    }

    fn start_fetch(&mut self, connection: &SessionId, source_ref: String) -> Result<(), AppError> {
        let acquirer = self
            .ports
            .acquirer
            .clone()
            .ok_or_else(|| AppError::Acquisition("no media acquisition backend".to_string()))?;
        let sink = self.sink.clone();
        let owner = connection.clone();

        self.spawn_job(connection, JobKind::FetchMedia, move |job_id, token| {
            let emit = |event: Event| {
                sink(Outbound {
                    connection: owner.clone(),
                    event,
                })
            };
            let mut on_progress = |progress: AcquisitionProgress| {
                if !token.is_cancelled() {
                    emit(Event::DownloadProgress {
                        job_id,
                        percent: progress.percent,
                        message: progress.message,
                    });
                }
            };
            let result = acquirer.fetch(&source_ref, &mut on_progress);
            let event = match result {
                Ok(_) if token.is_cancelled() => Event::DownloadFailed {
                    job_id,
                    error: ErrorPayload {
                        code: "cancelled".to_string(),
                        message: "download cancelled".to_string(),
                        cause: None,
                    },
                },
                Ok(media) => Event::DownloadCompleted {
                    job_id,
                    title: media.title,
                    path: media.local_path.to_string_lossy().into_owned(),
                    duration: media.duration_secs,
                },
                Err(err) => {
                    log::warn!("{job_id} failed: {err}");
                    Event::DownloadFailed {
                        job_id,
                        error: ErrorPayload {
                            code: "acquisition_failure".to_string(),
                            message: err.to_string(),
                            cause: Some(err.code().to_string()),
                        },
                    }
                }
            };
            emit(event);
        })
    }

    fn spawn_job<F>(&mut self, connection: &SessionId, kind: JobKind, work: F) -> Result<(), AppError>
    where
        F: FnOnce(JobId, CancelToken) + Send + 'static,
    {
        self.job_handles.retain(|h| !h.is_finished());
        let sink = self.sink.clone();
        let owner = connection.clone();
        let handle = self
            .jobs
            .spawn(kind, move |job_id, token| {
                sink(Outbound {
                    connection: owner,
                    event: Event::JobStarted { job_id, kind },
                });
                work(job_id, token);
            })
            .map_err(|e| AppError::JobSpawn(e.to_string()))?;
        log::info!("{} started ({kind:?}) for {connection}", handle.id);
        self.job_handles.push(handle);
        Ok(())
    }

    fn media(&self) -> Result<Arc<dyn MediaLibraryPort>, AppError> {
        self.ports.media.clone().ok_or(AppError::NoMediaLibrary)
    }

    /// Returns whether the chart was removed; failures are only logged.
    fn delete_chart_quietly(&self, chart_ref: &ChartRef) -> bool {
        match self.ports.charts.delete_chart(chart_ref) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("could not delete chart {chart_ref}: {err}");
                false
            }
        }
    }

    /// Deletes charts whose file stem starts with `audio_stem`.
    fn delete_charts_for(&self, audio_stem: &str) -> usize {
        if audio_stem.is_empty() {
            return 0;
        }
        let charts = match self.ports.charts.list_charts() {
            Ok(charts) => charts,
            Err(err) => {
                log::warn!("could not list charts for {audio_stem}: {err}");
                return 0;
            }
        };
        charts
            .iter()
            .filter(|summary| {
                let name = summary.chart_ref.0.as_str();
                name.strip_suffix(".json")
                    .unwrap_or(name)
                    .starts_with(audio_stem)
            })
            .filter(|summary| self.delete_chart_quietly(&summary.chart_ref))
            .count()
    }

    fn new_session(&self, connection: &SessionId) -> GameSession {
        GameSession::new(
            connection.clone(),
            self.settings.judgment_tolerances,
            self.clock.clone(),
        )
    }

    fn session(&self, connection: &SessionId) -> Result<SharedSession, AppError> {
        self.sessions
            .get(connection)
            .ok_or_else(|| AppError::SessionNotFound(connection.clone()))
    }

    fn push(&mut self, connection: &SessionId, event: Event) {
        self.events.push_back(Outbound {
            connection: connection.clone(),
            event,
        });
    }
}

fn audio_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(path) => AppError::AudioNotFound(path),
        other => AppError::Storage(other),
    }
}

fn judgment_event(
    lane: Lane,
    tier: Tier,
    hit: bool,
    note_time: Seconds,
    stats: &GameStats,
) -> Event {
    Event::NoteJudgment {
        lane,
        judgment: tier,
        hit,
        score: stats.score,
        combo: stats.combo,
        max_combo: stats.max_combo,
        accuracy: stats.accuracy(),
        judgments: stats.judgments,
        note_time,
    }
}

/// Rejects settings that would break judgment or generation.
pub fn validate_settings(settings: &SettingsDto) -> Result<(), AppError> {
    let t = &settings.judgment_tolerances;
    if !t.is_valid() {
        return Err(AppError::InvalidSettings(format!(
            "judgment tolerances must be positive and ascending, got {}/{}/{}",
            t.perfect, t.great, t.good
        )));
    }
    let g = &settings.generation;
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(g.min_interval) || !positive(g.escalation_min_interval) {
        return Err(AppError::InvalidSettings(
            "onset intervals must be positive".to_string(),
        ));
    }
    if !g.start_delay.is_finite() || g.start_delay < 0.0 {
        return Err(AppError::InvalidSettings(
            "start delay must be non-negative".to_string(),
        ));
    }
    if !positive(g.min_grid_tempo) {
        return Err(AppError::InvalidSettings(
            "minimum grid tempo must be positive".to_string(),
        ));
    }
    if GenerationMethod::parse(&settings.default_method).is_none() {
        log::warn!(
            "default method '{}' is not recognised, balanced_beat will be used",
            settings.default_method
        );
    }
    Ok(())
}
