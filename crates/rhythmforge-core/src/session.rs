use crate::clock::Clock;
use rhythmforge_domain_chart::{Chart, ChartError};
use rhythmforge_domain_eval::{
    AutoMissOutcome, GameResults, GameStats, HitOutcome, JudgmentEngine, Playfield,
};
use rhythmforge_ports::storage::{ChartStorePort, StorageError};
use rhythmforge_ports::types::{ChartRef, Lane, Seconds, SessionId, ToleranceConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Loaded,
    Playing,
    Paused,
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Loaded => "loaded",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::Ended => "ended",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("chart not found: {0}")]
    ChartNotFound(String),
    #[error("chart invalid: {0}")]
    ChartInvalid(String),
    #[error("cannot {op} while {state}")]
    InvalidState { op: &'static str, state: SessionState },
}

/// Snapshot reported by `get_game_state`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub state: SessionState,
    pub is_playing: bool,
    pub is_paused: bool,
    pub current_time: Seconds,
    pub stats: Option<GameResults>,
}

/// One player's run through one chart.
///
/// Elapsed time excludes paused spans: it stands still while `Paused` and is
/// frozen at the end instant once `Ended`.
pub struct GameSession {
    id: SessionId,
    clock: Arc<dyn Clock>,
    engine: JudgmentEngine,
    state: SessionState,
    chart_ref: Option<ChartRef>,
    chart: Option<Chart>,
    playfield: Playfield,
    stats: GameStats,
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
    ended_at: Option<Instant>,
}

impl GameSession {
    pub fn new(id: SessionId, tolerances: ToleranceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            id,
            clock,
            engine: JudgmentEngine::new(tolerances),
            state: SessionState::Idle,
            chart_ref: None,
            chart: None,
            playfield: Playfield::default(),
            stats: GameStats::new(),
            started_at: None,
            paused_at: None,
            paused_total: Duration::ZERO,
            ended_at: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref()
    }

    pub fn chart_ref(&self) -> Option<&ChartRef> {
        self.chart_ref.as_ref()
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn playfield(&self) -> &Playfield {
        &self.playfield
    }

    pub fn tolerances(&self) -> ToleranceConfig {
        self.engine.tolerances()
    }

    /// Idle -> Loaded. On failure the session stays Idle.
    pub fn load(
        &mut self,
        store: &dyn ChartStorePort,
        chart_ref: &ChartRef,
    ) -> Result<&Chart, SessionError> {
        self.require(SessionState::Idle, "load a chart")?;
        let record = store.load_chart(chart_ref).map_err(|err| match err {
            StorageError::NotFound(what) => SessionError::ChartNotFound(what),
            StorageError::Serde(msg) => SessionError::ChartInvalid(msg),
            StorageError::Io(msg) => SessionError::ChartNotFound(msg),
        })?;
        let chart = Chart::from_record(record).map_err(|err| match err {
            ChartError::Invalid(msg) => SessionError::ChartInvalid(msg),
            other => SessionError::ChartInvalid(other.to_string()),
        })?;
        Ok(self.install(chart_ref.clone(), chart))
    }

    /// Idle -> Loaded with an already validated chart.
    pub fn load_chart(&mut self, chart_ref: ChartRef, chart: Chart) -> Result<&Chart, SessionError> {
        self.require(SessionState::Idle, "load a chart")?;
        Ok(self.install(chart_ref, chart))
    }

    fn install(&mut self, chart_ref: ChartRef, chart: Chart) -> &Chart {
        log::info!(
            "session {} loaded '{}' ({} notes)",
            self.id,
            chart.title,
            chart.note_count()
        );
        self.playfield = Playfield::from_chart_notes(&chart.notes);
        self.chart_ref = Some(chart_ref);
        self.state = SessionState::Loaded;
        self.chart.insert(chart)
    }

    /// Loaded -> Playing. Stats are reset and the clock starts.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require(SessionState::Loaded, "start")?;
        self.stats.reset();
        self.stats.start_time = Some(self.clock.wall());
        self.started_at = Some(self.clock.now());
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
        self.ended_at = None;
        self.state = SessionState::Playing;
        log::info!("session {} started", self.id);
        Ok(())
    }

    /// Returns whether the session was Playing.
    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Playing {
            return false;
        }
        self.paused_at = Some(self.clock.now());
        self.state = SessionState::Paused;
        true
    }

    /// Returns whether the session was Paused.
    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        self.close_pause(self.clock.now());
        self.state = SessionState::Playing;
        true
    }

    /// Playing or Paused -> Ended. Returns whether a transition happened.
    pub fn end(&mut self) -> bool {
        if !matches!(self.state, SessionState::Playing | SessionState::Paused) {
            return false;
        }
        let now = self.clock.now();
        self.close_pause(now);
        self.ended_at = Some(now);
        self.stats.end_time = Some(self.clock.wall());
        self.state = SessionState::Ended;
        log::info!(
            "session {} ended: score {} max combo {}",
            self.id,
            self.stats.score,
            self.stats.max_combo
        );
        true
    }

    fn close_pause(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    /// Play time in seconds; `None` before the session has started.
    pub fn elapsed(&self) -> Option<Seconds> {
        let started_at = self.started_at?;
        let reference = self
            .ended_at
            .or(self.paused_at)
            .unwrap_or_else(|| self.clock.now());
        let running = reference
            .saturating_duration_since(started_at)
            .saturating_sub(self.paused_total);
        Some(running.as_secs_f64())
    }

    /// Judges an input on `lane` at the current elapsed time.
    pub fn hit(&mut self, lane: Lane) -> Result<HitOutcome, SessionError> {
        self.require(SessionState::Playing, "judge a hit")?;
        let now = self.elapsed().unwrap_or_default();
        Ok(self
            .engine
            .hit_note(&mut self.playfield, &mut self.stats, lane, now))
    }

    pub fn auto_miss(
        &mut self,
        lane: Lane,
        note_time: Seconds,
    ) -> Result<AutoMissOutcome, SessionError> {
        self.require(SessionState::Playing, "register an auto miss")?;
        let outcome = self
            .engine
            .auto_miss(&mut self.playfield, &mut self.stats, lane, note_time);
        if outcome == AutoMissOutcome::NoMatch {
            log::debug!(
                "session {}: no open note on lane {lane} at {note_time:.3}s",
                self.id
            );
        }
        Ok(outcome)
    }

    pub fn results(&self) -> GameResults {
        self.stats.results(self.elapsed().unwrap_or_default())
    }

    pub fn snapshot(&self) -> GameStateSnapshot {
        let started = self.started_at.is_some();
        GameStateSnapshot {
            state: self.state,
            is_playing: matches!(self.state, SessionState::Playing | SessionState::Paused),
            is_paused: self.state == SessionState::Paused,
            current_time: self.elapsed().unwrap_or_default(),
            stats: started.then(|| self.results()),
        }
    }

    fn require(&self, expected: SessionState, op: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                op,
                state: self.state,
            })
        }
    }
}
