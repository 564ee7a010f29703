use crate::session::GameSession;
use parking_lot::{Mutex, RwLock};
use rhythmforge_ports::types::SessionId;
use std::collections::HashMap;
use std::sync::Arc;

pub type SharedSession = Arc<Mutex<GameSession>>;

/// Owns every live session, keyed by connection. Each session sits behind its
/// own mutex so operations on one session are serialised without blocking
/// the others.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `session` under its id, returning the session it replaced.
    pub fn insert(&self, session: GameSession) -> Option<SharedSession> {
        let id = session.id().clone();
        self.sessions
            .write()
            .insert(id, Arc::new(Mutex::new(session)))
    }

    pub fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().get(id).cloned()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().contains_key(id)
    }

    pub fn destroy(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
