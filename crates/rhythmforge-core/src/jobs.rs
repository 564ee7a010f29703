use crate::ipc::{JobKind, Outbound};
use parking_lot::Mutex;
use rhythmforge_ports::types::JobId;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Delivers events produced off the command path (background jobs).
pub type EventSink = Arc<dyn Fn(Outbound) + Send + Sync>;

/// Cancellation signal handed to a running job. Once observed it stays set.
pub struct CancelToken {
    rx: mpsc::Receiver<()>,
    seen: Cell<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        if !self.seen.get() && self.rx.try_recv().is_ok() {
            self.seen.set(true);
        }
        self.seen.get()
    }
}

pub struct JobHandle {
    pub id: JobId,
    pub kind: JobKind,
    thread: JoinHandle<()>,
}

impl JobHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Blocks until the job thread finishes.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

struct ActiveJob {
    kind: JobKind,
    cancel_tx: mpsc::Sender<()>,
}

/// Removes the job from the active table when the job thread exits,
/// including by unwinding.
struct Deregister {
    id: JobId,
    active: Arc<Mutex<HashMap<JobId, ActiveJob>>>,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        self.active.lock().remove(&self.id);
    }
}

/// Background jobs keyed by id. Jobs deregister themselves on completion;
/// overlapping requests for the same target run independently.
#[derive(Clone, Default)]
pub struct JobRegistry {
    next_id: Arc<AtomicU64>,
    active: Arc<Mutex<HashMap<JobId, ActiveJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, kind: JobKind, work: F) -> std::io::Result<JobHandle>
    where
        F: FnOnce(JobId, CancelToken) + Send + 'static,
    {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (cancel_tx, cancel_rx) = mpsc::channel();
        self.active.lock().insert(id, ActiveJob { kind, cancel_tx });

        let active = self.active.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("rf-{id}"))
            .spawn(move || {
                let _deregister = Deregister { id, active };
                let token = CancelToken {
                    rx: cancel_rx,
                    seen: Cell::new(false),
                };
                work(id, token);
            });

        match spawned {
            Ok(thread) => Ok(JobHandle { id, kind, thread }),
            Err(err) => {
                self.active.lock().remove(&id);
                Err(err)
            }
        }
    }

    /// Signals cancellation. Returns false when the job is not running.
    pub fn cancel(&self, id: JobId) -> bool {
        let active = self.active.lock();
        match active.get(&id) {
            Some(job) => {
                log::info!("cancelling {id} ({:?})", job.kind);
                job.cancel_tx.send(()).is_ok()
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: JobId) -> bool {
        self.active.lock().contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}
