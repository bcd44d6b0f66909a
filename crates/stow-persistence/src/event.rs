//! Persistence events delivered to an optional observer.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::PersistenceError;

/// Something that happened in the durability layer.
#[derive(Debug, Clone, Copy)]
pub enum PersistEvent<'a> {
    /// The data file was read into the store.
    Loaded { path: &'a Path, items: usize },
    /// The data file could not be read; the store starts empty.
    LoadFailed(&'a PersistenceError),
    /// An unparsable data file was moved aside.
    Quarantined { backup: &'a Path },
    /// A write cycle replaced the data file.
    Saved { path: &'a Path, items: usize },
    /// A write cycle did not complete. The data file is unchanged.
    SaveFailed(&'a PersistenceError),
    /// The lock marker could not be removed after a write cycle.
    UnlockFailed(&'a PersistenceError),
}

/// Callback receiving every [`PersistEvent`].
///
/// Runs on the thread that produced the event: the caller's thread for load
/// events, the scheduler worker for save events.
pub type Observer = Arc<dyn Fn(&PersistEvent<'_>) + Send + Sync>;

/// Logs events (when debug logging is on) and forwards them to the observer.
pub(crate) struct Reporter {
    debug: AtomicBool,
    observer: Option<Observer>,
}

impl Reporter {
    pub(crate) fn new(debug: bool, observer: Option<Observer>) -> Self {
        Self {
            debug: AtomicBool::new(debug),
            observer,
        }
    }

    pub(crate) fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub(crate) fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn emit(&self, event: PersistEvent<'_>) {
        if self.debug() {
            log_event(&event);
        }
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

fn log_event(event: &PersistEvent<'_>) {
    match event {
        PersistEvent::Loaded { path, items } => {
            tracing::debug!(path = %path.display(), items, "loaded store");
        }
        PersistEvent::LoadFailed(error) => {
            tracing::warn!(%error, "failed to load store, starting empty");
        }
        PersistEvent::Quarantined { backup } => {
            tracing::warn!(backup = %backup.display(), "moved unreadable data file aside");
        }
        PersistEvent::Saved { path, items } => {
            tracing::debug!(path = %path.display(), items, "saved store");
        }
        PersistEvent::SaveFailed(error) => {
            tracing::warn!(%error, "write failed");
        }
        PersistEvent::UnlockFailed(error) => {
            tracing::warn!(%error, "unlock failed");
        }
    }
}
