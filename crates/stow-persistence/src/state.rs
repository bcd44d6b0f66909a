//! State shared between a `Stow` handle and its save worker.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::autosave::DirtyTracker;
use crate::config::StowConfig;
use crate::error::{PersistenceError, Result};
use crate::event::{PersistEvent, Reporter};
use crate::io::Sleeper;
use crate::io::save::{save_locked, serialize_store};
use crate::paths::PersistenceTarget;
use crate::store::Store;

#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) store: Store,
    pub(crate) target: Option<PersistenceTarget>,
    pub(crate) tracker: DirtyTracker,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<State>,
    pub(crate) reporter: Reporter,
    pub(crate) config: StowConfig,
    pub(crate) sleeper: Arc<dyn Sleeper>,
}

impl Shared {
    pub(crate) fn is_dirty(&self) -> bool {
        self.state.lock().tracker.is_dirty()
    }

    /// Run one write cycle: lock, snapshot, atomic replace, unlock.
    ///
    /// A no-op while no target has been established.
    pub(crate) fn write(&self) -> Result<()> {
        let Some(target) = self.state.lock().target.clone() else {
            return Ok(());
        };

        let result = save_locked(
            &target,
            &self.config.lock,
            self.sleeper.as_ref(),
            &self.reporter,
            || self.snapshot(&target),
        );

        match result {
            Ok((items, generation)) => {
                self.state.lock().tracker.save_complete(generation);
                self.reporter.emit(PersistEvent::Saved {
                    path: &target.file,
                    items,
                });
                Ok(())
            }
            Err(error) => {
                self.state.lock().tracker.save_failed();
                self.reporter.emit(PersistEvent::SaveFailed(&error));
                Err(error)
            }
        }
    }

    fn snapshot(&self, target: &PersistenceTarget) -> Result<(String, (usize, u64))> {
        let mut state = self.state.lock();
        if state.target.as_ref() != Some(target) {
            // Repointed while waiting for the lock; the old file keeps its contents
            return Err(PersistenceError::Io {
                operation: "write",
                path: target.file.clone(),
                source: std::io::Error::other("persistence target changed during save"),
            });
        }
        let generation = state.tracker.start_save();
        let json = serialize_store(&state.store)?;
        Ok((json, (state.store.len(), generation)))
    }
}
