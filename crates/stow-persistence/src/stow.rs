//! The `Stow` handle: public store operations over the durability layer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::autosave::Scheduler;
use crate::config::StowConfig;
use crate::error::{PersistenceError, Result};
use crate::event::{Observer, PersistEvent, Reporter};
use crate::io::load::load_or_recover;
use crate::io::{Sleeper, ThreadSleeper};
use crate::paths::PersistenceTarget;
use crate::state::{Shared, State};

/// Builder for a [`Stow`] handle.
pub struct StowBuilder {
    config: StowConfig,
    observer: Option<Observer>,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for StowBuilder {
    fn default() -> Self {
        Self {
            config: StowConfig::default(),
            observer: None,
            sleeper: Arc::new(ThreadSleeper),
        }
    }
}

impl StowBuilder {
    #[must_use]
    pub fn config(mut self, config: StowConfig) -> Self {
        self.config = config;
        self
    }

    /// Receive every load/save event, including the errors the facade
    /// otherwise swallows.
    #[must_use]
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&PersistEvent<'_>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Replace the sleeper used between lock attempts.
    #[must_use]
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Start the save worker and return the handle.
    ///
    /// The handle has no persistence target until [`Stow::persist`] is
    /// called; until then writes are no-ops.
    pub fn build(self) -> Result<Stow> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            reporter: Reporter::new(self.config.debug, self.observer),
            config: self.config,
            sleeper: self.sleeper,
        });
        let scheduler = Scheduler::spawn(Arc::clone(&shared))?;
        Ok(Stow { shared, scheduler })
    }
}

/// A JSON key-value store persisted to a single file.
///
/// Mutations land in memory immediately and reach the disk through a
/// debounced background write. Dropping the handle writes any pending
/// changes before returning.
///
/// ```no_run
/// use std::path::Path;
/// use serde_json::json;
/// use stow_persistence::Stow;
///
/// let stow = Stow::new()?;
/// stow.persist(Some(Path::new("./cache/mystorage.json")))?;
/// stow.set("foo", json!({"bar": "baz"}));
/// assert!(stow.exists("FOO", Some(&json!({"bar": "baz"}))));
/// # Ok::<(), stow_persistence::PersistenceError>(())
/// ```
pub struct Stow {
    shared: Arc<Shared>,
    scheduler: Scheduler,
}

impl Stow {
    /// Create a handle with the default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> StowBuilder {
        StowBuilder::default()
    }

    /// Point the store at a data file and load it.
    ///
    /// Without a path the default cache location is used. The in-memory
    /// store is replaced by the file's contents; unreadable files are moved
    /// to `<file>.corrupt` and the store starts empty. The only error is a
    /// failure to create the default cache folder.
    pub fn persist(&self, path: Option<&Path>) -> Result<()> {
        let target = PersistenceTarget::resolve(path, &self.shared.config.app_name)?;
        let store = load_or_recover(&target, &self.shared.reporter);

        let mut state = self.shared.state.lock();
        state.store = store;
        state.target = Some(target);
        state.tracker.reset();
        Ok(())
    }

    /// Resolved data file path, `None` until [`persist`](Self::persist) is
    /// called.
    pub fn filename(&self) -> Option<PathBuf> {
        self.shared
            .state
            .lock()
            .target
            .as_ref()
            .map(|target| target.file.clone())
    }

    pub fn debug(&self) -> bool {
        self.shared.reporter.debug()
    }

    /// Toggle debug logging of load/save activity.
    pub fn set_debug(&self, enabled: bool) {
        self.shared.reporter.set_debug(enabled);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.shared.state.lock().store.get(name).cloned()
    }

    /// Read a value and deserialize it, `None` when absent or of another
    /// shape.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.get(name)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Store a value and schedule a save.
    ///
    /// Ignored when the key is blank or the value is `null`.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let stored = {
            let mut state = self.shared.state.lock();
            let stored = state.store.insert(name, value.into());
            if stored {
                state.tracker.mark_dirty();
            }
            stored
        };
        if stored {
            self.schedule_save();
        }
    }

    /// Serialize a value and store it.
    pub fn set_as<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|e| PersistenceError::Serialization { source: e })?;
        self.set(name, value);
        Ok(())
    }

    /// Remove a key (absent keys are fine) and schedule a save.
    pub fn remove(&self, name: &str) {
        self.mutate(|state| {
            state.store.remove(name);
        });
    }

    /// Whether `name` is stored, and deeply equal to `value` when one is
    /// given.
    pub fn exists(&self, name: &str, value: Option<&Value>) -> bool {
        self.shared.state.lock().store.contains(name, value)
    }

    pub fn keys(&self) -> Vec<String> {
        self.shared.state.lock().store.keys()
    }

    pub fn values(&self) -> Vec<Value> {
        self.shared.state.lock().store.values()
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().store.is_empty()
    }

    /// Remove every key and schedule a save.
    pub fn clear(&self) {
        self.mutate(|state| state.store.clear());
    }

    /// Whether the store holds changes not yet written.
    pub fn is_dirty(&self) -> bool {
        self.shared.is_dirty()
    }

    /// Cancel any pending debounced save and write now.
    ///
    /// Blocks until the write cycle (including lock retries) finishes.
    pub fn flush(&self) -> Result<()> {
        self.scheduler.flush()
    }

    fn mutate(&self, apply: impl FnOnce(&mut State)) {
        {
            let mut state = self.shared.state.lock();
            apply(&mut state);
            state.tracker.mark_dirty();
        }
        self.schedule_save();
    }

    fn schedule_save(&self) {
        if self.shared.config.autosave {
            self.scheduler.schedule();
        }
    }
}

impl std::fmt::Debug for Stow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stow")
            .field("filename", &self.filename())
            .field("items", &self.len())
            .field("config", &self.shared.config)
            .finish()
    }
}
