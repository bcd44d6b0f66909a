//! Debounced save worker.
//!
//! A single background thread owns the debounce deadline. Every
//! [`Command::Schedule`] replaces the deadline, so a burst of mutations
//! collapses into one write once the store has been quiet for the debounce
//! window. All writes for a handle run on this thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, select};

use crate::error::{PersistenceError, Result};
use crate::state::Shared;

enum Command {
    /// Arm (or re-arm) the debounce deadline.
    Schedule,
    /// Cancel the deadline and write now, replying with the outcome.
    Flush(Sender<Result<()>>),
    /// Write pending changes and stop.
    Shutdown,
}

/// Handle to the save worker thread.
pub(crate) struct Scheduler {
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub(crate) fn spawn(shared: Arc<Shared>) -> Result<Self> {
        let (commands, inbox) = crossbeam_channel::unbounded();
        let worker = thread::Builder::new()
            .name("stow-saver".to_string())
            .spawn(move || run(&shared, &inbox))
            .map_err(|e| PersistenceError::WorkerSpawn { source: e })?;

        Ok(Self {
            commands,
            worker: Some(worker),
        })
    }

    /// Request a debounced write.
    pub(crate) fn schedule(&self) {
        let _ = self.commands.send(Command::Schedule);
    }

    /// Write immediately and wait for the outcome.
    pub(crate) fn flush(&self) -> Result<()> {
        let (reply, outcome) = crossbeam_channel::bounded(1);
        self.commands
            .send(Command::Flush(reply))
            .map_err(|_| PersistenceError::SchedulerStopped)?;
        outcome
            .recv()
            .map_err(|_| PersistenceError::SchedulerStopped)?
    }

    /// Stop the worker after a final write of pending changes.
    pub(crate) fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(Command::Shutdown);
            if worker.join().is_err() {
                tracing::error!("save worker panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: &Shared, inbox: &Receiver<Command>) {
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = match deadline {
            Some(at) => crossbeam_channel::at(at),
            None => crossbeam_channel::never(),
        };

        select! {
            recv(inbox) -> command => match command {
                Ok(Command::Schedule) => {
                    deadline = Some(next_deadline(shared));
                }
                Ok(Command::Flush(reply)) => {
                    deadline = None;
                    let _ = reply.send(shared.write());
                }
                Ok(Command::Shutdown) | Err(_) => {
                    if deadline.take().is_some() || shared.is_dirty() {
                        let _ = shared.write();
                    }
                    break;
                }
            },
            recv(timer) -> _ => {
                deadline = None;
                let _ = shared.write();
            }
        }
    }
}

fn next_deadline(shared: &Shared) -> Instant {
    let since_first_unsaved = shared
        .state
        .lock()
        .tracker
        .since_first_unsaved()
        .unwrap_or_default();
    Instant::now() + shared.config.delay_until_save(since_first_unsaved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StowConfig;
    use crate::event::{PersistEvent, Reporter};
    use crate::io::ThreadSleeper;
    use crate::paths::PersistenceTarget;
    use crate::state::State;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    fn shared_with_counter(
        target: Option<PersistenceTarget>,
        config: StowConfig,
    ) -> (Arc<Shared>, Arc<AtomicUsize>) {
        let saves = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&saves);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                target,
                ..State::default()
            }),
            reporter: Reporter::new(
                false,
                Some(Arc::new(move |event: &PersistEvent<'_>| {
                    if matches!(event, PersistEvent::Saved { .. }) {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                })),
            ),
            config,
            sleeper: Arc::new(ThreadSleeper),
        });
        (shared, saves)
    }

    fn mutate(shared: &Shared, key: &str) {
        let mut state = shared.state.lock();
        state.store.insert(key, json!({"k": key}));
        state.tracker.mark_dirty();
    }

    #[test]
    fn test_burst_collapses_into_one_write() {
        let dir = tempdir().unwrap();
        let target = PersistenceTarget::from_file(&dir.path().join("data.json")).unwrap();
        let config = StowConfig {
            debounce_ms: 100,
            ..Default::default()
        };
        let (shared, saves) = shared_with_counter(Some(target.clone()), config);
        let scheduler = Scheduler::spawn(Arc::clone(&shared)).unwrap();

        for i in 0..20 {
            mutate(&shared, &format!("key{i}"));
            scheduler.schedule();
        }
        thread::sleep(Duration::from_millis(400));

        assert_eq!(saves.load(Ordering::SeqCst), 1);
        assert!(target.file.exists());
        assert!(!shared.is_dirty());
    }

    #[test]
    fn test_flush_cancels_pending_deadline() {
        let dir = tempdir().unwrap();
        let target = PersistenceTarget::from_file(&dir.path().join("data.json")).unwrap();
        let config = StowConfig {
            debounce_ms: 150,
            ..Default::default()
        };
        let (shared, saves) = shared_with_counter(Some(target), config);
        let scheduler = Scheduler::spawn(Arc::clone(&shared)).unwrap();

        mutate(&shared, "a");
        scheduler.schedule();
        scheduler.flush().unwrap();
        thread::sleep(Duration::from_millis(400));

        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_flush_without_target_is_noop() {
        let (shared, saves) = shared_with_counter(None, StowConfig::default());
        let scheduler = Scheduler::spawn(shared).unwrap();

        scheduler.flush().unwrap();
        assert_eq!(saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_shutdown_writes_pending_changes() {
        let dir = tempdir().unwrap();
        let target = PersistenceTarget::from_file(&dir.path().join("data.json")).unwrap();
        let (shared, saves) = shared_with_counter(Some(target.clone()), StowConfig::default());
        let mut scheduler = Scheduler::spawn(Arc::clone(&shared)).unwrap();

        mutate(&shared, "late");
        scheduler.schedule();
        scheduler.shutdown();

        assert_eq!(saves.load(Ordering::SeqCst), 1);
        assert!(target.file.exists());
    }

    #[test]
    fn test_shutdown_when_clean_does_not_write() {
        let dir = tempdir().unwrap();
        let target = PersistenceTarget::from_file(&dir.path().join("data.json")).unwrap();
        let (shared, saves) = shared_with_counter(Some(target.clone()), StowConfig::default());
        let mut scheduler = Scheduler::spawn(shared).unwrap();

        scheduler.shutdown();

        assert_eq!(saves.load(Ordering::SeqCst), 0);
        assert!(!target.file.exists());
    }

    #[test]
    fn test_flush_after_shutdown_reports_stopped() {
        let (shared, _saves) = shared_with_counter(None, StowConfig::default());
        let mut scheduler = Scheduler::spawn(shared).unwrap();
        scheduler.shutdown();

        assert!(matches!(
            scheduler.flush(),
            Err(PersistenceError::SchedulerStopped)
        ));
    }
}
