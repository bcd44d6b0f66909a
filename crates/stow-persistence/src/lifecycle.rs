//! Process lifecycle integration.
//!
//! Normal termination is covered by dropping the [`Stow`] handle, which
//! writes pending changes before the save worker exits. An interrupt
//! (Ctrl-C) ends the process without running destructors, so hosts that
//! want the final state on disk register one of the hooks below.
//!
//! The hooks only hold a [`Weak`] reference: installing one never keeps the
//! handle alive past its owner, so the drop-time write still happens.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crate::error::{PersistenceError, Result};
use crate::stow::Stow;

/// Exit status used after an interrupt-driven flush (128 + SIGINT).
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Wait for Ctrl-C, flush the store if it is still alive, then exit the
/// process.
pub async fn flush_on_interrupt(stow: Weak<Stow>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "could not listen for interrupt signal");
        return;
    }
    flush_then(&stow, |code| std::process::exit(code));
}

/// Flush the store behind `stow`, then call `exit` with
/// [`INTERRUPT_EXIT_CODE`].
///
/// A handle that was already dropped has written its changes on drop, so
/// only `exit` runs.
pub fn flush_then<F>(stow: &Weak<Stow>, exit: F)
where
    F: FnOnce(i32),
{
    if let Some(stow) = stow.upgrade()
        && let Err(error) = stow.flush()
    {
        tracing::warn!(%error, "flush on interrupt failed");
    }
    exit(INTERRUPT_EXIT_CODE);
}

/// Run [`flush_on_interrupt`] on a dedicated thread for hosts without an
/// async runtime.
pub fn spawn_interrupt_flush(stow: &Arc<Stow>) -> Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PersistenceError::WorkerSpawn { source: e })?;
    let stow = Arc::downgrade(stow);

    thread::Builder::new()
        .name("stow-interrupt".to_string())
        .spawn(move || runtime.block_on(flush_on_interrupt(stow)))
        .map_err(|e| PersistenceError::WorkerSpawn { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StowConfig;
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;

    #[test]
    fn test_flush_then_writes_before_exit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("interrupted.json");
        let stow = Arc::new(Stow::builder().config(StowConfig::manual()).build().unwrap());
        stow.persist(Some(&path)).unwrap();
        stow.set("k", json!({"v": 1}));

        let mut exit_code = None;
        flush_then(&Arc::downgrade(&stow), |code| {
            let on_disk: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(on_disk, json!({"k": {"v": 1}}));
            exit_code = Some(code);
        });

        assert_eq!(exit_code, Some(INTERRUPT_EXIT_CODE));
        assert!(!stow.is_dirty());
    }

    #[test]
    fn test_flush_then_after_drop_only_exits() {
        let stow = Arc::new(Stow::builder().config(StowConfig::manual()).build().unwrap());
        let weak = Arc::downgrade(&stow);
        drop(stow);

        let exited = AtomicBool::new(false);
        flush_then(&weak, |code| {
            assert_eq!(code, INTERRUPT_EXIT_CODE);
            exited.store(true, Ordering::SeqCst);
        });

        assert!(exited.load(Ordering::SeqCst));
    }

    #[test]
    fn test_hook_does_not_keep_handle_alive() {
        let stow = Arc::new(Stow::builder().config(StowConfig::manual()).build().unwrap());
        spawn_interrupt_flush(&stow).unwrap();

        assert_eq!(Arc::strong_count(&stow), 1);
    }
}
