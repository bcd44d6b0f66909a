//! Local JSON key-value persistence.
//!
//! This crate keeps a key-value map in memory and flushes it to a single
//! JSON file, so small tools can remember state between runs.
//!
//! # Features
//!
//! - **Debounced writes**: bursts of mutations collapse into one disk write
//! - **Atomic writes** (temp file + rename) to prevent data corruption
//! - **Advisory locking** with bounded, jittered retry across processes
//! - **Corrupt-file quarantine**: unparsable files are moved aside, not lost
//!
//! # File Layout
//!
//! ```text
//! <name>.json          durable data (two-space indented JSON object)
//! <name>.json.tmp      write staging, transient
//! <name>.json.lock     zero-byte lock marker, transient
//! <name>.json.corrupt  unparsable file moved aside at load time
//! ```
//!
//! Without an explicit path the file lives at
//! `${XDG_CACHE_HOME or ~/.cache}/stow/stow.json`.
//!
//! # Example
//!
//! ```ignore
//! use stow_persistence::Stow;
//! use serde_json::json;
//!
//! let stow = Stow::new()?;
//! stow.persist(None)?;
//! stow.set("Window", json!({"width": 800}));
//! assert_eq!(stow.get("window"), Some(json!({"width": 800})));
//! // Dropping the handle writes pending changes.
//! ```
//!
//! # Architecture
//!
//! The crate is organized into:
//!
//! - `store.rs` - In-memory map and key normalization
//! - `paths.rs` - Data file and sibling path resolution
//! - `io/` - File I/O operations (load, lock, save)
//! - `autosave/` - Debounced save worker and dirty tracking
//! - `stow.rs` - The public `Stow` handle
//! - `lifecycle.rs` - Interrupt-driven final flush
//! - `error.rs` - Error types with user-friendly messages

mod autosave;
mod config;
mod error;
mod event;
mod io;
pub mod lifecycle;
mod paths;
mod state;
mod store;
mod stow;

// Re-export main types
pub use autosave::DirtyTracker;
pub use config::{DEFAULT_APP_NAME, LockPolicy, StowConfig};
pub use error::{PersistenceError, Result};
pub use event::{Observer, PersistEvent};
pub use io::{LockGuard, Sleeper, ThreadSleeper, acquire, read_store, save_store, serialize_store};
pub use paths::{PersistenceTarget, default_cache_root, default_data_path};
pub use store::{Store, normalize_key};
pub use stow::{Stow, StowBuilder};
