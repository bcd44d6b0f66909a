//! File I/O operations for store persistence.
//!
//! This module handles:
//! - Loading the data file with corrupt-file quarantine
//! - Advisory locking around writes
//! - Saving with atomic writes

pub(crate) mod load;
pub(crate) mod lock;
pub(crate) mod save;

pub use load::read_store;
pub use lock::{LockGuard, Sleeper, ThreadSleeper, acquire};
pub use save::{save_store, serialize_store};
