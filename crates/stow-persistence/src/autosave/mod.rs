//! Auto-save functionality for the store.
//!
//! Provides:
//! - `DirtyTracker` - Tracks unsaved changes across write cycles
//! - `Scheduler` - Background worker debouncing writes

mod scheduler;
mod tracker;

pub(crate) use scheduler::Scheduler;
pub use tracker::DirtyTracker;
