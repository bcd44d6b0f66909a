//! Dirty state tracking for auto-save.

use std::time::{Duration, Instant};

/// Tracks unsaved changes in a store.
///
/// Every mutation bumps a generation counter. A save records the generation
/// it serialized, so a mutation landing while the write is in flight keeps
/// the store dirty.
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    /// Whether there are unsaved changes.
    dirty: bool,

    /// Incremented on every change.
    generation: u64,

    /// When the first unsaved change was made.
    /// Reset when saved.
    first_unsaved_change: Option<Instant>,

    /// Generation captured by the save in progress.
    saving: Option<u64>,
}

impl Default for DirtyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyTracker {
    /// Create a new tracker with no unsaved changes.
    pub fn new() -> Self {
        Self {
            dirty: false,
            generation: 0,
            first_unsaved_change: None,
            saving: None,
        }
    }

    /// Check if there are unsaved changes.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if a save is in progress.
    #[inline]
    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    /// Mark the store as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.generation += 1;

        // Only set first_unsaved_change if this is the first change since last save
        if self.first_unsaved_change.is_none() {
            self.first_unsaved_change = Some(Instant::now());
        }
    }

    /// Mark that a save has started serializing the current generation.
    pub fn start_save(&mut self) -> u64 {
        self.saving = Some(self.generation);
        self.generation
    }

    /// Mark that a save of `generation` has completed successfully.
    ///
    /// Stays dirty if the store changed after that generation was taken.
    pub fn save_complete(&mut self, generation: u64) {
        self.saving = None;
        if generation == self.generation {
            self.dirty = false;
            self.first_unsaved_change = None;
        }
    }

    /// Mark that a save has failed.
    pub fn save_failed(&mut self) {
        self.saving = None;
        // Keep dirty = true since save failed
    }

    /// Forget unsaved changes, e.g. after loading a different file.
    pub fn reset(&mut self) {
        self.dirty = false;
        self.first_unsaved_change = None;
        self.generation += 1;
    }

    /// Time since the first unsaved change.
    pub fn since_first_unsaved(&self) -> Option<Duration> {
        self.first_unsaved_change.map(|t| t.elapsed())
    }
}
