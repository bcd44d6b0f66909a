//! CLI library components for the stow store.

pub mod cli;
pub mod commands;
pub mod logging;
