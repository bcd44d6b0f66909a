//! CLI argument definitions for the stow store.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "stow",
    version,
    about = "Read and write a persistent JSON key-value store",
    long_about = "Read and write a persistent JSON key-value store.\n\n\
                  Keys are case-insensitive and trimmed. Values are JSON documents.\n\
                  Without --file the store lives in ${XDG_CACHE_HOME:-~/.cache}/stow/stow.json."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Data file to use instead of the default cache location.
    #[arg(long = "file", short = 'f', value_name = "PATH", global = true)]
    pub file: Option<PathBuf>,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the value stored under a key.
    Get {
        key: String,
    },

    /// Store a value under a key.
    ///
    /// VALUE is parsed as JSON; anything that is not valid JSON is stored
    /// as a string.
    Set {
        key: String,
        value: String,
    },

    /// Remove a key.
    Remove {
        key: String,
    },

    /// Exit with 0 when the key exists (and equals VALUE, if given).
    Exists {
        key: String,
        value: Option<String>,
    },

    /// List all keys.
    Keys,

    /// List all values.
    Values,

    /// Remove every key.
    Clear,

    /// Print the resolved data file path.
    Path,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
