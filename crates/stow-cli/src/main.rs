//! stow CLI.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use stow_cli::cli::{Cli, LogFormatArg, LogLevelArg};
use stow_cli::commands::run_command;
use stow_cli::logging::{LogConfig, LogFormat, init_logging};
use stow_persistence::{Stow, StowConfig, lifecycle};
use tracing::level_filters::LevelFilter;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli, &log_config) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli, log_config: &LogConfig) -> Result<i32> {
    let config = StowConfig {
        debug: log_config.wants_store_debug(),
        ..StowConfig::default()
    };
    let stow = Arc::new(Stow::builder().config(config).build()?);
    stow.persist(cli.file.as_deref()).context("open data file")?;
    lifecycle::spawn_interrupt_flush(&stow)?;

    let code = run_command(&stow, &cli.command, &mut io::stdout().lock())?;

    // Flush here so write failures reach the user; the drop-time write is silent
    if !stow.is_dirty() {
        return Ok(code);
    }
    if let Err(error) = stow.flush() {
        eprintln!("error: {}", error.user_message());
        if let Some(hint) = error.suggestion() {
            eprintln!("hint: {hint}");
        }
        return Ok(1);
    }
    Ok(code)
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let level_filter = match cli.log_level {
        Some(LogLevelArg::Error) => LevelFilter::ERROR,
        Some(LogLevelArg::Warn) => LevelFilter::WARN,
        Some(LogLevelArg::Info) => LevelFilter::INFO,
        Some(LogLevelArg::Debug) => LevelFilter::DEBUG,
        Some(LogLevelArg::Trace) => LevelFilter::TRACE,
        None => cli.verbosity.tracing_level_filter(),
    };
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };

    let mut config = LogConfig::default()
        .with_level_filter(level_filter)
        .with_format(format)
        .with_log_file(cli.log_file.clone());
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
