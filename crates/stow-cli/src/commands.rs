//! Command execution against an open store.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;
use stow_persistence::Stow;
use tracing::info;

use crate::cli::Command;

/// Process exit code for a command that ran but found nothing.
pub const EXIT_NOT_FOUND: i32 = 1;

/// Run one command, writing its output to `out`.
///
/// Returns the process exit code.
pub fn run_command(stow: &Stow, command: &Command, out: &mut dyn Write) -> Result<i32> {
    match command {
        Command::Get { key } => match stow.get(key) {
            Some(value) => {
                print_json(out, &value)?;
                Ok(0)
            }
            None => Ok(EXIT_NOT_FOUND),
        },
        Command::Set { key, value } => {
            let value = parse_value(value);
            if value.is_null() || stow_persistence::normalize_key(key).is_empty() {
                info!(key = %key, "ignored empty key or null value");
            }
            stow.set(key, value);
            Ok(0)
        }
        Command::Remove { key } => {
            stow.remove(key);
            Ok(0)
        }
        Command::Exists { key, value } => {
            let expected = value.as_deref().map(parse_value);
            if stow.exists(key, expected.as_ref()) {
                Ok(0)
            } else {
                Ok(EXIT_NOT_FOUND)
            }
        }
        Command::Keys => {
            for key in stow.keys() {
                writeln!(out, "{key}").context("write output")?;
            }
            Ok(0)
        }
        Command::Values => {
            print_json(out, &Value::Array(stow.values()))?;
            Ok(0)
        }
        Command::Clear => {
            stow.clear();
            Ok(0)
        }
        Command::Path => {
            let path = stow.filename().context("store has no data file")?;
            writeln!(out, "{}", path.display()).context("write output")?;
            Ok(0)
        }
    }
}

/// Parse a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(out: &mut dyn Write, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("format value")?;
    writeln!(out, "{text}").context("write output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(r#"{"a": [1, 2]}"#), json!({"a": [1, 2]}));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("hello world"), json!("hello world"));
        assert_eq!(parse_value("null"), Value::Null);
    }
}
