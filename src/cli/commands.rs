//! Interactive host commands
//!
//! Line-oriented input for driving the wizard from a terminal:
//!
//! ```text
//! set <field> [value...]   store a field value (value may be empty)
//! set <field> "value "     double quotes keep surrounding whitespace
//! next                     advance / submit
//! back                     return to the vehicle step
//! attr k=v [k=v...]        deliver attribution metadata
//! attr {"utm_source":..}   same, as a JSON object
//! show                     print the current view
//! help | quit
//! ```
//!
//! Unquoted values are trimmed; a double-quoted value is stored exactly as
//! written between the quotes.

use crate::error::UnknownField;
use crate::wizard::{AttributionMetadata, Field};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Set { field: Field, value: String },
    Next,
    Back,
    Attr(AttributionMetadata),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("Usage: set <field> [value]")]
    MissingField,

    #[error(transparent)]
    Field(#[from] UnknownField),

    #[error("Invalid attribution: {0}")]
    Attribution(String),
}

pub const HELP: &str = "\
Commands:
  set <field> [value]   fields: year make model state miles name email phone
                        quote the value (\"Ada \") to keep surrounding spaces
  next                  advance to the next step (or submit)
  back                  return to the vehicle step
  attr k=v [k=v ...]    deliver attribution metadata (or a JSON object)
  show                  print the current state
  help                  this text
  quit                  exit without submitting";

/// Parse one input line
pub fn parse_line(line: &str) -> Result<HostCommand, CommandError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "set" => parse_set(rest),
        "next" | "n" => Ok(HostCommand::Next),
        "back" | "b" => Ok(HostCommand::Back),
        "attr" => parse_attr(rest).map(HostCommand::Attr),
        "show" | "s" => Ok(HostCommand::Show),
        "help" | "?" => Ok(HostCommand::Help),
        "quit" | "exit" | "q" => Ok(HostCommand::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_set(rest: &str) -> Result<HostCommand, CommandError> {
    let (name, value) = match rest.split_once(char::is_whitespace) {
        Some((name, value)) => (name, value.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return Err(CommandError::MissingField);
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    Ok(HostCommand::Set {
        field: name.parse()?,
        value: value.to_string(),
    })
}

fn parse_attr(rest: &str) -> Result<AttributionMetadata, CommandError> {
    if rest.starts_with('{') {
        let body: serde_json::Value =
            serde_json::from_str(rest).map_err(|e| CommandError::Attribution(e.to_string()))?;
        return Ok(AttributionMetadata::from_json(&body));
    }

    let pairs = rest
        .split_whitespace()
        .map(|pair| {
            pair.split_once('=')
                .ok_or_else(|| CommandError::Attribution(format!("expected key=value, got '{}'", pair)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AttributionMetadata::from_pairs(pairs))
}
