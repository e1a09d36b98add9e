//! Error types for the detection and reconciliation engine.

use std::process::ExitStatus;

/// Failure to decode an EDID identification block.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EdidError {
    #[error("EDID too short: {len} hex characters, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("corrupt EDID: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("corrupt EDID: bad header")]
    BadHeader,

    #[error("unsupported EDID version {version}.{revision}")]
    UnsupportedVersion { version: u8, revision: u8 },

    #[error("corrupt EDID: reserved manufacturer bit is set")]
    ReservedBitSet,
}

/// Failure to parse a display-query report. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: first line should start with \"Screen\", found: {found:?}")]
    MissingScreenHeader { line: usize, found: String },

    #[error("line {line}: unknown output state {state:?}")]
    UnknownState { line: usize, state: String },

    #[error("line {line}: {reason}: {text:?}")]
    Malformed {
        line: usize,
        reason: &'static str,
        text: String,
    },

    #[error("line {line}: {source}")]
    Identity {
        line: usize,
        #[source]
        source: EdidError,
    },
}

/// A rule that cannot be turned into a command plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("no output configuration for rule {rule:?}")]
    NoConfiguration { rule: String },

    #[error("rule {rule:?} sets more than one of configure_single/row/column/command")]
    Ambiguous { rule: String },

    #[error("rule {rule:?}: pattern {pattern:?} malformed: {reason}")]
    BadPattern {
        rule: String,
        pattern: String,
        reason: String,
    },
}

/// A single device or shell command that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unable to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Status { command: String, status: ExitStatus },
}

impl CommandError {
    /// Spawn failures mean the tool is missing; retrying cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }
}

/// The change-notification source failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("RandR change event contains error: {0}")]
pub struct NotificationError(pub String);
