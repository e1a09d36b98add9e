//! Display topology as reported by the query tool
//!
//! - **parser**: turns an `xrandr --query --props` report into a [`Topology`]
//! - **edid**: derives a stable monitor identity from an EDID block
//! - **query**: the [`DisplayQuery`] seam and its `xrandr` implementation

pub mod edid;
pub mod parser;
pub mod query;

use serde::Serialize;
use std::fmt;

use crate::pattern::Pattern;

pub use parser::parse_report;
pub use query::{DisplayQuery, Xrandr};

/// A supported timing of an output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mode {
    pub name: String,
    pub default: bool,
    pub active: bool,
}

impl Mode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.active {
            f.write_str("*")?;
        }
        if self.default {
            f.write_str("+")?;
        }
        Ok(())
    }
}

/// A physical video connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Output {
    pub name: String,
    pub connected: bool,
    pub primary: bool,
    pub modes: Vec<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_id: Option<String>,
}

impl Output {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True if some mode is currently driving the output.
    pub fn is_active(&self) -> bool {
        self.modes.iter().any(|mode| mode.active)
    }

    /// Connector name joined with the monitor identity, e.g. `HDMI1-SAM-2618-808661557`.
    pub fn extended_name(&self) -> String {
        format!("{}-{}", self.name, self.monitor_id.as_deref().unwrap_or(""))
    }

    /// Pattern match against the plain or the extended name.
    fn matches(&self, pattern: &Pattern) -> bool {
        pattern.matches(&self.name) || pattern.matches(&self.extended_name())
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match (self.connected, self.primary) {
            (true, true) => f.write_str(" (connected, primary)")?,
            (true, false) => f.write_str(" (connected)")?,
            (false, true) => f.write_str(" (primary)")?,
            (false, false) => {}
        }
        for mode in self.modes.iter().filter(|m| m.active || m.default) {
            write!(f, " {mode}")?;
        }
        if let Some(id) = &self.monitor_id {
            write!(f, " [{id}]")?;
        }
        Ok(())
    }
}

/// Outputs in the order the query tool reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Topology {
    pub outputs: Vec<Output>,
}

impl Topology {
    pub fn new(outputs: Vec<Output>) -> Self {
        Self { outputs }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Output> {
        self.outputs.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// True iff some output (connected or not) matches `pattern`.
    /// A malformed pattern never matches.
    pub fn present(&self, pattern: &str) -> bool {
        match Pattern::new(pattern) {
            Ok(pattern) => self.outputs.iter().any(|o| o.matches(&pattern)),
            Err(_) => false,
        }
    }

    /// True iff some connected output matches `pattern`.
    /// A malformed pattern never matches.
    pub fn connected(&self, pattern: &str) -> bool {
        match Pattern::new(pattern) {
            Ok(pattern) => self
                .outputs
                .iter()
                .filter(|o| o.connected)
                .any(|o| o.matches(&pattern)),
            Err(_) => false,
        }
    }
}

impl<'a> IntoIterator for &'a Topology {
    type Item = &'a Output;
    type IntoIter = std::slice::Iter<'a, Output>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.iter()
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for output in &self.outputs {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{output}")?;
        }
        Ok(())
    }
}
