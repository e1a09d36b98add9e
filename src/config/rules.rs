//! Rule declarations as written in the config file

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::pattern::Pattern;

/// A named predicate over the topology plus the layout to apply when it holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub name: String,

    // Predicates (glob patterns against output names or `NAME-MONITORID`)
    pub outputs_connected: Vec<String>,
    pub outputs_disconnected: Vec<String>,
    pub outputs_present: Vec<String>,
    pub outputs_absent: Vec<String>,

    // Desired configuration, exactly one of these
    pub configure_row: Vec<String>,
    pub configure_column: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure_single: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure_command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    pub disable_order: Vec<String>,
    pub atomic: bool,
    pub execute_after: Vec<String>,
}

/// The configuration a rule asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout<'a> {
    Single(&'a str),
    Row(&'a [String]),
    Column(&'a [String]),
    Command(&'a str),
}

impl Rule {
    /// Resolve the desired configuration. A rule without one cannot be applied.
    pub fn layout(&self) -> Result<Layout<'_>, ConfigurationError> {
        if let Some(single) = self.configure_single.as_deref().filter(|s| !s.is_empty()) {
            Ok(Layout::Single(single))
        } else if !self.configure_row.is_empty() {
            Ok(Layout::Row(&self.configure_row))
        } else if !self.configure_column.is_empty() {
            Ok(Layout::Column(&self.configure_column))
        } else if let Some(command) = self.configure_command.as_deref().filter(|c| !c.is_empty()) {
            Ok(Layout::Command(command))
        } else {
            Err(ConfigurationError::NoConfiguration {
                rule: self.name.clone(),
            })
        }
    }

    /// All predicate patterns of the rule.
    pub fn patterns(&self) -> impl Iterator<Item = &String> {
        self.outputs_connected
            .iter()
            .chain(&self.outputs_disconnected)
            .chain(&self.outputs_present)
            .chain(&self.outputs_absent)
    }

    /// Load-time checks: every pattern compiles, at most one configuration is set.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for pattern in self.patterns() {
            if let Err(e) = Pattern::new(pattern) {
                return Err(ConfigurationError::BadPattern {
                    rule: self.name.clone(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let configured = [
            self.configure_single.as_deref().is_some_and(|s| !s.is_empty()),
            !self.configure_row.is_empty(),
            !self.configure_column.is_empty(),
            self.configure_command.as_deref().is_some_and(|c| !c.is_empty()),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if configured > 1 {
            return Err(ConfigurationError::Ambiguous {
                rule: self.name.clone(),
            });
        }

        Ok(())
    }
}
