//! Configuration management for layoutd
//!
//! This module provides two layers:
//! - **file**: the YAML rule file (rules, `execute_after`, `on_failure`)
//! - **settings**: runtime options taken from the command line

pub mod file;
pub mod rules;
pub mod settings;

// Re-export commonly used types
pub use file::Config;
pub use rules::{Layout, Rule};
pub use settings::Settings;
