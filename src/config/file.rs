//! YAML rule file: lookup, parsing and validation
//!
//! The file is read once at start-up; the resulting [`Config`] is never
//! mutated afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::rules::Rule;
use crate::constants::config::{ENV_VAR, FILENAME, HOME_FILENAME, SYSTEM_PATH};

/// Contents of the rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rules in priority order; the first match wins
    pub rules: Vec<Rule>,

    /// Commands run after every successful rule application
    pub execute_after: Vec<String>,

    /// Commands run when the daemon fails
    pub on_failure: Vec<String>,
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(contents).context("Failed to parse rule file as YAML")?;
        for rule in &config.rules {
            rule.validate()?;
        }
        Ok(config)
    }

    /// Load from the first readable candidate location.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        for path in candidate_paths(explicit) {
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "config candidate not readable");
                    continue;
                }
            };

            info!(path = %path.display(), "reading config");
            let config = Self::from_yaml(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            info!(rules = config.rules.len(), "loaded rules");
            return Ok((config, path));
        }

        anyhow::bail!("could not find config file")
    }

    /// Case-insensitive lookup by rule name.
    pub fn find_rule(&self, name: &str) -> Option<&Rule> {
        let wanted = name.to_lowercase();
        self.rules.iter().find(|r| r.name.to_lowercase() == wanted)
    }
}

/// Lookup order: explicit path, environment, XDG config dir, home dotfile, system.
fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = explicit.map(Path::to_path_buf).into_iter().collect();

    if let Some(env_path) = std::env::var_os(ENV_VAR).filter(|p| !p.is_empty()) {
        paths.push(PathBuf::from(env_path));
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(FILENAME));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(HOME_FILENAME));
    }
    paths.push(PathBuf::from(SYSTEM_PATH));

    paths
}
