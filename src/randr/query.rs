use anyhow::{Context, Result, bail};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::{Topology, parse_report};
use crate::constants::xrandr::{CURRENT, PROGRAM, QUERY_ARGS};

/// Source of topology snapshots.
#[allow(async_fn_in_trait)]
pub trait DisplayQuery {
    /// Re-read the state the display server already knows (cheap).
    async fn current(&self) -> Result<Topology>;

    /// Make the display server re-probe its outputs (expensive).
    async fn rescan(&self) -> Result<Topology>;
}

/// Queries the display server through the `xrandr` tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xrandr;

impl Xrandr {
    async fn query(&self, extra: &[&str]) -> Result<Topology> {
        debug!(args = ?extra, "querying {PROGRAM}");
        let output = Command::new(PROGRAM)
            .args(QUERY_ARGS)
            .args(extra)
            .stderr(Stdio::inherit())
            .output()
            .await
            .with_context(|| format!("Failed to run {PROGRAM}"))?;

        if !output.status.success() {
            bail!("{PROGRAM} query exited with {}", output.status);
        }

        let report = String::from_utf8_lossy(&output.stdout);
        parse_report(&report).with_context(|| format!("Failed to parse {PROGRAM} report"))
    }
}

impl DisplayQuery for Xrandr {
    async fn current(&self) -> Result<Topology> {
        self.query(&[CURRENT]).await
    }

    async fn rescan(&self) -> Result<Topology> {
        self.query(&[]).await
    }
}
