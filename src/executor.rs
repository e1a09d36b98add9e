//! Running planned invocations as child processes

use std::process::Stdio;
use tracing::debug;

use crate::error::CommandError;
use crate::plan::Invocation;

/// Runs one invocation to completion.
#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn run(&self, invocation: &Invocation) -> Result<(), CommandError>;
}

/// Spawns real processes, or prints their command lines in dry-run mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor {
    dry_run: bool,
}

impl ShellExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Synchronous variant for contexts without a runtime (drop handlers).
    pub fn run_blocking(&self, invocation: &Invocation) -> Result<(), CommandError> {
        if self.dry_run {
            println!("{invocation}");
            return Ok(());
        }

        debug!(command = %invocation, "running command");
        let status = std::process::Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .status()
            .map_err(|source| CommandError::Spawn {
                command: invocation.to_string(),
                source,
            })?;
        check_status(invocation, status)
    }
}

impl Executor for ShellExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<(), CommandError> {
        if self.dry_run {
            println!("{invocation}");
            return Ok(());
        }

        debug!(command = %invocation, "running command");
        let status = tokio::process::Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| CommandError::Spawn {
                command: invocation.to_string(),
                source,
            })?;
        check_status(invocation, status)
    }
}

fn check_status(invocation: &Invocation, status: std::process::ExitStatus) -> Result<(), CommandError> {
    if status.success() {
        Ok(())
    } else {
        Err(CommandError::Status {
            command: invocation.to_string(),
            status,
        })
    }
}
