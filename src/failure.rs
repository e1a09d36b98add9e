//! `on_failure` commands, fired when a guarded command does not finish cleanly

use tracing::{error, info};

use crate::error::CommandError;
use crate::plan::Invocation;

/// Runs the configured `on_failure` commands from `Drop` unless disarmed.
///
/// Arm it before the fallible work and call [`FailureGuard::disarm`] once the
/// work succeeded; an early `?` return or a panic leaves it armed.
pub struct FailureGuard<'a, R>
where
    R: FnMut(&Invocation) -> Result<(), CommandError>,
{
    commands: &'a [String],
    run: R,
    armed: bool,
}

impl<'a, R> FailureGuard<'a, R>
where
    R: FnMut(&Invocation) -> Result<(), CommandError>,
{
    pub fn arm(commands: &'a [String], run: R) -> Self {
        Self {
            commands,
            run,
            armed: true,
        }
    }

    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl<R> Drop for FailureGuard<'_, R>
where
    R: FnMut(&Invocation) -> Result<(), CommandError>,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if std::thread::panicking() {
            error!("recovered from panic");
        }

        for command in self.commands {
            info!(command = %command, "running on_failure command");
            if let Err(e) = (self.run)(&Invocation::shell(command.as_str())) {
                error!(command = %command, error = %e, "on_failure command failed");
            }
        }
    }
}
