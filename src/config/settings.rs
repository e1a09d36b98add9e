//! Runtime settings assembled from the command line

use std::time::Duration;

use crate::constants::retry;

/// Immutable options handed by reference to the engine entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Print commands instead of running them
    pub dry_run: bool,

    /// Time between polls; zero disables polling
    pub poll_interval: Duration,

    /// Force a hardware re-probe on every poll
    pub active_poll: bool,

    /// Suspend polling this long after a rule was applied; zero disables
    pub pause: Duration,

    /// Attempts per command, first try included
    pub retry_attempts: u32,

    /// Linear backoff step between attempts
    pub retry_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dry_run: false,
            poll_interval: Duration::from_secs(2),
            active_poll: false,
            pause: Duration::ZERO,
            retry_attempts: retry::ATTEMPTS,
            retry_delay: retry::DELAY_STEP,
        }
    }
}
