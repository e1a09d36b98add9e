//! Applying a rule: plan execution with retries, then the post-apply hooks

use anyhow::Result;
use tracing::{info, warn};

use crate::config::{Config, Rule, Settings};
use crate::error::CommandError;
use crate::executor::Executor;
use crate::plan::{Invocation, build_plan};
use crate::randr::Topology;

/// How far an application got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Every invocation succeeded and the `execute_after` hooks ran
    Complete,
    /// At least one invocation gave up; hooks were skipped
    Incomplete,
}

/// Realise `rule` on top of `topology`.
///
/// Invocations run in plan order. One that keeps failing is skipped after
/// `retry_attempts` tries and the rest still run, but then neither the global
/// nor the rule's `execute_after` commands are started. Configuration errors
/// and commands that cannot be spawned at all are returned as errors.
pub async fn apply_rule<E: Executor>(
    rule: &Rule,
    topology: &Topology,
    config: &Config,
    settings: &Settings,
    executor: &E,
) -> Result<Applied> {
    let plan = build_plan(rule, topology)?;
    info!(rule = %rule.name, commands = plan.len(), "applying rule");

    let mut complete = true;
    for invocation in &plan {
        if !run_with_retry(invocation, &rule.name, settings, executor).await? {
            complete = false;
        }
    }

    if !complete {
        warn!(rule = %rule.name, "not running execute_after, configuration commands failed");
        return Ok(Applied::Incomplete);
    }

    for command in config.execute_after.iter().chain(&rule.execute_after) {
        if let Err(e) = executor.run(&Invocation::shell(command.as_str())).await {
            warn!(rule = %rule.name, command = %command, error = %e, "execute_after command failed");
        }
    }

    Ok(Applied::Complete)
}

/// Run one invocation, retrying with a linearly growing delay.
///
/// Returns `Ok(false)` once all attempts are used up.
pub async fn run_with_retry<E: Executor>(
    invocation: &Invocation,
    label: &str,
    settings: &Settings,
    executor: &E,
) -> Result<bool, CommandError> {
    let attempts = settings.retry_attempts.max(1);
    for attempt in 1..=attempts {
        let err = match executor.run(invocation).await {
            Ok(()) => return Ok(true),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => e,
        };
        warn!(rule = %label, attempt, error = %err, "executing command failed");

        if attempt < attempts {
            let delay = settings.retry_delay * attempt;
            warn!(rule = %label, "trying again in {delay:?}");
            tokio::time::sleep(delay).await;
        }
    }

    warn!(rule = %label, command = %invocation, "failed after {} retries", attempts - 1);
    Ok(false)
}
