//! The watch loop: snapshot, match, apply, wait
//!
//! A [`Reconciler`] remembers the last rule it applied and the topology it
//! last saw. Every wake-up it takes a new snapshot, tears down outputs whose
//! monitor went away or changed, and applies the first matching rule unless
//! that rule is already in effect.

use anyhow::{Context, Result, bail};
use std::future::pending;
use std::pin::Pin;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep};
use tracing::{debug, info, warn};

use crate::apply::{apply_rule, run_with_retry};
use crate::config::{Config, Settings};
use crate::events::Notification;
use crate::executor::Executor;
use crate::matcher::match_rules;
use crate::plan::disable_outputs;
use crate::randr::{DisplayQuery, Topology};

/// Which query a cycle starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Current,
    Rescan,
}

pub struct Reconciler<'a, Q, E> {
    query: &'a Q,
    executor: &'a E,
    config: &'a Config,
    settings: &'a Settings,
    applied: Option<String>,
    last: Option<Topology>,
}

impl<'a, Q: DisplayQuery, E: Executor> Reconciler<'a, Q, E> {
    pub fn new(query: &'a Q, executor: &'a E, config: &'a Config, settings: &'a Settings) -> Self {
        Self {
            query,
            executor,
            config,
            settings,
            applied: None,
            last: None,
        }
    }

    /// Name of the rule currently in effect, if any.
    pub fn applied(&self) -> Option<&str> {
        self.applied.as_deref()
    }

    /// Run one reconciliation cycle. Returns `true` if a rule was applied.
    pub async fn cycle(&mut self, snapshot: Snapshot) -> Result<bool> {
        let mut topology = self.snapshot(snapshot).await?;

        let stale = stale_outputs(self.last.as_ref(), &topology);
        if let Some(invocation) = disable_outputs(stale.iter().map(String::as_str)) {
            info!(outputs = ?stale, "disabling outputs whose monitor changed or went away");
            if !run_with_retry(&invocation, "stale outputs", self.settings, self.executor).await? {
                warn!(outputs = ?stale, "could not disable stale outputs");
            }
            self.applied = None;
            topology = self.snapshot(Snapshot::Rescan).await?;
        }

        let changed = self.last.as_ref() != Some(&topology);
        let applied = match match_rules(&self.config.rules, &topology) {
            None => {
                if changed || self.applied.is_some() {
                    warn!(outputs = %topology, "no rule matches the current outputs");
                }
                self.applied = None;
                false
            }
            Some(rule) if self.applied.as_deref() == Some(rule.name.as_str()) => false,
            Some(rule) => {
                info!(rule = %rule.name, outputs = %topology, "new rule found");
                apply_rule(rule, &topology, self.config, self.settings, self.executor)
                    .await
                    .with_context(|| format!("Failed to apply rule {:?}", rule.name))?;
                self.applied = Some(rule.name.clone());

                // Remember the state the rule produced, not the one it replaced
                topology = self.snapshot(Snapshot::Current).await?;
                true
            }
        };

        self.last = Some(topology);
        Ok(applied)
    }

    /// Reconcile until shutdown is requested or something fatal happens.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<Notification>,
        mut done: watch::Receiver<bool>,
    ) -> Result<()> {
        let period = self.settings.poll_interval;
        let mut ticker = (!period.is_zero()).then(|| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut backoff: Option<Pin<Box<Sleep>>> = None;
        let mut event_received = false;

        loop {
            if backoff.is_none() {
                let snapshot = if event_received || self.settings.active_poll {
                    Snapshot::Rescan
                } else {
                    Snapshot::Current
                };
                event_received = false;

                if self.cycle(snapshot).await? && !self.settings.pause.is_zero() {
                    info!(pause = ?self.settings.pause, "disabling polling");
                    backoff = Some(Box::pin(sleep(self.settings.pause)));
                }
            }

            tokio::select! {
                notification = events.recv() => match notification {
                    Some(Notification::Changed) => {
                        debug!("new RandR change event received");
                        event_received = true;
                    }
                    Some(Notification::TransportError(e)) => return Err(e.into()),
                    None => bail!("RandR listener stopped"),
                },
                _ = next_tick(&mut ticker) => {}
                _ = expire(&mut backoff) => {
                    info!("reenabling polling");
                    backoff = None;
                }
                _ = done.changed() => {
                    info!(rule = ?self.applied(), "shutting down");
                    return Ok(());
                }
            }
        }
    }

    async fn snapshot(&self, snapshot: Snapshot) -> Result<Topology> {
        let topology = match snapshot {
            Snapshot::Current => self.query.current().await,
            Snapshot::Rescan => self.query.rescan().await,
        };
        topology.context("Failed to query outputs")
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}

async fn expire(backoff: &mut Option<Pin<Box<Sleep>>>) {
    match backoff {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

/// Outputs that were active in `previous` and are now inactive, or are still
/// active but show a different monitor. Outputs that vanished are left alone.
pub fn stale_outputs(previous: Option<&Topology>, current: &Topology) -> Vec<String> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    previous
        .iter()
        .filter(|old| old.is_active())
        .filter(|old| match current.get(&old.name) {
            Some(new) => !new.is_active() || new.monitor_id != old.monitor_id,
            None => false,
        })
        .map(|old| old.name.clone())
        .collect()
}
