//! Subcommand entry points

use anyhow::{Context, Result, anyhow};
use std::fmt::Write as _;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc;
use tracing::info;

use crate::apply::apply_rule;
use crate::cli::Cli;
use crate::config::{Config, Rule, Settings};
use crate::constants::events::CHANNEL_CAPACITY;
use crate::events;
use crate::executor::ShellExecutor;
use crate::failure::FailureGuard;
use crate::matcher::match_rules;
use crate::plan::Invocation;
use crate::randr::{DisplayQuery, Output, Topology, Xrandr};
use crate::reconcile::Reconciler;

pub fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Everything the configuring commands share.
pub struct Session {
    config: Config,
    settings: Settings,
    executor: ShellExecutor,
}

impl Session {
    pub fn load(cli: &Cli) -> Result<Self> {
        let (config, _) = Config::load(cli.config.as_deref())?;
        let settings = cli.settings();
        let executor = ShellExecutor::new(settings.dry_run);
        Ok(Self {
            config,
            settings,
            executor,
        })
    }

    /// Drive `work` to completion; `on_failure` commands run if it fails or panics.
    pub fn guarded(&self, work: impl Future<Output = Result<()>>) -> Result<()> {
        let guard = FailureGuard::arm(&self.config.on_failure, |invocation: &Invocation| {
            self.executor.run_blocking(invocation)
        });
        runtime()?.block_on(work)?;
        guard.disarm();
        Ok(())
    }

    pub async fn watch(&self) -> Result<()> {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let (done_tx, done_rx) = tokio::sync::watch::channel(false);

        let _listener = events::spawn_listener(sender, done_rx.clone(), Handle::current())?;
        #[cfg(unix)]
        let _signals = events::spawn_signal_handler(done_tx)?;
        #[cfg(not(unix))]
        let _done_tx = done_tx;

        info!(
            interval = ?self.settings.poll_interval,
            pause = ?self.settings.pause,
            active_poll = self.settings.active_poll,
            "watching for changes"
        );
        Reconciler::new(&Xrandr, &self.executor, &self.config, &self.settings)
            .run(receiver, done_rx)
            .await
    }

    pub async fn update(&self) -> Result<()> {
        let topology = detect().await?;
        let rule = match_rules(&self.config.rules, &topology)
            .ok_or_else(|| anyhow!("no rule matches the current outputs"))?;
        info!(rule = %rule.name, "rule matches");
        self.apply_to(rule, &topology).await
    }

    pub async fn apply(&self, name: &str) -> Result<()> {
        let rule = self
            .config
            .find_rule(name)
            .ok_or_else(|| anyhow!("rule {name:?} not found"))?;
        info!(rule = %rule.name, "found matching rule");
        let topology = detect().await?;
        self.apply_to(rule, &topology).await
    }

    async fn apply_to(&self, rule: &Rule, topology: &Topology) -> Result<()> {
        apply_rule(rule, topology, &self.config, &self.settings, &self.executor)
            .await
            .with_context(|| format!("Failed to apply rule {:?}", rule.name))?;
        Ok(())
    }
}

async fn detect() -> Result<Topology> {
    Xrandr.rescan().await.context("Failed to detect outputs")
}

pub async fn show(json: bool) -> Result<()> {
    let topology = detect().await?;
    let connected: Vec<&Output> = topology.iter().filter(|o| o.connected).collect();

    if json {
        let rendered =
            serde_json::to_string_pretty(&connected).context("Failed to serialize outputs")?;
        println!("{rendered}");
    } else {
        print!("{}", describe_outputs(&connected));
    }
    Ok(())
}

fn describe_outputs(outputs: &[&Output]) -> String {
    let mut text = String::new();
    for output in outputs {
        let id = output.monitor_id.as_deref().unwrap_or_default();
        let _ = writeln!(text, "{:<10} {id}", output.name);
    }
    text
}

pub fn rules(cli: &Cli) -> Result<()> {
    let (config, _) = Config::load(cli.config.as_deref())?;
    print!("{}", describe_rules(&config, cli.verbose));
    Ok(())
}

fn describe_rules(config: &Config, verbose: bool) -> String {
    fn list(text: &mut String, label: &str, values: &[String]) {
        if !values.is_empty() {
            let _ = writeln!(text, "  {label}: {values:?}");
        }
    }
    fn one(text: &mut String, label: &str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            let _ = writeln!(text, "  {label}: {value}");
        }
    }

    let mut text = String::new();
    for rule in &config.rules {
        let _ = writeln!(text, "{}", rule.name);
        if !verbose {
            continue;
        }
        list(&mut text, "Connected", &rule.outputs_connected);
        list(&mut text, "Disconnected", &rule.outputs_disconnected);
        list(&mut text, "Present", &rule.outputs_present);
        list(&mut text, "Absent", &rule.outputs_absent);
        one(&mut text, "ConfigureSingle", rule.configure_single.as_deref());
        list(&mut text, "ConfigureRow", &rule.configure_row);
        list(&mut text, "ConfigureColumn", &rule.configure_column);
        one(&mut text, "ConfigureCommand", rule.configure_command.as_deref());
        one(&mut text, "Primary", rule.primary.as_deref());
        if rule.atomic {
            text.push_str("  Atomic: true\n");
        }
        list(&mut text, "DisableOrder", &rule.disable_order);
        list(&mut text, "ExecuteAfter", &rule.execute_after);
    }
    text
}

pub fn version() {
    println!(
        "{} {} compiled for {}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
