use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "layoutd", version, about = "Configure X outputs automatically from a rule file")]
pub struct Cli {
    #[arg(short, long, global = true, help = "Be verbose")]
    pub verbose: bool,

    #[arg(short = 'C', long, global = true, help = "Read rules from this file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'n', long, global = true, help = "Only print the commands that would be run")]
    pub dry_run: bool,

    #[arg(
        short,
        long,
        global = true,
        default_value_t = 2,
        value_name = "SECS",
        help = "Poll interval, 0 disables polling"
    )]
    pub interval: u64,

    #[arg(short, long, global = true, help = "Re-probe outputs on every poll (slow)")]
    pub active_poll: bool,

    #[arg(
        short,
        long,
        global = true,
        default_value_t = 0,
        value_name = "SECS",
        help = "Pause polling this long after a rule was applied"
    )]
    pub pause: u64,

    #[arg(short, long, global = true, value_name = "PATH", help = "Also write log messages to this file")]
    pub logfile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch for changes and apply the first matching rule
    Watch,
    /// Apply the first matching rule once
    Update,
    /// Apply a rule by name
    Apply {
        #[arg(value_name = "RULE")]
        rule: String,
    },
    /// List connected outputs and their monitor ids
    Show {
        #[arg(long, help = "Output machine-readable JSON")]
        json: bool,
    },
    /// List the configured rules
    #[command(alias = "layouts")]
    Rules,
    /// Print version information
    Version,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            dry_run: self.dry_run,
            poll_interval: Duration::from_secs(self.interval),
            active_poll: self.active_poll,
            pause: Duration::from_secs(self.pause),
            ..Settings::default()
        }
    }
}
