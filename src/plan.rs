//! Command plan synthesis
//!
//! Turns a rule's desired layout and the current topology into the ordered
//! list of tool invocations that realise it.

use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

use crate::config::{Layout, Rule};
use crate::constants::{shell, xrandr};
use crate::error::ConfigurationError;
use crate::randr::Topology;

/// Where an enabled output goes relative to the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    RightOf(String),
    Below(String),
}

/// One `--output NAME ...` group of an xrandr invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Enable {
        output: String,
        /// Explicit mode; `None` means `--auto`
        mode: Option<String>,
        placement: Option<Placement>,
        primary: bool,
    },
    Disable {
        output: String,
    },
}

impl Directive {
    fn disable(output: &str) -> Self {
        Self::Disable {
            output: output.to_string(),
        }
    }

    pub fn output(&self) -> &str {
        match self {
            Self::Enable { output, .. } | Self::Disable { output } => output,
        }
    }

    fn push_args(&self, args: &mut Vec<String>) {
        args.push("--output".to_string());
        args.push(self.output().to_string());
        match self {
            Self::Disable { .. } => args.push("--off".to_string()),
            Self::Enable {
                mode,
                placement,
                primary,
                ..
            } => {
                match mode {
                    Some(mode) => args.extend(["--mode".to_string(), mode.clone()]),
                    None => args.push("--auto".to_string()),
                }
                match placement {
                    Some(Placement::RightOf(prev)) => {
                        args.extend(["--right-of".to_string(), prev.clone()])
                    }
                    Some(Placement::Below(prev)) => {
                        args.extend(["--below".to_string(), prev.clone()])
                    }
                    None => {}
                }
                if *primary {
                    args.push("--primary".to_string());
                }
            }
        }
    }
}

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// One call of the display tool with any number of output directives
    Xrandr(Vec<Directive>),
    /// A verbatim shell command
    Shell(String),
}

impl Invocation {
    pub fn shell(command: impl Into<String>) -> Self {
        Self::Shell(command.into())
    }

    pub fn program(&self) -> &'static str {
        match self {
            Self::Xrandr(_) => xrandr::PROGRAM,
            Self::Shell(_) => shell::PROGRAM,
        }
    }

    pub fn args(&self) -> Vec<String> {
        match self {
            Self::Xrandr(directives) => {
                let mut args = Vec::new();
                for directive in directives {
                    directive.push_args(&mut args);
                }
                args
            }
            Self::Shell(command) => vec![shell::COMMAND_FLAG.to_string(), command.clone()],
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())?;
        for arg in self.args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Build the invocations that apply `rule` on top of `topology`.
pub fn build_plan(rule: &Rule, topology: &Topology) -> Result<Vec<Invocation>, ConfigurationError> {
    let (entries, row) = match rule.layout()? {
        Layout::Command(command) => return Ok(vec![Invocation::shell(command)]),
        Layout::Single(single) => (vec![single], true),
        Layout::Row(outputs) => (outputs.iter().map(String::as_str).collect(), true),
        Layout::Column(outputs) => (outputs.iter().map(String::as_str).collect(), false),
    };
    debug!(rule = %rule.name, outputs = ?entries, "enable outputs");

    let mut enables = VecDeque::new();
    let mut previous: Option<&str> = None;
    for entry in &entries {
        // `NAME@` without a mode falls back to `--auto`
        let (name, mode) = match entry.split_once('@') {
            Some((name, mode)) => (name, Some(mode).filter(|m| !m.is_empty()).map(str::to_string)),
            None => (*entry, None),
        };
        let placement = previous.map(|prev| {
            if row {
                Placement::RightOf(prev.to_string())
            } else {
                Placement::Below(prev.to_string())
            }
        });
        enables.push_back(Directive::Enable {
            output: name.to_string(),
            mode,
            placement,
            primary: rule.primary.as_deref() == Some(name),
        });
        previous = Some(name);
    }

    let mut disables: VecDeque<Directive> = disable_order(rule, topology, &enables)
        .into_iter()
        .map(Directive::disable)
        .collect();
    debug!(rule = %rule.name, outputs = ?disables.iter().map(Directive::output).collect::<Vec<_>>(), "disable outputs");

    if rule.atomic {
        debug!(rule = %rule.name, "using one atomic call to {}", xrandr::PROGRAM);
        let directives = disables.into_iter().chain(enables).collect();
        return Ok(vec![Invocation::Xrandr(directives)]);
    }

    debug!(rule = %rule.name, "splitting the configuration into several calls to {}", xrandr::PROGRAM);
    let mut plan = Vec::new();

    // Free a slot first, then trade one disable for one enable per call
    if let Some(first) = disables.pop_front() {
        plan.push(Invocation::Xrandr(vec![first]));
    }
    loop {
        let step: Vec<Directive> = disables
            .pop_front()
            .into_iter()
            .chain(enables.pop_front())
            .collect();
        if step.is_empty() {
            break;
        }
        plan.push(Invocation::Xrandr(step));
    }

    Ok(plan)
}

/// Connected or still-active outputs the layout does not use, in disable order.
fn disable_order<'t>(rule: &Rule, topology: &'t Topology, enables: &VecDeque<Directive>) -> Vec<&'t str> {
    let mut unused: Vec<&str> = topology
        .iter()
        .filter(|o| o.connected || o.is_active())
        .map(|o| o.name.as_str())
        .filter(|name| !enables.iter().any(|d| d.output() == *name))
        .collect();

    let mut ordered = Vec::with_capacity(unused.len());
    for name in &rule.disable_order {
        if let Some(pos) = unused.iter().position(|u| u == name) {
            ordered.push(unused.remove(pos));
        }
    }
    ordered.extend(unused);
    ordered
}

/// One invocation switching off all the named outputs, or `None` if there are none.
pub fn disable_outputs<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<Invocation> {
    let directives: Vec<Directive> = names.into_iter().map(Directive::disable).collect();
    (!directives.is_empty()).then_some(Invocation::Xrandr(directives))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::randr::{Mode, Output};

    fn connected(name: &str) -> Output {
        Output {
            connected: true,
            modes: vec![Mode::new("1920x1080")],
            ..Output::new(name)
        }
    }

    fn abc() -> Topology {
        Topology::new(vec![connected("A"), connected("B"), connected("C")])
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn args(invocation: &Invocation) -> String {
        invocation.args().join(" ")
    }

    #[test]
    fn test_row_split() {
        let rule = Rule {
            configure_row: names(&["A", "B"]),
            ..Rule::default()
        };
        let plan = build_plan(&rule, &abc()).unwrap();

        let rendered: Vec<String> = plan.iter().map(args).collect();
        assert_eq!(
            rendered,
            vec![
                "--output C --off",
                "--output A --auto",
                "--output B --auto --right-of A",
            ]
        );
    }

    #[test]
    fn test_row_atomic() {
        let rule = Rule {
            configure_row: names(&["A", "B"]),
            atomic: true,
            ..Rule::default()
        };
        let plan = build_plan(&rule, &abc()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].to_string(),
            "xrandr --output C --off --output A --auto --output B --auto --right-of A"
        );
    }

    #[test]
    fn test_split_pairs_disables_with_enables() {
        let topology = Topology::new(vec![
            connected("A"),
            connected("B"),
            connected("C"),
            connected("D"),
            connected("E"),
        ]);
        let rule = Rule {
            configure_row: names(&["D", "E"]),
            ..Rule::default()
        };
        let plan = build_plan(&rule, &topology).unwrap();

        let rendered: Vec<String> = plan.iter().map(args).collect();
        assert_eq!(
            rendered,
            vec![
                "--output A --off",
                "--output B --off --output D --auto",
                "--output C --off --output E --auto --right-of D",
            ]
        );
    }

    #[test]
    fn test_column_with_modes_and_primary() {
        let rule = Rule {
            configure_column: names(&["HDMI1@1920x1080", "eDP1"]),
            primary: Some("eDP1".to_string()),
            ..Rule::default()
        };
        let topology = Topology::new(vec![connected("eDP1"), connected("HDMI1")]);
        let plan = build_plan(&rule, &topology).unwrap();

        let rendered: Vec<String> = plan.iter().map(args).collect();
        assert_eq!(
            rendered,
            vec![
                "--output HDMI1 --mode 1920x1080",
                "--output eDP1 --auto --below HDMI1 --primary",
            ]
        );
    }

    #[test]
    fn test_empty_mode_means_auto() {
        let rule = Rule {
            configure_row: names(&["A@", "B@1280x1024"]),
            atomic: true,
            ..Rule::default()
        };
        let topology = Topology::new(vec![connected("A"), connected("B")]);
        let plan = build_plan(&rule, &topology).unwrap();
        assert_eq!(
            args(&plan[0]),
            "--output A --auto --output B --mode 1280x1024 --right-of A"
        );
    }

    #[test]
    fn test_disable_order_is_honoured() {
        let rule = Rule {
            configure_single: Some("A".to_string()),
            disable_order: names(&["C", "missing", "B"]),
            atomic: true,
            ..Rule::default()
        };
        let plan = build_plan(&rule, &abc()).unwrap();
        assert_eq!(
            args(&plan[0]),
            "--output C --off --output B --off --output A --auto"
        );
    }

    #[test]
    fn test_disconnected_but_active_output_is_disabled() {
        let stale = Output {
            modes: vec![Mode {
                name: "1600x1200".to_string(),
                default: false,
                active: true,
            }],
            ..Output::new("HDMI2")
        };
        let topology = Topology::new(vec![connected("LVDS1"), stale, Output::new("VGA1")]);
        let rule = Rule {
            configure_single: Some("LVDS1".to_string()),
            ..Rule::default()
        };
        let plan = build_plan(&rule, &topology).unwrap();

        let rendered: Vec<String> = plan.iter().map(args).collect();
        assert_eq!(rendered, vec!["--output HDMI2 --off", "--output LVDS1 --auto"]);
    }

    #[test]
    fn test_command_layout_is_verbatim() {
        let rule = Rule {
            configure_command: Some("xrandr --output HDMI1 --auto --scale 2x2".to_string()),
            ..Rule::default()
        };
        let plan = build_plan(&rule, &abc()).unwrap();
        assert_eq!(
            plan,
            vec![Invocation::Shell("xrandr --output HDMI1 --auto --scale 2x2".to_string())]
        );
        assert_eq!(plan[0].program(), "sh");
        assert_eq!(plan[0].args()[0], "-c");
    }

    #[test]
    fn test_missing_configuration_is_an_error() {
        let rule = Rule {
            name: "nothing".to_string(),
            ..Rule::default()
        };
        assert_eq!(
            build_plan(&rule, &abc()),
            Err(ConfigurationError::NoConfiguration {
                rule: "nothing".to_string()
            })
        );
    }

    #[test]
    fn test_disable_outputs() {
        assert_eq!(disable_outputs(std::iter::empty()), None);
        let invocation = disable_outputs(["HDMI1", "DP1"]).unwrap();
        assert_eq!(invocation.to_string(), "xrandr --output HDMI1 --off --output DP1 --off");
    }
}
