//! State-machine parser for `xrandr --query --props` reports
//!
//! The report is walked line by line through a peekable cursor. A state
//! either consumes the line under the cursor or hands it, unconsumed, to the
//! next state (single-line pushback). Dropping that pushback silently loses
//! or duplicates outputs.

use tracing::debug;

use super::edid::generate_monitor_id;
use super::{Mode, Output, Topology};
use crate::constants::report::*;
use crate::constants::xrandr::SCREEN_PREFIX;
use crate::error::{EdidError, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting the screen summary
    Start,
    /// Expecting an output line
    Output,
    /// Tab-indented property lines of the current output
    AdditionalProperties,
    /// Hex fragments of the current output's EDID
    IdentityBlock,
    /// Mode lines of the current output
    Mode,
}

/// What to do with the line under the cursor after a state ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Consume,
    Reprocess,
}

struct Parser {
    state: State,
    outputs: Vec<Output>,
    pending: Option<Output>,
    edid: String,
}

/// Parse a complete report. Any malformed line fails the whole parse.
pub fn parse_report(report: &str) -> Result<Topology, ParseError> {
    let mut parser = Parser {
        state: State::Start,
        outputs: Vec::new(),
        pending: None,
        edid: String::new(),
    };

    let mut cursor = report.lines().enumerate().peekable();
    let mut last_line = 0;
    while let Some(&(index, line)) = cursor.peek() {
        last_line = index + 1;
        if parser.step(last_line, line)? == Step::Consume {
            cursor.next();
        }
    }

    parser.finish(last_line + 1)
}

impl Parser {
    fn step(&mut self, line_no: usize, line: &str) -> Result<Step, ParseError> {
        match self.state {
            State::Start => {
                if !line.starts_with(SCREEN_PREFIX) {
                    return Err(ParseError::MissingScreenHeader {
                        line: line_no,
                        found: line.to_string(),
                    });
                }
                self.state = State::Output;
                Ok(Step::Consume)
            }

            State::Output => {
                self.pending = Some(parse_output_line(line_no, line)?);
                self.state = State::AdditionalProperties;
                Ok(Step::Consume)
            }

            State::AdditionalProperties => {
                if line.starts_with(EDID_PROPERTY) {
                    self.edid.clear();
                    self.state = State::IdentityBlock;
                    return Ok(Step::Consume);
                }
                if line.starts_with(PROPERTY_INDENT) {
                    return Ok(Step::Consume);
                }
                self.state = State::Mode;
                Ok(Step::Reprocess)
            }

            State::IdentityBlock => match parse_edid_line(line_no, line)? {
                Some(fragment) => {
                    self.edid.push_str(fragment);
                    Ok(Step::Consume)
                }
                None => {
                    self.finish_identity(line_no)?;
                    self.state = State::AdditionalProperties;
                    Ok(Step::Reprocess)
                }
            },

            State::Mode => match parse_mode_line(line_no, line)? {
                Some(mode) => {
                    if let Some(output) = self.pending.as_mut() {
                        output.modes.push(mode);
                    }
                    Ok(Step::Consume)
                }
                None => {
                    self.outputs.extend(self.pending.take());
                    self.state = State::Output;
                    Ok(Step::Reprocess)
                }
            },
        }
    }

    /// Hand the accumulated hex to the identity decoder.
    fn finish_identity(&mut self, line_no: usize) -> Result<(), ParseError> {
        let hex_block = std::mem::take(&mut self.edid);
        let Some(output) = self.pending.as_mut() else {
            return Ok(());
        };

        match generate_monitor_id(&hex_block) {
            Ok(id) => output.monitor_id = Some(id),
            Err(err @ EdidError::TooShort { .. }) => {
                debug!(output = %output.name, error = %err, "ignoring truncated EDID");
            }
            Err(source) => {
                return Err(ParseError::Identity {
                    line: line_no,
                    source,
                });
            }
        }
        Ok(())
    }

    fn finish(mut self, line_no: usize) -> Result<Topology, ParseError> {
        match self.state {
            State::Start => {
                return Err(ParseError::MissingScreenHeader {
                    line: line_no,
                    found: String::new(),
                });
            }
            State::IdentityBlock => self.finish_identity(line_no)?,
            _ => {}
        }

        self.outputs.extend(self.pending.take());
        Ok(Topology::new(self.outputs))
    }
}

fn malformed(line_no: usize, reason: &'static str, line: &str) -> ParseError {
    ParseError::Malformed {
        line: line_no,
        reason,
        text: line.to_string(),
    }
}

/// `NAME connected|disconnected [primary] [WxH+X+Y] ...`
fn parse_output_line(line_no: usize, line: &str) -> Result<Output, ParseError> {
    let mut words = line.split_whitespace();

    let name = words
        .next()
        .ok_or_else(|| malformed(line_no, "line too short, name not found", line))?;
    let state = words
        .next()
        .ok_or_else(|| malformed(line_no, "line too short, state not found", line))?;

    let mut output = Output::new(name);
    output.connected = match state {
        "connected" => true,
        "disconnected" => false,
        other => {
            return Err(ParseError::UnknownState {
                line: line_no,
                state: other.to_string(),
            });
        }
    };

    let mut next = words.next();
    if next == Some("primary") {
        output.primary = true;
        next = words.next();
    }

    // Unplugged but still driven: keep the mode it is stuck in
    if !output.connected {
        if let Some(mode) = next.and_then(geometry_mode) {
            output.modes.push(Mode {
                name: mode.to_string(),
                default: false,
                active: true,
            });
        }
    }

    Ok(output)
}

/// Mode name of a `WIDTHxHEIGHT+X+Y` geometry token.
fn geometry_mode(token: &str) -> Option<&str> {
    let mut parts = token.split('+');
    let mode = parts.next().filter(|m| !m.is_empty())?;
    (parts.count() == 2).then_some(mode)
}

/// `  NAME RATE[*][+] [+] [RATE...]`; `Ok(None)` if the line is not a mode line.
///
/// Every rate token is scanned: a `+` suffix (or a lone `+`) marks the default
/// mode and a `*` left after stripping it marks the active one.
fn parse_mode_line(line_no: usize, line: &str) -> Result<Option<Mode>, ParseError> {
    if !line.starts_with(MODE_INDENT) {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let name = words
        .next()
        .ok_or_else(|| malformed(line_no, "line too short, mode name not found", line))?;

    let mut mode = Mode::new(name);
    let mut rates = words.peekable();
    if rates.peek().is_none() {
        return Err(malformed(line_no, "line too short, no refresh rate found", line));
    }

    for rate in rates {
        let rate = match rate.strip_suffix(DEFAULT_MARKER) {
            Some(rest) => {
                mode.default = true;
                rest
            }
            None => rate,
        };
        if rate.ends_with(ACTIVE_MARKER) {
            mode.active = true;
        }
    }

    Ok(Some(mode))
}

/// One hex fragment per line; `Ok(None)` once the block has ended.
fn parse_edid_line<'a>(line_no: usize, line: &'a str) -> Result<Option<&'a str>, ParseError> {
    if !line.starts_with(VALUE_INDENT) {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let fragment = words
        .next()
        .ok_or_else(|| malformed(line_no, "line too short, no EDID part found", line))?;
    if words.next().is_some() {
        return Err(malformed(
            line_no,
            "line too long, expected only one EDID part",
            line,
        ));
    }

    Ok(Some(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    fn mode(name: &str, default: bool, active: bool) -> Mode {
        Mode {
            name: name.to_string(),
            default,
            active,
        }
    }

    const LAPTOP_AND_MONITOR: &str = "Screen 0: minimum 320 x 200, current 3280 x 1200, maximum 8192 x 8192
LVDS1 connected (normal left inverted right x axis y axis)
   1366x768      60.10 +
   1024x768      60.00
   800x600       60.32    56.25
   640x480       59.94
VGA1 disconnected (normal left inverted right x axis y axis)
HDMI1 disconnected (normal left inverted right x axis y axis)
DP1 disconnected (normal left inverted right x axis y axis)
HDMI2 connected 1600x1200+0+0 (normal left inverted right x axis y axis) 408mm x 306mm
   1600x1200     60.00*+
   1280x1024     75.02    60.02
   1024x768      75.08    70.07    60.00
DP2 disconnected (normal left inverted right x axis y axis)
DP3 disconnected (normal left inverted right x axis y axis)";

    const DOCKED_PRIMARY: &str = "Screen 0: minimum 8 x 8, current 4480 x 1440, maximum 32767 x 32767
eDP1 connected 1920x1080+2560+0 (normal left inverted right x axis y axis) 276mm x 156mm
   1920x1080     60.04*+
   1400x1050     59.98
DP1 disconnected (normal left inverted right x axis y axis)
DP2-1 disconnected (normal left inverted right x axis y axis)
DP2-2 connected primary 2560x1440+0+0 (normal left inverted right x axis y axis) 597mm x 336mm
   2560x1440     59.95*+
   1920x1080     60.00    50.00    59.94    30.00    25.00    24.00    29.97    23.98
DP2-3 disconnected (normal left inverted right x axis y axis)";

    const UNPLUGGED_BUT_ACTIVE: &str = "Screen 0: minimum 320 x 200, current 3280 x 1200, maximum 8192 x 8192
LVDS1 connected (normal left inverted right x axis y axis)
   1366x768      60.10 +
   1024x768      60.00
HDMI2 disconnected 1600x1200+0+0 (normal left inverted right x axis y axis) 0mm x 0mm
HDMI3 disconnected 1680x1050+1600+0 (normal left inverted right x axis y axis) 0mm x 0mm";

    const WITH_PROPERTIES: &str = "Screen 0: minimum 8 x 8, current 3840 x 1080, maximum 32767 x 32767
eDP1 connected primary 1920x1080+1920+0 (normal left inverted right x axis y axis) 310mm x 170mm
\tEDID:
\t\t00ffffffffffff000daeb11400000000
\t\t0c190104951f117802ff359255529529
\t\t25505400000001010101010101010101
\t\t010101010101b43b804a71383440503c
\t\t680034ad10000018000000fe004e3134
\t\t304843452d4541410a20000000fe0043
\t\t4d4e0a202020202020202020000000fe
\t\t004e3134304843452d4541410a2000a2
\tBACKLIGHT: 332
\t\trange: (0, 852)
\tscaling mode: Full aspect
\t\tsupported: None, Full, Center, Full aspect
   1920x1080     60.01*+
   1400x1050     59.98
DP1 disconnected (normal left inverted right x axis y axis)
\tBroadcast RGB: Automatic
\t\tsupported: Automatic, Full, Limited 16:235
HDMI2 connected 1920x1080+0+0 (normal left inverted right x axis y axis) 530mm x 300mm
\tEDID:
\t\t00ffffffffffff004c2d3a0a35323330
\t\t2417010380351e782af711a3564f9e28
\t\t0f5054bfef80714f81c0810081809500
\t\ta9c0b3000101023a801871382d40582c
\t\t4500132b2100001e011d007251d01e20
\t\t6e285500132b2100001e000000fd0032
\t\t4b1e5111000a202020202020000000fc
\t\t00533234433335300a20202020200118
\t\t02031af14690041f1303122309070783
\t\t01000066030c00100080011d00bc52d0
\t\t1e20b8285540132b2100001e8c0ad090
\t\t204031200c405500132b210000188c0a
\t\td08a20e02d10103e9600132b21000018
\t\t00000000000000000000000000000000
\t\t00000000000000000000000000000000
\t\t00000000000000000000000000000099
\taudio: auto
\t\tsupported: force-dvi, off, auto, on
   1920x1080     60.00*+  50.00    59.94
   1680x1050     59.88
VIRTUAL1 disconnected (normal left inverted right x axis y axis)";

    /// Render a topology back into report form (no EDID: identities are one-way).
    fn render_report(topology: &Topology) -> String {
        let mut out = String::from(
            "Screen 0: minimum 8 x 8, current 1920 x 1080, maximum 32767 x 32767\n",
        );
        for output in topology {
            let state = if output.connected { "connected" } else { "disconnected" };
            write!(out, "{} {}", output.name, state).unwrap();
            if output.primary {
                out.push_str(" primary");
            }
            if !output.connected {
                if let Some(active) = output.modes.iter().find(|m| m.active) {
                    write!(out, " {}+0+0", active.name).unwrap();
                }
            }
            out.push_str(" (normal left inverted right x axis y axis)\n");
            if output.connected {
                for mode in &output.modes {
                    let active = if mode.active { "*" } else { "" };
                    let default = if mode.default { "+" } else { "" };
                    writeln!(out, "   {:<13} 60.00{active}{default}", mode.name).unwrap();
                }
            }
        }
        out
    }

    #[test]
    fn test_parse_laptop_and_monitor() {
        let topology = parse_report(LAPTOP_AND_MONITOR).unwrap();
        let expected = Topology::new(vec![
            Output {
                name: "LVDS1".to_string(),
                connected: true,
                modes: vec![
                    mode("1366x768", true, false),
                    Mode::new("1024x768"),
                    Mode::new("800x600"),
                    Mode::new("640x480"),
                ],
                ..Output::default()
            },
            Output::new("VGA1"),
            Output::new("HDMI1"),
            Output::new("DP1"),
            Output {
                name: "HDMI2".to_string(),
                connected: true,
                modes: vec![
                    mode("1600x1200", true, true),
                    Mode::new("1280x1024"),
                    Mode::new("1024x768"),
                ],
                ..Output::default()
            },
            Output::new("DP2"),
            Output::new("DP3"),
        ]);
        assert_eq!(topology, expected);
    }

    #[test]
    fn test_parse_primary_output() {
        let topology = parse_report(DOCKED_PRIMARY).unwrap();
        assert_eq!(topology.outputs.len(), 5);

        let dp = topology.get("DP2-2").unwrap();
        assert!(dp.connected);
        assert!(dp.primary);
        assert_eq!(dp.modes[0], mode("2560x1440", true, true));
        assert_eq!(dp.modes[1], Mode::new("1920x1080"));

        let edp = topology.get("eDP1").unwrap();
        assert!(!edp.primary);
        assert!(edp.is_active());
    }

    #[test]
    fn test_parse_disconnected_but_active() {
        let topology = parse_report(UNPLUGGED_BUT_ACTIVE).unwrap();
        assert_eq!(topology.outputs.len(), 3);

        let hdmi2 = topology.get("HDMI2").unwrap();
        assert!(!hdmi2.connected);
        assert_eq!(hdmi2.modes, vec![mode("1600x1200", false, true)]);

        let hdmi3 = topology.get("HDMI3").unwrap();
        assert_eq!(hdmi3.modes, vec![mode("1680x1050", false, true)]);
    }

    #[test]
    fn test_parse_properties_and_identity() {
        let topology = parse_report(WITH_PROPERTIES).unwrap();
        let names: Vec<_> = topology.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["eDP1", "DP1", "HDMI2", "VIRTUAL1"]);

        let edp = topology.get("eDP1").unwrap();
        assert_eq!(edp.monitor_id.as_deref(), Some("CMN-5297-0--"));
        assert!(edp.primary);
        assert_eq!(
            edp.modes,
            vec![mode("1920x1080", true, true), Mode::new("1400x1050")]
        );

        let hdmi = topology.get("HDMI2").unwrap();
        assert_eq!(
            hdmi.monitor_id.as_deref(),
            Some("SAM-2618-808661557-S24C350-")
        );
        assert_eq!(hdmi.modes.len(), 2);

        assert_eq!(topology.get("DP1").unwrap().monitor_id, None);
        assert!(topology.get("DP1").unwrap().modes.is_empty());
    }

    #[test]
    fn test_parse_round_trip() {
        for report in [LAPTOP_AND_MONITOR, DOCKED_PRIMARY, UNPLUGGED_BUT_ACTIVE] {
            let first = parse_report(report).unwrap();
            let second = parse_report(&render_report(&first)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_missing_screen_header() {
        let report = "LVDS1 connected (normal left inverted right x axis y axis)\n   1366x768      60.10 +";
        let err = parse_report(report).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingScreenHeader {
                line: 1,
                found: "LVDS1 connected (normal left inverted right x axis y axis)".to_string(),
            }
        );
        assert!(err.to_string().contains("Screen"));
    }

    #[test]
    fn test_empty_report_is_rejected() {
        assert!(matches!(
            parse_report(""),
            Err(ParseError::MissingScreenHeader { .. })
        ));
    }

    #[test]
    fn test_unknown_state_fails_whole_parse() {
        let report = "Screen 0: minimum 8 x 8\nLVDS1 connected\n   1366x768      60.10 +\nVGA1 unknown connection";
        assert_eq!(
            parse_report(report),
            Err(ParseError::UnknownState {
                line: 4,
                state: "unknown".to_string(),
            })
        );
    }

    #[test]
    fn test_mode_line_without_rate() {
        let report = "Screen 0: minimum 8 x 8\nLVDS1 connected\n   1366x768";
        assert!(matches!(
            parse_report(report),
            Err(ParseError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn test_edid_line_with_two_fragments() {
        let report = "Screen 0: minimum 8 x 8\nHDMI1 connected\n\tEDID: \n\t\t00ffffffffffff00 4c2d3a0a35323330";
        assert!(matches!(
            parse_report(report),
            Err(ParseError::Malformed { line: 4, .. })
        ));
    }

    #[test]
    fn test_truncated_edid_is_ignored() {
        let report = "Screen 0: minimum 8 x 8\nHDMI1 connected\n\tEDID: \n\t\t00ffffffffffff004c2d3a0a35323330\n   1920x1080     60.00*+";
        let topology = parse_report(report).unwrap();
        let hdmi = topology.get("HDMI1").unwrap();
        assert_eq!(hdmi.monitor_id, None);
        assert_eq!(hdmi.modes, vec![mode("1920x1080", true, true)]);
    }

    #[test]
    fn test_corrupt_edid_fails_parse() {
        let block = crate::randr::edid::tests::CMN_PANEL.replacen("00ffffffffffff00", "00ffffeeffffff00", 1);
        let report = format!("Screen 0: minimum 8 x 8\nHDMI1 connected\n\tEDID: \n\t\t{block}\n   1920x1080     60.00*+");
        assert_eq!(
            parse_report(&report),
            Err(ParseError::Identity {
                line: 5,
                source: EdidError::BadHeader,
            })
        );
    }

    #[test]
    fn test_edid_block_at_end_of_report() {
        let block = crate::randr::edid::tests::CMN_PANEL;
        let report = format!("Screen 0: minimum 8 x 8\neDP1 connected\n\tEDID: \n\t\t{block}");
        let topology = parse_report(&report).unwrap();
        assert_eq!(
            topology.get("eDP1").unwrap().monitor_id.as_deref(),
            Some("CMN-5297-0--")
        );
    }

    #[test]
    fn test_parse_output_line() {
        let out = parse_output_line(1, "LVDS1 connected (normal left inverted right x axis y axis)").unwrap();
        assert_eq!(out, Output { connected: true, ..Output::new("LVDS1") });

        let out = parse_output_line(1, "VGA1 disconnected (normal left inverted right x axis y axis)").unwrap();
        assert_eq!(out, Output::new("VGA1"));

        let out = parse_output_line(
            1,
            "HDMI3 disconnected 1680x1050+1600+0 (normal left inverted right x axis y axis) 0mm x 0mm",
        )
        .unwrap();
        assert_eq!(out.modes, vec![mode("1680x1050", false, true)]);

        let out = parse_output_line(
            1,
            "DP3-1-8 connected primary 2560x1440+0+0 (normal left inverted right x axis y axis) 553mm x 311mm",
        )
        .unwrap();
        assert_eq!(
            out,
            Output {
                connected: true,
                primary: true,
                ..Output::new("DP3-1-8")
            }
        );
    }

    #[test]
    fn test_parse_mode_line() {
        let cases = [
            ("  1152x864      75.00", mode("1152x864", false, false)),
            ("  1024x768      75.08    70.07    60.00", mode("1024x768", false, false)),
            ("  1600x1200     60.00*+", mode("1600x1200", true, true)),
            ("  1366x768      60.10 +", mode("1366x768", true, false)),
            ("  1920x1080     60.00 +  50.00*   59.94", mode("1920x1080", true, true)),
            ("  2560x1440     59.95*", mode("2560x1440", false, true)),
            // Later rate tokens count too
            ("  1280x1024     75.02    60.02*+", mode("1280x1024", true, true)),
            ("  800x600       72.19    60.32 +", mode("800x600", true, false)),
        ];
        for (line, expected) in cases {
            assert_eq!(parse_mode_line(1, line).unwrap(), Some(expected), "{line}");
        }
        assert_eq!(parse_mode_line(1, "VGA1 disconnected").unwrap(), None);
    }
}
