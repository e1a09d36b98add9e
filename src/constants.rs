//! Application-wide constants
//!
//! This module contains the magic numbers and string literals used throughout
//! the daemon, providing a single source of truth for constant values.

use std::time::Duration;

/// External display-configuration tool
pub mod xrandr {
    /// Executable name of the query/configure tool
    pub const PROGRAM: &str = "xrandr";

    /// Arguments used for every query (`--props` exposes the EDID)
    pub const QUERY_ARGS: &[&str] = &["--query", "--props"];

    /// Extra argument that skips the hardware re-probe
    pub const CURRENT: &str = "--current";

    /// Prefix of the screen summary that opens every report
    pub const SCREEN_PREFIX: &str = "Screen ";
}

/// Report layout markers used by the topology parser
pub mod report {
    /// Property line announcing the identification block
    pub const EDID_PROPERTY: &str = "\tEDID:";

    /// Indentation of an output property line
    pub const PROPERTY_INDENT: &str = "\t";

    /// Indentation of a property value continuation (EDID hex fragment)
    pub const VALUE_INDENT: &str = "\t\t";

    /// Minimal indentation of a mode line
    pub const MODE_INDENT: &str = "  ";

    /// Rate marker for the tool-preferred mode
    pub const DEFAULT_MARKER: char = '+';

    /// Rate marker for the currently driven mode
    pub const ACTIVE_MARKER: char = '*';
}

/// EDID base-block layout
pub mod edid {
    /// Size of the base block in bytes
    pub const BLOCK_LEN: usize = 128;

    /// Fixed 8-byte preamble of every EDID
    pub const HEADER: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];

    /// Byte offsets of the version and revision fields
    pub const VERSION_OFFSET: usize = 18;
    pub const REVISION_OFFSET: usize = 19;

    /// Only EDID 1.3 and 1.4 are understood
    pub const SUPPORTED_VERSION: u8 = 1;
    pub const SUPPORTED_REVISIONS: std::ops::RangeInclusive<u8> = 3..=4;

    /// Manufacturer id (big-endian) and its reserved top bit
    pub const MANUFACTURER_OFFSET: usize = 8;
    pub const MANUFACTURER_RESERVED_BIT: u16 = 0x8000;

    /// Product code (u16) and serial number (u32), both little-endian
    pub const PRODUCT_OFFSET: usize = 10;
    pub const SERIAL_OFFSET: usize = 12;

    /// Four 18-byte descriptor slots start here
    pub const DESCRIPTORS_OFFSET: usize = 54;
    pub const DESCRIPTOR_LEN: usize = 18;
    pub const DESCRIPTOR_COUNT: usize = 4;

    /// Descriptor text payload starts after tag and padding bytes
    pub const DESCRIPTOR_TEXT_OFFSET: usize = 5;

    /// Display descriptor tags
    pub const TAG_SERIAL_STRING: u8 = 0xff;
    pub const TAG_DISPLAY_NAME: u8 = 0xfc;
}

/// Event listener tuning
pub mod events {
    use super::Duration;

    /// Capacity of the notification channel
    pub const CHANNEL_CAPACITY: usize = 16;

    /// How long the listener waits for a busy loop before dropping an event
    pub const SEND_TIMEOUT: Duration = Duration::from_millis(500);
}

/// Command execution retry policy
pub mod retry {
    use super::Duration;

    /// Attempts per invocation (first try included)
    pub const ATTEMPTS: u32 = 4;

    /// Linear backoff step between attempts
    pub const DELAY_STEP: Duration = Duration::from_millis(500);
}

/// Configuration file lookup
pub mod config {
    /// Environment variable pointing at the rule file
    pub const ENV_VAR: &str = "LAYOUTD_CONFIG";

    /// File name below the XDG config directory
    pub const FILENAME: &str = "layoutd.conf";

    /// Dotfile name in the home directory
    pub const HOME_FILENAME: &str = ".layoutd.conf";

    /// System-wide fallback
    pub const SYSTEM_PATH: &str = "/etc/xdg/layoutd.conf";
}

/// Shell used for `configure_command`, `execute_after` and `on_failure`
pub mod shell {
    pub const PROGRAM: &str = "sh";
    pub const COMMAND_FLAG: &str = "-c";
}
