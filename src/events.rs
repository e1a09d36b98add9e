//! Background listeners feeding the reconciliation loop
//!
//! - **RandR**: a dedicated thread with its own X connection that turns every
//!   screen, CRTC or output change into a [`Notification`]
//! - **signals**: SIGINT/SIGTERM flip the shared "done" flag

use anyhow::{Context, Result};
use std::fmt::Debug;
use std::thread;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::watch;
use tracing::{debug, error, info};
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::randr::{ConnectionExt as RandrExt, NotifyMask};
use x11rb::rust_connection::RustConnection;

use crate::constants::events::SEND_TIMEOUT;
use crate::error::NotificationError;

/// Something happened to the display configuration. Payloads are not inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Changed,
    TransportError(NotificationError),
}

/// Subscribe to RandR change events and forward them from a background thread.
///
/// Subscription errors are returned here; later transport errors arrive as
/// [`Notification::TransportError`] and end the thread.
pub fn spawn_listener(
    sender: Sender<Notification>,
    done: watch::Receiver<bool>,
    runtime: Handle,
) -> Result<thread::JoinHandle<()>> {
    let conn = subscribe()?;

    thread::Builder::new()
        .name("randr-listener".to_string())
        .spawn(move || {
            info!("RandR listener started");
            listen(|| conn.wait_for_event(), &sender, &done, &runtime, SEND_TIMEOUT);
            debug!("RandR listener stopped");
        })
        .context("Failed to spawn RandR listener thread")
}

fn subscribe() -> Result<RustConnection> {
    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;

    let version = conn
        .randr_query_version(1, 2)
        .context("Failed to query RandR version")?
        .reply()
        .context("RandR extension not available")?;
    info!(
        major = version.major_version,
        minor = version.minor_version,
        "successfully connected to x11 with RandR"
    );

    let root = conn.setup().roots[screen_num].root;
    let mask = NotifyMask::SCREEN_CHANGE
        | NotifyMask::CRTC_CHANGE
        | NotifyMask::OUTPUT_CHANGE
        | NotifyMask::OUTPUT_PROPERTY;
    conn.randr_select_input(root, mask)
        .context("Failed to send RandR SelectInput")?
        .check()
        .context("Failed to subscribe to RandR change events")?;
    conn.flush().context("Failed to flush X connection")?;

    Ok(conn)
}

/// Forward events from `next_event` until it fails, the loop goes away or
/// `done` is set. A send that cannot complete within `timeout` is dropped.
fn listen<T, F>(
    mut next_event: F,
    sender: &Sender<Notification>,
    done: &watch::Receiver<bool>,
    runtime: &Handle,
    timeout: Duration,
) where
    T: Debug,
    F: FnMut() -> Result<T, ConnectionError>,
{
    loop {
        let event = next_event();
        if *done.borrow() {
            return;
        }

        let notification = match event {
            Ok(event) => {
                debug!(?event, "RandR event");
                Notification::Changed
            }
            Err(e) => {
                error!(error = %e, "X connection failed");
                Notification::TransportError(NotificationError(e.to_string()))
            }
        };
        let fatal = matches!(notification, Notification::TransportError(_));

        match runtime.block_on(sender.send_timeout(notification, timeout)) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                debug!("reconciliation loop busy, dropping event");
            }
            Err(SendTimeoutError::Closed(_)) => return,
        }

        if fatal {
            return;
        }
    }
}

/// Flip `done` on the first SIGINT or SIGTERM.
#[cfg(unix)]
pub fn spawn_signal_handler(done: watch::Sender<bool>) -> Result<thread::JoinHandle<()>> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal, "shutdown requested");
                let _ = done.send(true);
            }
        })
        .context("Failed to spawn signal handler thread")
}
