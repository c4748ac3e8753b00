//! Connection bring-up
//!
//! Wakes the controller, throws away whatever it printed before we were
//! listening, and sends the fixed initialization sequence one acknowledged
//! command at a time.

use super::channel::CommandChannel;
use crate::communication::Link;
use inciser_core::Result;
use std::thread;
use std::time::Duration;

/// Initialization commands, each synced before the next
pub const INIT_SEQUENCE: &[&str] = &[
    // Firmware info; the D1 refuses to move until it has seen this
    "$I",
    // Fan/power reset, as the vendor software does on connect
    "M106 S0",
    // XY plane
    "G17",
    // No radius compensation
    "G40",
    // Millimeters, first work offset
    "G21 G54",
    // Relative coordinates
    "G91",
    // Variable power laser mode
    "M4",
    "?",
];

const STARTUP_DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// Bring a freshly opened link into a known state and wrap it in a channel
pub fn open_channel<L: Link>(
    mut link: L,
    window: usize,
    startup_wait: Duration,
) -> Result<CommandChannel<L>> {
    link.write_line("")?;
    link.write_line("")?;
    thread::sleep(startup_wait);

    // Anything buffered now would corrupt the acknowledgment count.
    while link.has_pending()? {
        let line = link.read_line()?;
        tracing::info!("Startup: {}", line);
        thread::sleep(startup_wait.min(STARTUP_DRAIN_INTERVAL));
    }

    let mut channel = CommandChannel::new(link, window);
    for command in INIT_SEQUENCE {
        channel.send_command(command)?;
        channel.sync()?;
    }
    tracing::info!("Connected to {}", channel.link().name());
    Ok(channel)
}
