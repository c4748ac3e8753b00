//! Position polling
//!
//! The firmware answers `?` with a `<MPos:...>` line followed by an `ok`.
//! Acknowledgments of earlier commands may interleave, so the tracker waits
//! for a fresh report and then syncs to settle the accounting.

use super::channel::{CommandChannel, DrainMode};
use crate::communication::Link;
use inciser_core::{PositionReport, Result};
use std::thread;
use std::time::Duration;

/// Issues status queries and extracts the real machine position
#[derive(Debug, Clone, Copy)]
pub struct PositionTracker {
    retry_delay: Duration,
}

impl PositionTracker {
    /// Create a tracker sleeping `retry_delay` between reads while waiting
    pub fn new(retry_delay: Duration) -> Self {
        Self { retry_delay }
    }

    /// Query the machine position, returning with nothing in flight
    pub fn query<L: Link>(&self, channel: &mut CommandChannel<L>) -> Result<PositionReport> {
        channel.invalidate_position();
        channel.send_command("?")?;

        let report = loop {
            if let Some(report) = channel.fresh_position() {
                break report;
            }
            thread::sleep(self.retry_delay);
            channel.read_responses(DrainMode::AtLeastOne)?;
        };

        channel.sync()?;
        tracing::trace!("Position: {:?}", report.axes);
        Ok(report)
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}
