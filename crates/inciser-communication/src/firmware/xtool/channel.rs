//! Flow-controlled command channel
//!
//! Implements credit-based flow control for the xTool line protocol. Every
//! command written costs one credit; every acknowledgment returns one. The
//! number of unacknowledged commands never exceeds the configured window, and
//! [`CommandChannel::sync`] is the barrier that waits for all credits to come
//! back. An acknowledgment only means "accepted": physical completion is
//! detected one layer up by polling the position.

use super::response_parser::{parse_response, XToolResponse};
use crate::communication::Link;
use inciser_core::{DeviceError, PositionReport, ProtocolViolation, Result};
use std::collections::BTreeMap;

/// How long [`CommandChannel::read_responses`] keeps reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// Read while data is waiting (or while the window is full)
    Available,
    /// Block until no command is in flight
    UntilIdle,
    /// Block for at least one line, then continue as `Available`
    AtLeastOne,
}

/// Owner of the link and of the flow-control window
pub struct CommandChannel<L: Link> {
    link: L,
    window: usize,
    in_flight: usize,
    peak_in_flight: usize,
    position: Option<PositionReport>,
    position_fresh: bool,
    parameters: BTreeMap<u32, String>,
}

impl<L: Link> CommandChannel<L> {
    /// Wrap a link with a flow-control window of `window` commands (at least one)
    pub fn new(link: L, window: usize) -> Self {
        Self {
            link,
            window: window.max(1),
            in_flight: 0,
            peak_in_flight: 0,
            position: None,
            position_fresh: false,
            parameters: BTreeMap::new(),
        }
    }

    /// Send one command, draining pending responses first
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        self.read_responses(DrainMode::Available)?;

        if self.in_flight >= self.window {
            return Err(ProtocolViolation::WindowExceeded {
                in_flight: self.in_flight,
                window: self.window,
            }
            .into());
        }

        self.in_flight += 1;
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight);
        tracing::debug!("SEND [{}/{}]: {}", self.in_flight, self.window, command);
        self.link.write_line(command)
    }

    /// Read and account for device lines according to `mode`
    ///
    /// A full window always forces reading, so a following send has room.
    pub fn read_responses(&mut self, mode: DrainMode) -> Result<()> {
        let mut block = mode == DrainMode::AtLeastOne;
        loop {
            let keep_reading = block
                || self.in_flight >= self.window
                || (mode == DrainMode::UntilIdle && self.in_flight > 0)
                || self.link.has_pending()?;
            if !keep_reading {
                return Ok(());
            }
            block = false;

            let line = self.link.read_line()?;
            tracing::debug!("READ: {}", line);
            self.handle_line(&line)?;
        }
    }

    /// Block until every command sent so far has been acknowledged
    pub fn sync(&mut self) -> Result<()> {
        self.read_responses(DrainMode::UntilIdle)?;
        debug_assert_eq!(self.in_flight, 0);
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Result<()> {
        match parse_response(line) {
            XToolResponse::Ok => self.acknowledge(1, line),
            XToolResponse::Acks(count) => {
                tracing::warn!("Concatenated acknowledgments {:?} counted as {}", line, count);
                self.acknowledge(count, line)
            }
            XToolResponse::Position(axes) => {
                self.position = Some(PositionReport::new(axes));
                self.position_fresh = true;
                Ok(())
            }
            XToolResponse::MalformedPosition(line) => {
                Err(ProtocolViolation::MalformedPosition { line }.into())
            }
            XToolResponse::Parameter { number, value } => {
                self.parameters.insert(number, value);
                Ok(())
            }
            XToolResponse::Error(line) => {
                tracing::error!("Device error: {}", line);
                Err(DeviceError::new(line).into())
            }
            XToolResponse::Unrecognized(line) => {
                tracing::info!("Device: {}", line);
                Ok(())
            }
            XToolResponse::Blank => Ok(()),
        }
    }

    fn acknowledge(&mut self, count: usize, line: &str) -> Result<()> {
        match self.in_flight.checked_sub(count) {
            Some(remaining) => {
                self.in_flight = remaining;
                Ok(())
            }
            None => Err(ProtocolViolation::UnexpectedAcknowledgment {
                line: line.to_string(),
                in_flight: self.in_flight,
            }
            .into()),
        }
    }

    /// Query all device settings (`$$`), replacing the cached map
    pub fn query_parameters(&mut self) -> Result<&BTreeMap<u32, String>> {
        self.parameters.clear();
        self.send_command("$$")?;
        self.sync()?;
        Ok(&self.parameters)
    }

    /// Mark the cached position as stale
    pub fn invalidate_position(&mut self) {
        self.position_fresh = false;
    }

    /// The position report received since the last invalidation, if any
    pub fn fresh_position(&self) -> Option<PositionReport> {
        if self.position_fresh {
            self.position
        } else {
            None
        }
    }

    /// Most recent position report, fresh or not
    pub fn last_position(&self) -> Option<PositionReport> {
        self.position
    }

    /// Settings collected from `$N=value` lines
    pub fn parameters(&self) -> &BTreeMap<u32, String> {
        &self.parameters
    }

    /// Commands sent but not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Highest in-flight count seen on this channel
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    /// Configured window size
    pub fn window(&self) -> usize {
        self.window
    }

    /// The underlying link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// The underlying link, mutably
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Close the channel and hand the link back
    pub fn into_link(self) -> L {
        self.link
    }
}
