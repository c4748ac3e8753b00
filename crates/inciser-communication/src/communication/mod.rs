//! Device links
//!
//! A [`Link`] is a newline-framed byte stream to the engraver. The serial
//! implementation talks to hardware; the simulator stands in for it in tests.

pub mod serial;
pub mod simulator;

use inciser_core::Result;

/// Newline-framed connection to the device
pub trait Link {
    /// Write one line; the link appends the `\r\n` terminator
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Whether received data is waiting to be read
    fn has_pending(&mut self) -> Result<bool>;

    /// Read one line, blocking until a full line is available
    ///
    /// The returned line has surrounding whitespace trimmed.
    fn read_line(&mut self) -> Result<String>;

    /// Human readable name of the link (port path)
    fn name(&self) -> String;
}

/// Connection parameters for a serial link
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionParams {
    /// Port path (e.g. "/dev/ttyUSB0")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout of a single low-level read (ms)
    pub read_timeout_ms: u64,
}

impl ConnectionParams {
    /// Parameters for `port` at `baud_rate` with the default read timeout
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Default::default()
        }
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 230_400,
            read_timeout_ms: 10,
        }
    }
}
