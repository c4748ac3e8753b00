//! Error handling for Inciser
//!
//! Every error here is fatal for a run: nothing retries blind motion after an
//! unconfirmed device state. The taxonomy follows the layers of the system:
//! - Protocol violations (malformed lines, acknowledgment accounting)
//! - Device errors (explicit `err` lines from the firmware)
//! - Connection errors (discovery and the serial link)
//! - Geometry errors (invalid block descriptions, caught before any motion)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Protocol violation
///
/// The device sent something the command channel cannot account for.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolViolation {
    /// A line claimed to be a position report but did not parse
    #[error("Malformed position report: {line:?}")]
    MalformedPosition {
        /// The offending line.
        line: String,
    },

    /// More acknowledgments arrived than commands were in flight
    #[error("Acknowledgment {line:?} received with {in_flight} command(s) in flight")]
    UnexpectedAcknowledgment {
        /// The acknowledgment line.
        line: String,
        /// In-flight count before the line was applied.
        in_flight: usize,
    },

    /// A send was attempted with the flow-control window already full
    #[error("Flow-control window exceeded: {in_flight} in flight, window {window}")]
    WindowExceeded {
        /// Commands currently in flight.
        in_flight: usize,
        /// Configured window size.
        window: usize,
    },
}

/// Explicit error reported by the firmware
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Device reported an error: {line}")]
pub struct DeviceError {
    /// The raw error line.
    pub line: String,
}

impl DeviceError {
    /// Create a device error from the raw line
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }
}

/// Connection error type
///
/// Represents failures to reach or talk to the engraver.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// None of the candidate device paths could be opened
    #[error("No serial device found (tried: {})", candidates.join(", "))]
    NoDevice {
        /// The candidate paths that were tried.
        candidates: Vec<String>,
    },

    /// Failed to open a port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Serial port error
    #[error("Serial port error: {reason}")]
    Serial {
        /// The reason for the serial port error.
        reason: String,
    },

    /// The link stopped producing data for good
    #[error("Connection closed")]
    Closed,
}

/// Geometry error type
///
/// Raised while building a block description, before any device interaction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Fewer than two segments
    #[error("Need at least two segments for a tapered block, got {count}")]
    TooFewSegments {
        /// Number of segments supplied.
        count: usize,
    },

    /// Segment y coordinates are not strictly increasing
    #[error("Segment {index} has y={current}, not above the previous y={previous}")]
    UnorderedSegments {
        /// Index of the offending segment.
        index: usize,
        /// y of the previous segment.
        previous: f64,
        /// y of the offending segment.
        current: f64,
    },

    /// A segment holds NaN or infinite values
    #[error("Segment {index} is not finite")]
    NonFiniteSegment {
        /// Index of the offending segment.
        index: usize,
    },

    /// Margin is negative or not finite
    #[error("Invalid margin: {margin}")]
    InvalidMargin {
        /// The rejected margin.
        margin: f64,
    },

    /// Sample interval is not a positive finite number
    #[error("Invalid hole interval: {interval}")]
    InvalidInterval {
        /// The rejected interval.
        interval: f64,
    },

    /// Sample interval is so small the grid would exceed the hole limit
    #[error("Hole interval {interval} is too fine for this block (more than {limit} holes)")]
    TooManyHoles {
        /// The rejected interval.
        interval: f64,
        /// Largest grid that is generated.
        limit: usize,
    },
}

/// Main error type for Inciser
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Protocol violation
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// Device error
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A burn duration too long to schedule on this host's clock
    #[error("Burn duration {0:?} is out of range")]
    DurationOutOfRange(std::time::Duration),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a protocol violation
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }

    /// Check if this is a device error
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Device(_))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
