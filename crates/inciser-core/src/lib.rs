//! # Inciser Core
//!
//! Core types, traits, and the error taxonomy shared by the Inciser crates.
//! Provides the position/point data model and the [`LaserHead`] seam that
//! the burn scheduler drives.

pub mod data;
pub mod error;
pub mod head;

pub use data::{Point, PositionReport};
pub use error::{ConnectionError, DeviceError, Error, GeometryError, ProtocolViolation, Result};
pub use head::LaserHead;
