//! Laser head interface
//!
//! The seam between burn planning and the device. The xTool motion controller
//! implements it; tests implement it with recorders.

use crate::data::Point;
use crate::error::Result;
use std::time::Duration;

/// Motion and beam primitives needed to execute a burn schedule
pub trait LaserHead {
    /// Locally tracked logical position
    fn logical_position(&self) -> Point;

    /// Turn the beam on (laser mode enable)
    fn enable_beam(&mut self) -> Result<()>;

    /// Turn the beam off
    fn disable_beam(&mut self) -> Result<()>;

    /// Queue a zero-power move to an absolute logical position
    ///
    /// Returns once queued, not once executed.
    fn move_absolute(&mut self, x: f64, y: f64) -> Result<()>;

    /// Move to an absolute logical position and return only once the machine
    /// has physically arrived
    fn move_absolute_synchronous(&mut self, x: f64, y: f64) -> Result<()>;

    /// Hold the beam at the current position for `duration`
    ///
    /// `None` keeps the currently active power setpoint.
    fn burn_stationary(&mut self, duration: Duration, power: Option<u32>) -> Result<()>;
}
