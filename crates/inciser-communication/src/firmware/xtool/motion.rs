//! Motion and burn primitives
//!
//! The D1 firmware has no dwell (`G4`), so timed burns are built from
//! synchronous moves: a move is complete only once the polled machine
//! position has converged on the target, and a stationary burn is a zero
//! motion `G1` re-issued before the firmware's command timeout cuts it off.
//!
//! Power (`S`) and feed (`F`) are modal setpoints on the device. They are
//! emitted only when they differ from the last value sent.

use super::channel::CommandChannel;
use super::position::PositionTracker;
use crate::communication::Link;
use inciser_core::{Error, LaserHead, Point, Result};
use std::thread;
use std::time::{Duration, Instant};

/// Longest gap between keep-alive burns before the firmware times out
pub const MAX_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(250);

/// Timing and tolerance settings for [`MotionController`]
#[derive(Debug, Clone, PartialEq)]
pub struct MotionConfig {
    /// Feed for zero-power travel moves (mm/min)
    pub move_speed: u32,
    /// Per-axis arrival tolerance for synchronous moves (mm)
    pub tolerance: f64,
    /// Sleep between reads while waiting for a position report
    pub query_retry: Duration,
    /// Wait after a synchronous move is acknowledged before polling
    pub settle_delay: Duration,
    /// Sleep between position polls while the head is still moving
    pub poll_interval: Duration,
    /// Re-issue interval for stationary burns, capped at [`MAX_KEEPALIVE_INTERVAL`]
    pub keepalive_interval: Duration,
    /// Host-side X scaling applied to emitted deltas
    pub soft_scale_x: f64,
    /// Host-side Y scaling applied to emitted deltas
    pub soft_scale_y: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            // 400 mm/s
            move_speed: 24_000,
            tolerance: 0.01,
            query_retry: Duration::from_millis(10),
            settle_delay: Duration::from_millis(100),
            // Polling much faster stalls the D1's command processing.
            poll_interval: Duration::from_millis(50),
            keepalive_interval: MAX_KEEPALIVE_INTERVAL,
            soft_scale_x: 1.0,
            soft_scale_y: 1.0,
        }
    }
}

/// Relative/absolute motion and burning on an xTool engraver
pub struct MotionController<L: Link> {
    channel: CommandChannel<L>,
    tracker: PositionTracker,
    config: MotionConfig,
    logical: Point,
    active_power: u32,
    active_speed: u32,
    last_power: Option<u32>,
    last_speed: Option<u32>,
}

impl<L: Link> MotionController<L> {
    /// Create a controller over an initialized channel
    pub fn new(channel: CommandChannel<L>, config: MotionConfig) -> Self {
        Self {
            channel,
            tracker: PositionTracker::new(config.query_retry),
            config,
            logical: Point::default(),
            active_power: 1,
            active_speed: 1000,
            last_power: None,
            last_speed: None,
        }
    }

    /// Current motion settings
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// The command channel
    pub fn channel(&self) -> &CommandChannel<L> {
        &self.channel
    }

    /// The command channel, mutably
    pub fn channel_mut(&mut self) -> &mut CommandChannel<L> {
        &mut self.channel
    }

    /// Close the controller and hand back the link
    pub fn into_link(self) -> L {
        self.channel.into_link()
    }

    /// Wait until every queued command has been acknowledged
    pub fn sync(&mut self) -> Result<()> {
        self.channel.sync()
    }

    /// Locally tracked logical position
    pub fn logical_position(&self) -> Point {
        self.logical
    }

    /// Treat the current position as the logical origin
    pub fn set_soft_origin(&mut self) {
        self.logical = Point::default();
    }

    /// Scale every emitted delta, e.g. for custom rails with a different pitch
    pub fn set_soft_scaling(&mut self, x: f64, y: f64) {
        self.config.soft_scale_x = x;
        self.config.soft_scale_y = y;
    }

    /// Feed for zero-power travel moves (mm/min)
    pub fn set_move_speed(&mut self, speed: u32) {
        self.config.move_speed = speed;
    }

    /// Set the active power setpoint used by following burns
    pub fn set_power(&mut self, power: u32) {
        self.active_power = power;
    }

    /// Set the active feed setpoint used by following burns
    pub fn set_speed(&mut self, speed: u32) {
        self.active_speed = speed;
    }

    /// Active (power, speed) setpoints
    pub fn setpoints(&self) -> (u32, u32) {
        (self.active_power, self.active_speed)
    }

    /// Set steps/mm through `$100`/`$101`
    pub fn set_scaling(&mut self, x: f64, y: f64) -> Result<()> {
        tracing::warn!("set_scaling has no effect on the xTool D1 firmware");
        self.channel.send_command(&format!("$100={}", x * 100.0))?;
        self.channel.send_command(&format!("$101={}", y * 100.0))
    }

    /// Disable the physical limit switches (`$21=0`)
    pub fn disable_hard_limits(&mut self) -> Result<()> {
        tracing::warn!("Disabling physical limit switches for machine working area bounds");
        self.channel.send_command("$21=0")
    }

    /// Constant power laser mode (`M3`)
    pub fn set_constant_power(&mut self) -> Result<()> {
        self.channel.send_command("M3")
    }

    /// Variable power laser mode (`M4`)
    pub fn set_variable_power(&mut self) -> Result<()> {
        self.channel.send_command("M4")
    }

    fn format_delta(&self, dx: f64, dy: f64) -> String {
        let dx = dx * self.config.soft_scale_x;
        let dy = dy * self.config.soft_scale_y;
        match (dx == 0.0, dy == 0.0) {
            (true, true) => String::new(),
            (false, true) => format!("X{:.6}", dx),
            (true, false) => format!("Y{:.6}", dy),
            (false, false) => format!("X{:.6}Y{:.6}", dx, dy),
        }
    }

    /// Emit a combined motion and power command (`G1`)
    ///
    /// `None` keeps the active setpoint. The logical position follows the
    /// unscaled delta.
    pub fn burn(&mut self, dx: f64, dy: f64, speed: Option<u32>, power: Option<u32>) -> Result<()> {
        if let Some(power) = power {
            self.active_power = power;
        }
        if let Some(speed) = speed {
            self.active_speed = speed;
        }

        let mut command = format!("G1{}", self.format_delta(dx, dy));
        if self.last_power != Some(self.active_power) {
            command.push_str(&format!("S{}", self.active_power));
            self.last_power = Some(self.active_power);
        }
        if self.last_speed != Some(self.active_speed) {
            command.push_str(&format!("F{}", self.active_speed));
            self.last_speed = Some(self.active_speed);
        }

        self.logical = Point::new(self.logical.x + dx, self.logical.y + dy);
        self.channel.send_command(&command)
    }

    /// Queue a zero-power travel move without disturbing the active setpoints
    pub fn move_relative(&mut self, dx: f64, dy: f64) -> Result<()> {
        let (power, speed) = self.setpoints();
        let result = self.burn(dx, dy, Some(self.config.move_speed), Some(0));
        self.active_power = power;
        self.active_speed = speed;
        result
    }

    /// Move and return only once the head has physically arrived
    ///
    /// Assumes the head is stationary when called.
    pub fn move_relative_synchronous(&mut self, dx: f64, dy: f64) -> Result<()> {
        if dx == 0.0 && dy == 0.0 {
            return Ok(());
        }

        let start = self.tracker.query(&mut self.channel)?;
        let target = Point::new(
            start.x() + self.config.soft_scale_x * dx,
            start.y() + self.config.soft_scale_y * dy,
        );
        tracing::trace!("Move {} -> {}", start.xy(), target);

        self.move_relative(dx, dy)?;
        self.channel.sync()?;
        thread::sleep(self.config.settle_delay);

        loop {
            let now = self.tracker.query(&mut self.channel)?;
            if now.xy().within(&target, self.config.tolerance) {
                return Ok(());
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// Queue a travel move to an absolute logical position
    pub fn move_absolute(&mut self, x: f64, y: f64) -> Result<()> {
        self.move_relative(x - self.logical.x, y - self.logical.y)
    }

    /// Travel to an absolute logical position and wait for arrival
    pub fn move_absolute_synchronous(&mut self, x: f64, y: f64) -> Result<()> {
        self.move_relative_synchronous(x - self.logical.x, y - self.logical.y)
    }

    /// Hold the beam at the current position for `duration`
    pub fn burn_stationary(&mut self, duration: Duration, power: Option<u32>) -> Result<()> {
        let interval = self.config.keepalive_interval.min(MAX_KEEPALIVE_INTERVAL);
        // Checked before the beam goes on.
        if Instant::now().checked_add(duration).is_none() {
            return Err(Error::DurationOutOfRange(duration));
        }

        self.burn(0.0, 0.0, None, power)?;
        self.channel.sync()?;

        let started = Instant::now();
        loop {
            let elapsed = started.elapsed();
            if elapsed >= duration {
                break;
            }
            thread::sleep(interval.min(duration - elapsed));
            // The firmware ends a G1 on its own after a timeout; keep it alive.
            self.burn(0.0, 0.0, None, power)?;
        }

        self.channel.send_command("G0")?;
        self.channel.sync()
    }

    /// Trace the outline of a `dx` x `dy` rectangle starting at the current position
    pub fn burn_rectangle(
        &mut self,
        dx: f64,
        dy: f64,
        power: Option<u32>,
        speed: Option<u32>,
    ) -> Result<()> {
        if let Some(power) = power {
            self.active_power = power;
        }
        if let Some(speed) = speed {
            self.active_speed = speed;
        }
        self.burn(0.0, dy, None, None)?;
        self.burn(dx, 0.0, None, None)?;
        self.burn(0.0, -dy, None, None)?;
        self.burn(-dx, 0.0, None, None)?;
        self.burn(0.0, 0.0, None, Some(0))
    }
}

impl<L: Link> LaserHead for MotionController<L> {
    fn logical_position(&self) -> Point {
        self.logical
    }

    fn enable_beam(&mut self) -> Result<()> {
        self.channel.send_command("M3")
    }

    fn disable_beam(&mut self) -> Result<()> {
        self.channel.send_command("M5")
    }

    fn move_absolute(&mut self, x: f64, y: f64) -> Result<()> {
        MotionController::move_absolute(self, x, y)
    }

    fn move_absolute_synchronous(&mut self, x: f64, y: f64) -> Result<()> {
        MotionController::move_absolute_synchronous(self, x, y)
    }

    fn burn_stationary(&mut self, duration: Duration, power: Option<u32>) -> Result<()> {
        MotionController::burn_stationary(self, duration, power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::simulator::SimulatedLaser;

    fn controller() -> MotionController<SimulatedLaser> {
        MotionController::new(
            CommandChannel::new(SimulatedLaser::new(), 20),
            MotionConfig::default(),
        )
    }

    #[test]
    fn test_format_delta() {
        let mut motion = controller();
        assert_eq!(motion.format_delta(0.0, 0.0), "");
        assert_eq!(motion.format_delta(1.5, 0.0), "X1.500000");
        assert_eq!(motion.format_delta(0.0, -2.0), "Y-2.000000");
        motion.set_soft_scaling(2.0, 0.5);
        assert_eq!(motion.format_delta(1.0, 4.0), "X2.000000Y2.000000");
    }

    #[test]
    fn test_keepalive_is_capped() {
        let mut motion = controller();
        motion.config.keepalive_interval = Duration::from_secs(5);
        let started = Instant::now();
        motion
            .burn_stationary(Duration::from_millis(30), Some(10))
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
