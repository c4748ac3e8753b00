//! Run configuration for Inciser
//!
//! One [`RunConfig`] describes a complete incising run. It is organized into
//! sections:
//! - Connection settings (candidate ports, baud rate, flow-control window)
//! - Motion settings (travel speed, soft scaling, polling delays)
//! - Blocks (tapered outlines to fill with holes)
//! - Burn settings (hole spacing, power, dwell)
//!
//! Every field has a default, so a config file only needs the values that
//! differ.

use crate::error::{SettingsError, SettingsResult};
use inciser_camtools::{BurnParameters, HoleGridParameters, Segment, TaperedBlock};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest gap between keepalive commands the firmware tolerates during a burn (ms)
pub const MAX_KEEPALIVE_MS: u64 = 250;

/// Longest dwell accepted for a single hole (ms)
pub const MAX_BURN_DURATION_MS: u64 = 60_000;

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Device paths tried in order
    pub candidates: Vec<String>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Maximum unacknowledged commands in flight
    pub window: usize,
    /// Pause after the wake-up newlines before draining startup chatter (ms)
    pub startup_wait_ms: u64,
}

impl ConnectionSettings {
    /// Startup wait as a duration
    pub fn startup_wait(&self) -> Duration {
        Duration::from_millis(self.startup_wait_ms)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            candidates: vec![
                "/dev/cu.usbserial-14110".to_string(),
                "/dev/ttyUSB0".to_string(),
            ],
            baud_rate: 230400,
            window: 20,
            startup_wait_ms: 1000,
        }
    }
}

/// Motion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Travel feed rate (mm/min)
    pub move_speed: u32,
    /// Machine units per logical unit along X
    pub soft_scale_x: f64,
    /// Machine units per logical unit along Y
    pub soft_scale_y: f64,
    /// Arrival tolerance for synchronous moves (mm, per axis)
    pub tolerance: f64,
    /// Delay between position queries while waiting for a report (ms)
    pub query_retry_ms: u64,
    /// Delay after a synchronous move is acknowledged before polling (ms)
    pub settle_ms: u64,
    /// Delay between arrival checks (ms)
    pub poll_interval_ms: u64,
    /// Keepalive period during a stationary burn (ms)
    pub keepalive_ms: u64,
}

impl MotionSettings {
    /// Position query retry delay
    pub fn query_retry(&self) -> Duration {
        Duration::from_millis(self.query_retry_ms)
    }

    /// Settle delay after a move
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Delay between arrival checks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Keepalive period
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_ms)
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            move_speed: 24000,
            soft_scale_x: 1.0,
            soft_scale_y: 1.0,
            tolerance: 0.01,
            query_retry_ms: 10,
            settle_ms: 100,
            poll_interval_ms: 50,
            keepalive_ms: MAX_KEEPALIVE_MS,
        }
    }
}

/// Burn settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnSettings {
    /// Target hole spacing (mm)
    pub interval: f64,
    /// Space rows exactly `interval` apart
    pub quantize_y: bool,
    /// Laser power setpoint (1000 = 100%)
    pub power: u32,
    /// Dwell per hole (ms)
    pub duration_ms: u64,
    /// Burn only the first row of each block
    pub first_row_only: bool,
}

impl BurnSettings {
    /// Parameters for the burn scheduler
    pub fn parameters(&self) -> BurnParameters {
        BurnParameters {
            power: self.power,
            duration_ms: self.duration_ms,
            first_row_only: self.first_row_only,
        }
    }
}

impl Default for BurnSettings {
    fn default() -> Self {
        let burn = BurnParameters::default();
        Self {
            interval: 8.0,
            quantize_y: true,
            power: burn.power,
            duration_ms: burn.duration_ms,
            first_row_only: burn.first_row_only,
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Send `$21=0` after connecting
    pub disable_hard_limits: bool,
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Motion settings
    pub motion: MotionSettings,
    /// Blocks to incise, in order
    pub blocks: Vec<HoleGridParameters>,
    /// Burn settings
    pub burn: BurnSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            disable_hard_limits: false,
            connection: ConnectionSettings::default(),
            motion: MotionSettings::default(),
            blocks: vec![HoleGridParameters {
                segments: vec![Segment::new(0.0, 0.0, 50.0), Segment::new(-10.0, 50.0, 70.0)],
                margin: 7.0,
            }],
            burn: BurnSettings::default(),
        }
    }
}

impl RunConfig {
    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match extension(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => return Err(SettingsError::UnsupportedFormat(other.unwrap_or("").to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => return Err(SettingsError::UnsupportedFormat(other.unwrap_or("").to_string())),
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.connection.candidates.is_empty() {
            return Err(SettingsError::invalid(
                "connection.candidates",
                "at least one device path is required",
            ));
        }
        if self.connection.baud_rate == 0 {
            return Err(SettingsError::invalid("connection.baud_rate", "must be > 0"));
        }
        if self.connection.window == 0 {
            return Err(SettingsError::invalid("connection.window", "must be at least 1"));
        }

        if self.motion.move_speed == 0 {
            return Err(SettingsError::invalid("motion.move_speed", "must be > 0"));
        }
        for (key, scale) in [
            ("motion.soft_scale_x", self.motion.soft_scale_x),
            ("motion.soft_scale_y", self.motion.soft_scale_y),
        ] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(SettingsError::invalid(key, "must be a positive number"));
            }
        }
        if !self.motion.tolerance.is_finite() || self.motion.tolerance <= 0.0 {
            return Err(SettingsError::invalid("motion.tolerance", "must be > 0"));
        }
        if !(1..=MAX_KEEPALIVE_MS).contains(&self.motion.keepalive_ms) {
            return Err(SettingsError::invalid(
                "motion.keepalive_ms",
                format!("must be between 1 and {}", MAX_KEEPALIVE_MS),
            ));
        }

        if !self.burn.interval.is_finite() || self.burn.interval <= 0.0 {
            return Err(SettingsError::invalid("burn.interval", "must be > 0"));
        }
        if self.burn.duration_ms > MAX_BURN_DURATION_MS {
            return Err(SettingsError::invalid(
                "burn.duration_ms",
                format!("must be at most {}", MAX_BURN_DURATION_MS),
            ));
        }

        // The interval must also give a grid of bounded size on every block.
        for (index, block) in self.tapered_blocks()?.iter().enumerate() {
            block
                .dimensions(self.burn.interval, self.burn.quantize_y)
                .map_err(|source| SettingsError::InvalidBlock { index, source })?;
        }
        Ok(())
    }

    /// Build every configured block
    pub fn tapered_blocks(&self) -> SettingsResult<Vec<TaperedBlock>> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                block
                    .build()
                    .map_err(|source| SettingsError::InvalidBlock { index, source })
            })
            .collect()
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}
