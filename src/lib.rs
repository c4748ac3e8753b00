//! # Inciser
//!
//! Incises timber with an xTool laser engraver: a tapered block is covered
//! with a honeycomb of holes, and each hole is burned as a timed stationary
//! spot over the serial link.
//!
//! ## Architecture
//!
//! Inciser is organized as a workspace with multiple crates:
//!
//! 1. **inciser-core** - Shared types, error taxonomy, the `LaserHead` trait
//! 2. **inciser-communication** - Serial link, xTool protocol, motion control
//! 3. **inciser-camtools** - Hole grid generation and burn scheduling
//! 4. **inciser-settings** - Run configuration (JSON/TOML)
//! 5. **inciser** - Binary that wires a configured run together

pub mod power;

pub use inciser_camtools::{BurnScheduler, BurnSummary, HolePoint};
pub use inciser_communication::{
    open_channel, open_first_available, Link, MotionConfig, MotionController,
};
pub use inciser_core::{Error, Result};
pub use inciser_settings::{MotionSettings, RunConfig, SettingsError, SettingsResult};
pub use power::SleepInhibitor;

use anyhow::Context;
use std::path::Path;

/// Environment variable naming the run configuration file
pub const CONFIG_ENV: &str = "INCISER_CONFIG";

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(())
}

/// Load the run configuration from `path`, or defaults when there is none
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            tracing::info!("{} not set, using the built-in run", CONFIG_ENV);
            Ok(RunConfig::default())
        }
    }
}

/// Motion controller settings for a run configuration
pub fn motion_config(settings: &MotionSettings) -> MotionConfig {
    MotionConfig {
        move_speed: settings.move_speed,
        tolerance: settings.tolerance,
        query_retry: settings.query_retry(),
        settle_delay: settings.settle_delay(),
        poll_interval: settings.poll_interval(),
        keepalive_interval: settings.keepalive_interval(),
        soft_scale_x: settings.soft_scale_x,
        soft_scale_y: settings.soft_scale_y,
    }
}

/// Hole layout of every configured block
///
/// Runs before the device is touched so a bad block never moves the head.
pub fn plan_holes(config: &RunConfig) -> SettingsResult<Vec<Vec<HolePoint>>> {
    let blocks = config.tapered_blocks()?;
    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| {
            block
                .holes(config.burn.interval, config.burn.quantize_y)
                .map_err(|source| SettingsError::InvalidBlock { index, source })
        })
        .collect()
}

/// Burn `blocks` one after the other on a connected engraver
pub fn incise<L: Link>(
    motion: &mut MotionController<L>,
    config: &RunConfig,
    blocks: &[Vec<HolePoint>],
) -> Result<Vec<BurnSummary>> {
    if config.disable_hard_limits {
        motion.disable_hard_limits()?;
    }

    let scheduler = BurnScheduler::new(config.burn.parameters());
    let mut summaries = Vec::with_capacity(blocks.len());
    for (index, holes) in blocks.iter().enumerate() {
        tracing::info!("Block {}: {} holes", index + 1, holes.len());
        summaries.push(scheduler.run(motion, holes)?);
    }

    motion.sync()?;
    Ok(summaries)
}

/// Execute a complete run on the first available engraver
pub fn run(config: &RunConfig) -> anyhow::Result<Vec<BurnSummary>> {
    config.validate()?;
    let blocks = plan_holes(config)?;

    let link = open_first_available(&config.connection.candidates, config.connection.baud_rate)?;
    let channel = open_channel(
        link,
        config.connection.window,
        config.connection.startup_wait(),
    )?;
    let mut motion = MotionController::new(channel, motion_config(&config.motion));

    Ok(incise(&mut motion, config, &blocks)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inciser_communication::{SimulatedLaser, INIT_SEQUENCE};
    use std::time::Duration;
    use tempfile::tempdir;

    fn fast_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.motion.query_retry_ms = 0;
        config.motion.settle_ms = 0;
        config.motion.poll_interval_ms = 0;
        config.burn.duration_ms = 0;
        config
    }

    fn connect(laser: SimulatedLaser, config: &RunConfig) -> MotionController<SimulatedLaser> {
        let channel = open_channel(laser, config.connection.window, Duration::ZERO).unwrap();
        MotionController::new(channel, motion_config(&config.motion))
    }

    #[test]
    fn test_default_run_burns_first_row() {
        let config = fast_config();
        let blocks = plan_holes(&config).unwrap();
        assert_eq!(blocks.len(), 1);

        let laser = SimulatedLaser::new()
            .with_startup_lines(["Grbl 1.1h ['$' for help]"])
            .with_settle_queries(1);
        let mut motion = connect(laser, &config);
        let summaries = incise(&mut motion, &config, &blocks).unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].holes_burned, 7);
        assert_eq!(summaries[0].rows.len(), 1);
        assert_eq!(motion.channel().in_flight(), 0);

        let written = motion.channel().link().written();
        assert_eq!(&written[..INIT_SEQUENCE.len()], INIT_SEQUENCE);
        assert!(!written.iter().any(|l| l == "$21=0"));
        assert_eq!(written.last().map(String::as_str), Some("M5"));
    }

    #[test]
    fn test_full_run_with_hard_limits_disabled() {
        let mut config = fast_config();
        config.burn.first_row_only = false;
        config.disable_hard_limits = true;
        let blocks = plan_holes(&config).unwrap();
        let total: usize = blocks.iter().map(Vec::len).sum();

        let mut motion = connect(SimulatedLaser::new(), &config);
        let summaries = incise(&mut motion, &config, &blocks).unwrap();

        assert_eq!(summaries[0].holes_burned, total);
        assert_eq!(summaries[0].rows.len(), 5);
        let written = motion.channel().link().written();
        assert!(written.iter().any(|l| l == "$21=0"));
    }

    #[test]
    fn test_device_error_aborts_run() {
        let config = fast_config();
        let blocks = plan_holes(&config).unwrap();
        let laser = SimulatedLaser::new().fail_command("M3", "error:9");
        let mut motion = connect(laser, &config);

        let err = incise(&mut motion, &config, &blocks).unwrap_err();
        assert!(err.is_device_error());
    }

    #[test]
    fn test_motion_config_mapping() {
        let mut config = RunConfig::default();
        config.motion.keepalive_ms = 100;
        config.motion.soft_scale_y = 2.0;
        let motion = motion_config(&config.motion);
        assert_eq!(motion.keepalive_interval, Duration::from_millis(100));
        assert_eq!(motion.soft_scale_y, 2.0);
        assert_eq!(motion.move_speed, 24000);
        assert_eq!(motion.settle_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap(), RunConfig::default());

        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        let mut config = RunConfig::default();
        config.burn.power = 75;
        config.save_to_file(&path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().burn.power, 75);

        assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());
    }
}
