//! Inciser Settings Crate
//!
//! Run configuration: where the engraver lives, how the head moves, which
//! blocks to incise and how long to burn each hole.

pub mod config;
pub mod error;

pub use config::{BurnSettings, ConnectionSettings, MotionSettings, RunConfig};
pub use error::{SettingsError, SettingsResult};
