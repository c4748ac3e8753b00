//! # Inciser CAM tools
//!
//! Turns a description of a tapering timber block into a honeycomb of hole
//! positions, and executes them row by row on a [`LaserHead`].
//!
//! [`LaserHead`]: inciser_core::LaserHead

pub mod burn_scheduler;
pub mod hole_grid;

pub use burn_scheduler::{BurnParameters, BurnScheduler, BurnSummary, Row, RowProgress};
pub use hole_grid::{EdgeSpan, GridDimensions, HoleGridParameters, HolePoint, Segment, TaperedBlock};
