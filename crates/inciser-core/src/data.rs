//! Shared data model: plane points and machine position reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the work plane (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both axes are within `tolerance` of `other`
    pub fn within(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance && (self.y - other.y).abs() < tolerance
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Machine position as reported by `<MPos:...>`
///
/// The firmware always reports four axes; only X and Y drive the machine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionReport {
    /// Raw axis values in report order
    pub axes: [f64; 4],
}

impl PositionReport {
    /// Create a report from the four parsed axis values
    pub fn new(axes: [f64; 4]) -> Self {
        Self { axes }
    }

    /// X axis
    pub fn x(&self) -> f64 {
        self.axes[0]
    }

    /// Y axis
    pub fn y(&self) -> f64 {
        self.axes[1]
    }

    /// The X/Y pair as a plane point
    pub fn xy(&self) -> Point {
        Point::new(self.x(), self.y())
    }
}
