//! Hole layout for tapered blocks
//!
//! Timber is never straight. A block is described by cross-sections
//! ([`Segment`]) at increasing y; between them the left edge and the width
//! change linearly. [`TaperedBlock::holes`] lays an interleaved grid over the
//! block, inset by a margin on all sides: odd rows are shifted by half a
//! column so the holes form a honeycomb.

use inciser_core::{GeometryError, Point};
use serde::{Deserialize, Serialize};

/// A hole position on the work plane
pub type HolePoint = Point;

/// Most holes a single block grid may hold
pub const MAX_HOLES: usize = 1_000_000;

/// One cross-section of a block: left edge `x` and `width` at height `y`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Left edge offset
    pub x: f64,
    /// Position along the block
    pub y: f64,
    /// Block width at `y`
    pub width: f64,
}

impl Segment {
    /// Create a new segment
    pub fn new(x: f64, y: f64, width: f64) -> Self {
        Self { x, y, width }
    }

    fn span(&self) -> EdgeSpan {
        EdgeSpan {
            offset: self.x,
            width: self.width,
        }
    }
}

/// Left edge and width of a block at some y
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSpan {
    /// Left edge offset
    pub offset: f64,
    /// Width
    pub width: f64,
}

/// Row and column counts of a hole grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDimensions {
    /// Column intervals; even rows hold `columns + 1` holes, odd rows `columns`
    pub columns: usize,
    /// Row intervals; the grid has `rows + 1` rows
    pub rows: usize,
    /// Distance between rows
    pub row_spacing: f64,
}

/// Serializable description of one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleGridParameters {
    /// Cross-sections, strictly increasing in y
    pub segments: Vec<Segment>,
    /// Inset kept free of holes on all sides (mm)
    pub margin: f64,
}

impl HoleGridParameters {
    /// Validate and build the block
    pub fn build(&self) -> Result<TaperedBlock, GeometryError> {
        TaperedBlock::new(self.segments.clone(), self.margin)
    }
}

/// A validated piecewise-linear block outline
#[derive(Debug, Clone, PartialEq)]
pub struct TaperedBlock {
    segments: Vec<Segment>,
    margin: f64,
}

impl TaperedBlock {
    /// Build a block from at least two segments with strictly increasing y
    pub fn new(segments: Vec<Segment>, margin: f64) -> Result<Self, GeometryError> {
        if segments.len() < 2 {
            return Err(GeometryError::TooFewSegments {
                count: segments.len(),
            });
        }
        for (index, segment) in segments.iter().enumerate() {
            if !(segment.x.is_finite() && segment.y.is_finite() && segment.width.is_finite()) {
                return Err(GeometryError::NonFiniteSegment { index });
            }
        }
        for (index, pair) in segments.windows(2).enumerate() {
            if pair[1].y <= pair[0].y {
                return Err(GeometryError::UnorderedSegments {
                    index: index + 1,
                    previous: pair[0].y,
                    current: pair[1].y,
                });
            }
        }
        if !margin.is_finite() || margin < 0.0 {
            return Err(GeometryError::InvalidMargin { margin });
        }

        Ok(Self { segments, margin })
    }

    /// The cross-sections
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Inset margin
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// y of the first segment
    pub fn origin_y(&self) -> f64 {
        self.segments[0].y
    }

    /// Distance between the first and last segment
    pub fn height(&self) -> f64 {
        self.segments[self.segments.len() - 1].y - self.segments[0].y
    }

    /// Left edge and width at `y`, clamped outside the described range
    pub fn edge(&self, y: f64) -> EdgeSpan {
        let first = &self.segments[0];
        let last = &self.segments[self.segments.len() - 1];
        if y <= first.y {
            return first.span();
        }
        if y >= last.y {
            return last.span();
        }

        self.segments
            .windows(2)
            .find(|pair| y >= pair[0].y && y <= pair[1].y)
            .map(|pair| {
                let (a, b) = (&pair[0], &pair[1]);
                let f = (y - a.y) / (b.y - a.y);
                EdgeSpan {
                    offset: a.x * (1.0 - f) + b.x * f,
                    width: a.width * (1.0 - f) + b.width * f,
                }
            })
            .unwrap_or_else(|| last.span())
    }

    /// Grid counts for a hole `interval`
    ///
    /// Columns come from the first segment's inset width, rows from the inset
    /// height; both have a floor of two intervals. With `quantize_y` the row
    /// spacing is exactly `interval` and trailing rows that would overflow the
    /// inset height are dropped. Grids above [`MAX_HOLES`] are rejected.
    pub fn dimensions(&self, interval: f64, quantize_y: bool) -> Result<GridDimensions, GeometryError> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(GeometryError::InvalidInterval { interval });
        }

        let inset_width = self.segments[0].width - 2.0 * self.margin;
        let inset_height = self.height() - 2.0 * self.margin;
        let columns = intervals(inset_width, interval);
        let rows = intervals(inset_height, interval);

        // Even rows hold columns + 1 holes, and there are rows + 1 rows.
        let total = (columns + 1.0) * (rows + 1.0);
        if !total.is_finite() || total > MAX_HOLES as f64 {
            return Err(GeometryError::TooManyHoles {
                interval,
                limit: MAX_HOLES,
            });
        }
        let columns = columns as usize;
        let mut rows = rows as usize;

        let row_spacing = if quantize_y {
            while rows > 0 && rows as f64 * interval > inset_height + 1e-9 {
                rows -= 1;
            }
            interval
        } else {
            inset_height / rows as f64
        };

        Ok(GridDimensions {
            columns,
            rows,
            row_spacing,
        })
    }

    /// Hole positions covering the inset block
    ///
    /// The order of the returned points carries no meaning.
    pub fn holes(&self, interval: f64, quantize_y: bool) -> Result<Vec<HolePoint>, GeometryError> {
        let dims = self.dimensions(interval, quantize_y)?;
        let m = self.margin;

        if self.height() < 2.0 * m {
            tracing::warn!("Margin {} leaves no room along a block of height {}", m, self.height());
            return Ok(Vec::new());
        }

        let mut holes = Vec::new();
        for row in 0..=dims.rows {
            let y = self.origin_y() + m + row as f64 * dims.row_spacing;
            let edge = self.edge(y);
            let inset = edge.width - 2.0 * m;
            if inset < 0.0 {
                tracing::debug!("Row at y={} is narrower than the margins, skipped", y);
                continue;
            }

            let dx = inset / dims.columns as f64;
            let odd = row % 2 == 1;
            let (count, shift) = if odd {
                (dims.columns, dx / 2.0)
            } else {
                (dims.columns + 1, 0.0)
            };
            holes.extend(
                (0..count).map(|col| HolePoint::new(edge.offset + m + col as f64 * dx + shift, y)),
            );
        }
        Ok(holes)
    }
}

/// `round(length / interval) + 1`, at least two
fn intervals(length: f64, interval: f64) -> f64 {
    ((length / interval).round() + 1.0).max(2.0)
}
