//! Burn scheduling
//!
//! Groups hole points into rows of equal y and walks them in serpentine
//! order (left to right on even rows, right to left on odd rows) so the head
//! never travels back across the block between rows. Each hole is a
//! synchronous move followed by a stationary burn.

use crate::hole_grid::HolePoint;
use inciser_core::{LaserHead, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Parameters for a burn run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnParameters {
    /// Laser power setpoint (1000 = 100%)
    pub power: u32,
    /// Dwell per hole (ms)
    pub duration_ms: u64,
    /// Burn only the first row, for alignment before committing to the block
    pub first_row_only: bool,
}

impl BurnParameters {
    /// Dwell per hole
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for BurnParameters {
    fn default() -> Self {
        Self {
            // 5%, enough to see the pattern without burning through
            power: 50,
            duration_ms: 200,
            first_row_only: true,
        }
    }
}

/// One row of holes in traversal order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Row height
    pub y: f64,
    /// Hole x positions in the order they are burned
    pub xs: Vec<f64>,
}

/// Progress after a finished row
#[derive(Debug, Clone, PartialEq)]
pub struct RowProgress {
    /// Zero-based row index
    pub index: usize,
    /// Rows in this run
    pub total_rows: usize,
    /// Time since the run started
    pub elapsed: Duration,
    /// Time spent on this row
    pub row_duration: Duration,
    /// Mean row time so far times the rows left
    pub eta: Duration,
}

/// Outcome of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurnSummary {
    /// Progress of every executed row
    pub rows: Vec<RowProgress>,
    /// Number of holes burned
    pub holes_burned: usize,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// Orders holes into rows and burns them on a [`LaserHead`]
#[derive(Debug, Clone, Default)]
pub struct BurnScheduler {
    params: BurnParameters,
}

impl BurnScheduler {
    /// Create a scheduler with the given burn parameters
    pub fn new(params: BurnParameters) -> Self {
        Self { params }
    }

    /// Burn parameters
    pub fn params(&self) -> &BurnParameters {
        &self.params
    }

    /// Serpentine row plan for `points`
    ///
    /// Rows are ascending in y; x ascends on even rows and descends on odd
    /// ones. Identical points are burned once.
    pub fn plan(points: &[HolePoint]) -> Vec<Row> {
        let mut sorted = points.to_vec();
        sorted.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

        sorted
            .chunk_by(|a, b| a.y == b.y)
            .enumerate()
            .map(|(index, chunk)| {
                let mut xs: Vec<f64> = chunk.iter().map(|p| p.x).collect();
                xs.dedup();
                if index % 2 == 1 {
                    xs.reverse();
                }
                Row { y: chunk[0].y, xs }
            })
            .collect()
    }

    /// Burn every hole, then return to the start position with the beam off
    ///
    /// The return move is queued, not awaited.
    pub fn run<H: LaserHead + ?Sized>(&self, head: &mut H, points: &[HolePoint]) -> Result<BurnSummary> {
        let mut rows = Self::plan(points);
        if self.params.first_row_only {
            rows.truncate(1);
        }
        let total_rows = rows.len();
        let duration = self.params.duration();

        head.enable_beam()?;
        let start = head.logical_position();
        let started = Instant::now();
        let mut summary = BurnSummary::default();

        for (index, row) in rows.iter().enumerate() {
            let row_started = Instant::now();
            for &x in &row.xs {
                head.move_absolute_synchronous(x, row.y)?;
                head.burn_stationary(duration, Some(self.params.power))?;
                summary.holes_burned += 1;
            }

            let progress = row_progress(index, total_rows, started.elapsed(), row_started.elapsed());
            tracing::info!(
                "Burned row {} / {}, elapsed {:.1}s, row {:.1}s, left ~{:.0}s",
                index + 1,
                total_rows,
                progress.elapsed.as_secs_f64(),
                progress.row_duration.as_secs_f64(),
                progress.eta.as_secs_f64()
            );
            summary.rows.push(progress);
        }

        head.move_absolute(start.x, start.y)?;
        head.disable_beam()?;
        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}

fn row_progress(index: usize, total_rows: usize, elapsed: Duration, row_duration: Duration) -> RowProgress {
    let done = index as u32 + 1;
    let remaining = total_rows.saturating_sub(index + 1) as u32;
    RowProgress {
        index,
        total_rows,
        elapsed,
        row_duration,
        eta: (elapsed / done) * remaining,
    }
}
