//! In-memory engraver
//!
//! [`SimulatedLaser`] answers like the xTool firmware: every non-empty line is
//! acknowledged with `ok`, `?` gets a `<MPos:...>` report, `$$` dumps the
//! settings, and relative `G0`/`G1` words move the simulated head. Faults
//! (device errors, malformed reports, concatenated acknowledgments) can be
//! injected to exercise the fatal paths.

use super::Link;
use inciser_core::{ConnectionError, Point, Result};
use std::collections::{BTreeMap, VecDeque};

/// Simulated xTool engraver link
#[derive(Debug, Default)]
pub struct SimulatedLaser {
    position: Point,
    target: Point,
    lag: usize,
    settle_queries: usize,
    outbox: VecDeque<String>,
    written: Vec<String>,
    parameters: BTreeMap<u32, String>,
    merge_acks: usize,
    merged: usize,
    failures: Vec<(String, String)>,
    malformed_reports: usize,
}

impl SimulatedLaser {
    /// Create an idle simulated engraver at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines already waiting when the link is opened
    pub fn with_startup_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outbox.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Number of `?` queries after a move that still report the old position
    pub fn with_settle_queries(mut self, queries: usize) -> Self {
        self.settle_queries = queries;
        self
    }

    /// Settings reported by `$$`
    pub fn with_parameter(mut self, number: u32, value: impl Into<String>) -> Self {
        self.parameters.insert(number, value.into());
        self
    }

    /// Answer the next command starting with `prefix` with `reply` instead of `ok`
    pub fn fail_command(mut self, prefix: impl Into<String>, reply: impl Into<String>) -> Self {
        self.failures.push((prefix.into(), reply.into()));
        self
    }

    /// Acknowledge the next `count` commands with one concatenated `okok...` line
    pub fn merge_next_acks(mut self, count: usize) -> Self {
        self.merge_acks = count;
        self
    }

    /// Answer the next `?` with a report that does not parse
    pub fn corrupt_next_report(mut self) -> Self {
        self.malformed_reports += 1;
        self
    }

    /// Every non-empty line written to the device, in order
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Current simulated machine position
    pub fn position(&self) -> Point {
        self.position
    }

    /// Queue an arbitrary line as if the device had sent it
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.outbox.push_back(line.into());
    }

    fn acknowledge(&mut self) {
        if self.merge_acks > 0 {
            self.merged += 1;
            if self.merged == self.merge_acks {
                self.outbox.push_back("ok".repeat(self.merged));
                self.merge_acks = 0;
                self.merged = 0;
            }
        } else {
            self.outbox.push_back("ok".to_string());
        }
    }

    fn report_position(&mut self) {
        if self.malformed_reports > 0 {
            self.malformed_reports -= 1;
            self.outbox.push_back("<MPos:garbage>".to_string());
            return;
        }
        if self.lag > 0 {
            self.lag -= 1;
        } else {
            self.position = self.target;
        }
        let reported = self.position;
        self.outbox.push_back(format!(
            "<MPos:{:.3},{:.3},0.000,0.000>",
            reported.x, reported.y
        ));
    }

    fn apply_motion(&mut self, command: &str) {
        let (dx, dy) = axis_words(command);
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.target = Point::new(self.target.x + dx, self.target.y + dy);
        self.lag = self.settle_queries;
    }

    fn handle(&mut self, command: &str) {
        if let Some(index) = self
            .failures
            .iter()
            .position(|(prefix, _)| command.starts_with(prefix.as_str()))
        {
            let (_, reply) = self.failures.remove(index);
            self.outbox.push_back(reply);
            return;
        }

        match command {
            "?" => self.report_position(),
            "$$" => {
                let lines: Vec<String> = self
                    .parameters
                    .iter()
                    .map(|(number, value)| format!("${}={}", number, value))
                    .collect();
                self.outbox.extend(lines);
            }
            "$I" => self
                .outbox
                .push_back("[VER:V40.31.008.2005.01 20230703:]".to_string()),
            _ => {
                if matches!(gcode_number(command), Some(0) | Some(1)) {
                    self.apply_motion(command);
                }
            }
        }
        self.acknowledge();
    }
}

/// Number of the leading `G` word, if any
fn gcode_number(command: &str) -> Option<u32> {
    let rest = command.strip_prefix('G')?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Relative X/Y words of a motion command
fn axis_words(command: &str) -> (f64, f64) {
    let mut dx = 0.0;
    let mut dy = 0.0;
    let mut chars = command.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c != 'X' && c != 'Y' {
            continue;
        }
        let mut end = start + 1;
        while let Some(&(i, d)) = chars.peek() {
            if d.is_ascii_digit() || d == '.' || d == '-' {
                end = i + d.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let value = command[start + 1..end].parse::<f64>().unwrap_or(0.0);
        if c == 'X' {
            dx = value;
        } else {
            dy = value;
        }
    }
    (dx, dy)
}

impl Link for SimulatedLaser {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let command = line.trim();
        if command.is_empty() {
            return Ok(());
        }
        self.written.push(command.to_string());
        self.handle(command);
        Ok(())
    }

    fn has_pending(&mut self) -> Result<bool> {
        Ok(!self.outbox.is_empty())
    }

    fn read_line(&mut self) -> Result<String> {
        // A real port would block forever here; the simulator reports it.
        self.outbox
            .pop_front()
            .ok_or_else(|| ConnectionError::Closed.into())
    }

    fn name(&self) -> String {
        "simulator".to_string()
    }
}
