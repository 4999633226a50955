//! Progress reporting for annealing runs.
//!
//! The annealer emits a [`ProgressRecord`] every `report_interval`
//! iterations and once more when it stops. Reporters only observe; they
//! never influence the run.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Snapshot of a run at an iteration boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub iteration: usize,
    pub length: f64,
    pub temperature: f64,
    pub t_min: f64,
}

impl fmt::Display for ProgressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Iteration: {} Distance: {:.4} T:{:.4} (T_min:{})",
            self.iteration, self.length, self.temperature, self.t_min
        )
    }
}

/// Receives progress records from a run
pub trait ProgressReporter {
    fn report(&mut self, record: &ProgressRecord);

    /// Called once with the terminal record
    fn finish(&mut self, record: &ProgressRecord) {
        self.report(record);
    }
}

/// Discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&mut self, _record: &ProgressRecord) {}
}

/// Forwards records to the `log` facade at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&mut self, record: &ProgressRecord) {
        log::info!("{}", record);
    }
}

/// Prints one line per record to a writer (stdout by default)
pub struct LineReporter<W: Write> {
    out: W,
}

impl LineReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        LineReporter {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> LineReporter<W> {
    pub fn new(out: W) -> Self {
        LineReporter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressReporter for LineReporter<W> {
    fn report(&mut self, record: &ProgressRecord) {
        // A closed pipe must not abort the run
        if let Err(e) = writeln!(self.out, "{}", record) {
            log::warn!("Failed to write progress line: {}", e);
        }
    }
}

/// Keeps the formatted lines in memory
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    pub lines: Vec<String>,
}

impl ProgressReporter for CollectingReporter {
    fn report(&mut self, record: &ProgressRecord) {
        self.lines.push(record.to_string());
    }
}

/// Terminal progress bar sized to the scheduled number of iterations
pub struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    pub fn new(total_iterations: usize) -> Self {
        let bar = ProgressBar::new(total_iterations as u64);
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        ProgressBarReporter { bar }
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn report(&mut self, record: &ProgressRecord) {
        self.bar.set_position(record.iteration as u64);
        self.bar.set_message(format!(
            "distance {:.4} T {:.4}",
            record.length, record.temperature
        ));
    }

    fn finish(&mut self, record: &ProgressRecord) {
        self.report(record);
        self.bar.finish_with_message(format!("distance {:.4}", record.length));
    }
}
