// src/logging.rs
//
// Per-trajectory telemetry sinks.
// - EventSink: trait the generator reports to, once per trajectory
// - NoopSink:  discards all events
// - JsonlSink: writes one JSON line per trajectory

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dataset::Trajectory;

/// Compact summary of one generated trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub index: u64,
    /// Number of positions, including the placeholder.
    pub length: usize,
    /// Steps actually taken (excludes padding).
    pub steps: usize,
    pub terminated_early: bool,
    pub total_reward: f64,
    /// Fraction of LEFT sensor reports.
    pub left_fraction: f64,
}

impl TrajectorySummary {
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        Self {
            index: trajectory.index,
            length: trajectory.len(),
            steps: trajectory.steps,
            terminated_early: trajectory.terminated_early,
            total_reward: trajectory.total_reward(),
            left_fraction: trajectory.left_fraction(),
        }
    }
}

/// Abstract sink for per-trajectory telemetry.
pub trait EventSink {
    fn log_trajectory(&mut self, summary: &TrajectorySummary);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_trajectory(&mut self, _summary: &TrajectorySummary) {}
}

/// Collects summaries in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub summaries: Vec<TrajectorySummary>,
}

impl EventSink for MemorySink {
    fn log_trajectory(&mut self, summary: &TrajectorySummary) {
        self.summaries.push(summary.clone());
    }
}

/// JSONL sink.
///
/// Telemetry never aborts generation: a failed write is reported through
/// `tracing` and the line is dropped.
pub struct JsonlSink<W: Write = BufWriter<File>> {
    writer: W,
    dropped: u64,
}

impl JsonlSink<BufWriter<File>> {
    /// Create a new sink writing to `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, dropped: 0 }
    }

    /// Lines that could not be written.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, summary: &TrajectorySummary) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, summary)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> EventSink for JsonlSink<W> {
    fn log_trajectory(&mut self, summary: &TrajectorySummary) {
        if let Err(err) = self.write_line(summary) {
            self.dropped += 1;
            warn!(index = summary.index, error = %err, "failed to write trajectory summary");
        }
    }
}
