//! Recording of training metrics in the run directory.
//!
//! [RunRecorder] appends one JSON object per scalar to [METRICS_FILE], each
//! object holding the metric `name`, its `value`, the `step` and the `wall_time`
//! in seconds since the Unix epoch.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bigp_gp::metrics::MetricsSink;
use bigp_gp::GpError;
use log::debug;
use serde::Serialize;

use crate::errors::Result;

/// Name of the metrics file within a run directory
pub const METRICS_FILE: &str = "metrics.jsonl";

#[derive(Serialize)]
struct ScalarEvent<'a> {
    name: &'a str,
    value: f64,
    step: usize,
    wall_time: f64,
}

/// Metrics sink appending one JSON object per scalar to a file
pub struct RunRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    count: usize,
}

impl RunRecorder {
    /// Create (or truncate) the metrics file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = BufWriter::new(File::create(&path)?);
        Ok(RunRecorder {
            path,
            writer,
            count: 0,
        })
    }

    /// Metrics file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of recorded scalars
    pub fn count(&self) -> usize {
        self.count
    }
}

fn sink_error(err: impl std::fmt::Display) -> GpError {
    GpError::MetricsSinkError(err.to_string())
}

impl MetricsSink for RunRecorder {
    fn log_scalar(&mut self, name: &str, value: f64, step: usize) -> bigp_gp::Result<()> {
        debug!("{name} = {value} (step {step})");
        let wall_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let event = ScalarEvent {
            name,
            value,
            step,
            wall_time,
        };
        serde_json::to_writer(&mut self.writer, &event).map_err(sink_error)?;
        self.writer.write_all(b"\n").map_err(sink_error)?;
        // flushed per record so an interrupted run keeps its metrics
        self.writer.flush().map_err(sink_error)?;
        self.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_recorder_writes_json_lines() {
        std::fs::create_dir_all("target/tests/sink").unwrap();
        let mut recorder = RunRecorder::create("target/tests/sink/metrics.jsonl").unwrap();
        recorder.log_scalar("train/loss", 1.5, 0).unwrap();
        recorder.log_scalar("test/rmse", 0.25, 0).unwrap();
        recorder.log_scalar("train/loss", 1.25, 1).unwrap();
        assert_eq!(recorder.count(), 3);

        let content = std::fs::read_to_string(recorder.path()).unwrap();
        let events: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1]["name"], "test/rmse");
        assert_eq!(events[1]["value"], 0.25);
        assert_eq!(events[2]["step"], 1);
        assert!(events[0]["wall_time"].as_f64().unwrap() > 0.);
    }
}
