//! Result table persistence.
//!
//! Every persist replaces the whole snapshot. The table is first written to
//! a sibling `.tmp` file which is then renamed over the target, so readers
//! see either the previous or the new snapshot.

use crate::error::{FixlabError, Result};
use crate::results::ResultTable;
use crate::types::LabeledFixation;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CSV_COLUMNS: [&str; 15] = [
    "session_label",
    "start",
    "end",
    "startT",
    "endT",
    "dur",
    "xpos",
    "ypos",
    "cutoff",
    "flankdataloss",
    "fracinterped",
    "RMSxy",
    "BCEA",
    "fixRangeX",
    "fixRangeY",
];

/// Receives full copies of the result table at checkpoints and at the end
/// of a run.
pub trait SnapshotSink {
    fn persist(&mut self, table: &ResultTable) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Csv,
    Json,
}

impl SnapshotFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(SnapshotFormat::Csv),
            "json" => Some(SnapshotFormat::Json),
            _ => None,
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            SnapshotFormat::Csv => "csv",
            SnapshotFormat::Json => "json",
        }
    }
}

impl FromStr for SnapshotFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_extension(s)
            .ok_or_else(|| format!("Unknown snapshot format '{}'. Supported: csv, json", s))
    }
}

/// Writes snapshots to one file path
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
    format: SnapshotFormat,
    writes: usize,
}

impl SnapshotWriter {
    pub fn new<P: AsRef<Path>>(path: P, format: SnapshotFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            writes: 0,
        }
    }

    /// Pick the format from the file extension, falling back to CSV
    pub fn for_path<P: AsRef<Path>>(path: P) -> Self {
        let format = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SnapshotFormat::from_extension)
            .unwrap_or_default();
        Self::new(path, format)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    /// Snapshots written so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist_failed(&self, reason: impl ToString) -> FixlabError {
        FixlabError::PersistFailed {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl SnapshotSink for SnapshotWriter {
    fn persist(&mut self, table: &ResultTable) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.persist_failed(e))?;
        }

        let temp_path = self.temp_path();
        let file = File::create(&temp_path).map_err(|e| self.persist_failed(e))?;
        let written = match self.format {
            SnapshotFormat::Csv => write_csv(file, table.rows()),
            SnapshotFormat::Json => write_json(file, table.rows()),
        };
        if let Err(e) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(self.persist_failed(e));
        }

        std::fs::rename(&temp_path, &self.path).map_err(|e| self.persist_failed(e))?;
        self.writes += 1;

        log::debug!(
            "Wrote snapshot of {} fixations from {} sessions to {}",
            table.len(),
            table.sessions(),
            self.path.display()
        );
        Ok(())
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One CSV row per fixation, columns as in [`CSV_COLUMNS`]
pub fn write_csv<W: Write>(writer: W, rows: &[LabeledFixation]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_COLUMNS)?;

    for row in rows {
        let fix = &row.fixation;
        csv_writer.write_record([
            row.session_label.clone(),
            fix.start.to_string(),
            fix.end.to_string(),
            fix.start_time.to_string(),
            fix.end_time.to_string(),
            fix.duration.to_string(),
            fix.x.to_string(),
            fix.y.to_string(),
            opt(fix.cutoff),
            opt(fix.flank_data_loss),
            opt(fix.frac_interped),
            opt(fix.rms_xy),
            opt(fix.bcea),
            opt(fix.range_x),
            opt(fix.range_y),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// JSON array of fixation objects using the detector's field names
pub fn write_json<W: Write>(writer: W, rows: &[LabeledFixation]) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
