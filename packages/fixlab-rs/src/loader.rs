//! Tobii TSV export reader.
//!
//! Only the columns listed in [`REQUIRED_COLUMNS`] are read; everything else
//! in the export is ignored. A missing column or an unparseable cell aborts
//! the load before any session is processed.

use crate::error::{FixlabError, Result};
use crate::types::{EyeSample, GazeSample, RawSample, Validity};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const COL_TIME: &str = "Recording timestamp";
pub const COL_PARTICIPANT: &str = "Participant name";
pub const COL_RECORDING: &str = "Recording name";
pub const COL_LEFT_X: &str = "Gaze point left X";
pub const COL_LEFT_Y: &str = "Gaze point left Y";
pub const COL_LEFT_PUPIL: &str = "Pupil diameter left";
pub const COL_LEFT_VALIDITY: &str = "Validity left";
pub const COL_RIGHT_X: &str = "Gaze point right X";
pub const COL_RIGHT_Y: &str = "Gaze point right Y";
pub const COL_RIGHT_PUPIL: &str = "Pupil diameter right";
pub const COL_RIGHT_VALIDITY: &str = "Validity right";

pub const REQUIRED_COLUMNS: [&str; 11] = [
    COL_TIME,
    COL_PARTICIPANT,
    COL_RECORDING,
    COL_LEFT_X,
    COL_LEFT_Y,
    COL_LEFT_PUPIL,
    COL_LEFT_VALIDITY,
    COL_RIGHT_X,
    COL_RIGHT_Y,
    COL_RIGHT_PUPIL,
    COL_RIGHT_VALIDITY,
];

/// Loaded input table plus the anomalies found while reading it
#[derive(Debug, Clone, Default)]
pub struct LoadedTable {
    pub samples: Vec<RawSample>,
    /// Validity labels that were neither `Valid`/`Invalid` nor a numeric
    /// code, with how often each occurred
    pub unrecognized_validity: BTreeMap<String, usize>,
}

impl LoadedTable {
    pub fn extend(&mut self, other: LoadedTable) {
        self.samples.extend(other.samples);
        for (label, count) in other.unrecognized_validity {
            *self.unrecognized_validity.entry(label).or_insert(0) += count;
        }
    }
}

struct ColumnIndex {
    time: usize,
    participant: usize,
    recording: usize,
    left: EyeColumns,
    right: EyeColumns,
}

struct EyeColumns {
    x: usize,
    y: usize,
    pupil: usize,
    validity: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| FixlabError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            time: find(COL_TIME)?,
            participant: find(COL_PARTICIPANT)?,
            recording: find(COL_RECORDING)?,
            left: EyeColumns {
                x: find(COL_LEFT_X)?,
                y: find(COL_LEFT_Y)?,
                pupil: find(COL_LEFT_PUPIL)?,
                validity: find(COL_LEFT_VALIDITY)?,
            },
            right: EyeColumns {
                x: find(COL_RIGHT_X)?,
                y: find(COL_RIGHT_Y)?,
                pupil: find(COL_RIGHT_PUPIL)?,
                validity: find(COL_RIGHT_VALIDITY)?,
            },
        })
    }
}

/// Read a tab-separated export from disk
pub fn load_tsv<P: AsRef<Path>>(path: P) -> Result<LoadedTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FixlabError::FileNotFound(path.display().to_string()));
    }

    log::info!("Loading gaze samples from {}", path.display());
    let file = File::open(path)?;
    let table = read_tsv(file)?;
    log::info!(
        "Loaded {} samples from {}",
        table.samples.len(),
        path.display()
    );
    Ok(table)
}

/// Read a tab-separated export from any reader
pub fn read_tsv<R: Read>(reader: R) -> Result<LoadedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnIndex::from_headers(reader.headers()?)?;
    let mut table = LoadedTable::default();

    for record in reader.records() {
        let record = record?;
        // Header is line 1
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let sample = parse_record(&record, &columns, line)?;

        for eye in [&sample.sample.left, &sample.sample.right] {
            if let Validity::Unrecognized(label) = &eye.validity {
                *table
                    .unrecognized_validity
                    .entry(label.clone())
                    .or_insert(0) += 1;
            }
        }
        table.samples.push(sample);
    }

    for (label, count) in &table.unrecognized_validity {
        log::warn!(
            "Unrecognized validity label '{}' in {} eye readings; treated as invalid",
            label,
            count
        );
    }

    Ok(table)
}

fn parse_record(record: &csv::StringRecord, columns: &ColumnIndex, line: u64) -> Result<RawSample> {
    let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

    let time_str = cell(columns.time);
    let time = time_str
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
        .ok_or_else(|| FixlabError::MalformedRow {
            line,
            reason: format!("'{}' is not a valid {}", time_str, COL_TIME),
        })?;

    let participant_id = cell(columns.participant).to_string();
    let recording_id = cell(columns.recording).to_string();
    if participant_id.is_empty() || recording_id.is_empty() {
        return Err(FixlabError::MalformedRow {
            line,
            reason: "participant and recording names must not be empty".to_string(),
        });
    }

    let eye = |cols: &EyeColumns, x_name: &str, y_name: &str, pupil_name: &str| -> Result<EyeSample> {
        Ok(EyeSample {
            x: parse_optional(cell(cols.x), x_name, line)?,
            y: parse_optional(cell(cols.y), y_name, line)?,
            pupil: parse_optional(cell(cols.pupil), pupil_name, line)?,
            validity: Validity::parse(cell(cols.validity)),
        })
    };

    Ok(RawSample {
        participant_id,
        recording_id,
        sample: GazeSample {
            time,
            left: eye(&columns.left, COL_LEFT_X, COL_LEFT_Y, COL_LEFT_PUPIL)?,
            right: eye(&columns.right, COL_RIGHT_X, COL_RIGHT_Y, COL_RIGHT_PUPIL)?,
        },
    })
}

/// Empty cells and non-finite values are absent readings
fn parse_optional(value: &str, column: &str, line: u64) -> Result<Option<f64>> {
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(_) => Err(FixlabError::MalformedRow {
            line,
            reason: format!("'{}' is not a number in column '{}'", value, column),
        }),
    }
}
