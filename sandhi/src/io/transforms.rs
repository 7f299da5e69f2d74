//! Pose-prior measurement files.
//!
//! A delimited text file with `header_rows` header lines, then one
//! measurement per row: `skip_columns` label columns followed by
//! `rotx, roty, rotz, dx, dy, dz[, confidence]`. Each frame is covered by a
//! run of `rows_per_frame` consecutive rows which are averaged into a single
//! [`TransformRecord`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::{FrameDescriptor, FrameIndex, TransformRecord};

/// Error type for pose-prior files
#[derive(Debug, thiserror::Error)]
pub enum TransformFileError {
    /// A data row could not be parsed
    #[error("line {line}: {reason}")]
    MalformedInput {
        /// 1-based line number in the file
        line: usize,
        /// What went wrong
        reason: String,
    },

    /// Row count is not a whole number of frames
    #[error("{rows} rows is not a multiple of {rows_per_frame} rows per frame")]
    NonUniformRows {
        /// Data rows read
        rows: usize,
        /// Rows expected per frame
        rows_per_frame: usize,
    },

    /// Fewer records than frames
    #[error("{records} pose records for {frames} frames")]
    FrameCountMismatch {
        /// Aggregated records
        records: usize,
        /// Frames to cover
        frames: usize,
    },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Column separator.
///
/// Configured as a single character (`";"`, `","`, `"\t"`) or the word
/// `"whitespace"` for runs of spaces and tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Delimiter {
    Char(char),
    Whitespace,
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Char(';')
    }
}

impl TryFrom<String> for Delimiter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case("whitespace") {
            return Ok(Delimiter::Whitespace);
        }
        if value == "\\t" || value.eq_ignore_ascii_case("tab") {
            return Ok(Delimiter::Char('\t'));
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Delimiter::Char(c)),
            _ => Err(format!(
                "delimiter must be one character or \"whitespace\", got \"{}\"",
                value
            )),
        }
    }
}

impl From<Delimiter> for String {
    fn from(d: Delimiter) -> Self {
        match d {
            Delimiter::Whitespace => "whitespace".to_string(),
            Delimiter::Char('\t') => "\\t".to_string(),
            Delimiter::Char(c) => c.to_string(),
        }
    }
}

impl Delimiter {
    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Whitespace => line.split_whitespace().collect(),
            Delimiter::Char(c) => line.split(*c).map(str::trim).collect(),
        }
    }
}

/// What to do with a row that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    /// Fail the whole file
    #[default]
    Abort,
    /// Drop the row with a warning
    Skip,
}

/// What to do with trailing rows that do not fill a whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    /// Fail with `NonUniformRows`
    #[default]
    Reject,
    /// Drop the partial group with a warning
    Drop,
}

/// Layout of a pose-prior file.
#[derive(Debug, Clone)]
pub struct TransformFileConfig {
    /// Lines skipped before data.
    /// Default: 1
    pub header_rows: usize,

    /// Leading label columns skipped on every row.
    /// Default: 0
    pub skip_columns: usize,

    /// Default: `;`
    pub delimiter: Delimiter,

    /// Raw rows per frame; `None` derives `rows / frames`.
    pub rows_per_frame: Option<usize>,

    pub on_malformed: MalformedRowPolicy,

    pub remainder: RemainderPolicy,
}

impl Default for TransformFileConfig {
    fn default() -> Self {
        Self {
            header_rows: 1,
            skip_columns: 0,
            delimiter: Delimiter::default(),
            rows_per_frame: None,
            on_malformed: MalformedRowPolicy::default(),
            remainder: RemainderPolicy::default(),
        }
    }
}

/// Pose priors keyed by frame index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PosePriors {
    records: BTreeMap<FrameIndex, TransformRecord>,
}

impl PosePriors {
    pub fn new() -> Self {
        Self::default()
    }

    /// One all-zero, zero-confidence record per frame.
    pub fn zero(frames: &[FrameDescriptor]) -> Self {
        frames
            .iter()
            .map(|f| (f.index, TransformRecord::zero()))
            .collect()
    }

    /// Pair records with frames positionally (record k ↔ frame k).
    ///
    /// `frames` must already be in ascending index order.
    pub fn from_ordered(
        frames: &[FrameDescriptor],
        mut records: Vec<TransformRecord>,
    ) -> Result<Self, TransformFileError> {
        if records.len() < frames.len() {
            return Err(TransformFileError::FrameCountMismatch {
                records: records.len(),
                frames: frames.len(),
            });
        }
        if records.len() > frames.len() {
            log::warn!(
                "{} pose records for {} frames; ignoring the surplus",
                records.len(),
                frames.len()
            );
            records.truncate(frames.len());
        }
        Ok(frames.iter().map(|f| f.index).zip(records).collect())
    }

    pub fn get(&self, index: FrameIndex) -> Option<&TransformRecord> {
        self.records.get(&index)
    }

    pub fn insert(&mut self, index: FrameIndex, record: TransformRecord) {
        self.records.insert(index, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FrameIndex, &TransformRecord)> {
        self.records.iter()
    }

    /// Express every record relative to the lowest-index frame's record.
    pub fn relative_to_first(&self) -> PosePriors {
        let Some(base) = self.records.values().next().copied() else {
            return PosePriors::new();
        };
        self.records
            .iter()
            .map(|(&i, r)| (i, r.relative_to(&base)))
            .collect()
    }
}

impl FromIterator<(FrameIndex, TransformRecord)> for PosePriors {
    fn from_iter<I: IntoIterator<Item = (FrameIndex, TransformRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Parses and aggregates pose-prior files.
#[derive(Debug, Clone, Default)]
pub struct TransformRecordStore {
    config: TransformFileConfig,
}

impl TransformRecordStore {
    pub fn new(config: TransformFileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransformFileConfig {
        &self.config
    }

    fn parse_row(&self, line: &str, line_no: usize) -> Result<(TransformRecord, bool), TransformFileError> {
        let mut tokens = self.config.delimiter.split(line);
        while tokens.last().is_some_and(|t| t.is_empty()) {
            tokens.pop();
        }
        let values = tokens.get(self.config.skip_columns..).unwrap_or(&[]);
        if values.len() < 6 {
            return Err(TransformFileError::MalformedInput {
                line: line_no,
                reason: format!("{} numeric columns, expected at least 6", values.len()),
            });
        }

        let mut numbers = [0.0f32; 7];
        let used = values.len().min(7);
        for (k, token) in values[..used].iter().enumerate() {
            numbers[k] = token.parse().map_err(|_| TransformFileError::MalformedInput {
                line: line_no,
                reason: format!(
                    "column {}: '{}' is not a number",
                    self.config.skip_columns + k + 1,
                    token
                ),
            })?;
        }

        let has_confidence = used == 7;
        let confidence = if has_confidence {
            numbers[6]
        } else {
            TransformRecord::NEUTRAL_CONFIDENCE
        };
        let cols = [
            numbers[0], numbers[1], numbers[2], numbers[3], numbers[4], numbers[5],
        ];
        Ok((TransformRecord::from_columns(cols, confidence), has_confidence))
    }

    /// Parse every data row into a raw record, in file order.
    pub fn parse_rows<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<Vec<TransformRecord>, TransformFileError> {
        let mut rows = Vec::new();
        let mut missing_confidence = 0usize;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            if line_no <= self.config.header_rows || line.trim().is_empty() {
                continue;
            }
            match self.parse_row(&line, line_no) {
                Ok((record, has_confidence)) => {
                    if !has_confidence {
                        missing_confidence += 1;
                    }
                    rows.push(record);
                }
                Err(e) => match self.config.on_malformed {
                    MalformedRowPolicy::Abort => return Err(e),
                    MalformedRowPolicy::Skip => log::warn!("Skipping pose row: {}", e),
                },
            }
        }

        if missing_confidence > 0 {
            log::warn!(
                "{} pose rows have no confidence column; using {}",
                missing_confidence,
                TransformRecord::NEUTRAL_CONFIDENCE
            );
        }
        Ok(rows)
    }

    /// Average consecutive runs of raw rows into one record per frame.
    pub fn aggregate(
        &self,
        mut rows: Vec<TransformRecord>,
        frame_count: usize,
    ) -> Result<Vec<TransformRecord>, TransformFileError> {
        let rows_per_frame = match self.config.rows_per_frame {
            Some(n) => n.max(1),
            None if frame_count == 0 => return Ok(Vec::new()),
            None => rows.len() / frame_count,
        };
        if rows_per_frame == 0 {
            return Err(TransformFileError::FrameCountMismatch {
                records: rows.len(),
                frames: frame_count,
            });
        }

        let remainder = rows.len() % rows_per_frame;
        if remainder != 0 {
            match self.config.remainder {
                RemainderPolicy::Reject => {
                    return Err(TransformFileError::NonUniformRows {
                        rows: rows.len(),
                        rows_per_frame,
                    });
                }
                RemainderPolicy::Drop => {
                    log::warn!(
                        "Dropping {} trailing pose rows ({} per frame)",
                        remainder,
                        rows_per_frame
                    );
                    rows.truncate(rows.len() - remainder);
                }
            }
        }

        Ok(rows
            .chunks_exact(rows_per_frame)
            .filter_map(TransformRecord::mean)
            .collect())
    }

    /// Parse, aggregate and pair with frames.
    pub fn load<R: BufRead>(
        &self,
        reader: R,
        frames: &[FrameDescriptor],
    ) -> Result<PosePriors, TransformFileError> {
        let rows = self.parse_rows(reader)?;
        let raw = rows.len();
        let records = self.aggregate(rows, frames.len())?;
        log::debug!("Pose priors: {} rows -> {} records", raw, records.len());
        PosePriors::from_ordered(frames, records)
    }

    /// Load a pose-prior file from disk.
    pub fn load_file(
        &self,
        path: &Path,
        frames: &[FrameDescriptor],
    ) -> Result<PosePriors, TransformFileError> {
        let file = File::open(path)?;
        self.load(BufReader::new(file), frames)
    }
}
