//! Persisted history codec (JSON array or fixed-header CSV).
//!
//! # Formats
//!
//! - **JSON**: a pretty-printed array of [`DailyRecord`] objects.
//! - **CSV**: the [`CSV_HEADER`] line followed by one record per line in
//!   header column order. Values are plain dates and integers, so no quoting
//!   or escaping is applied.
//!
//! Decoding also reports how many records the stored file held, which is
//! what the backfill threshold is measured against.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::history::History;
use crate::record::DailyRecord;

/// Header line of the CSV format.
pub const CSV_HEADER: &str =
    "date,stargazers,commits,contributors,traffic_views,traffic_uniques,clones_count,clones_uniques";

const CSV_COLUMNS: usize = 8;

/// Storage format of an insights file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// JSON array.
    Json,
    /// CSV table (the default).
    #[default]
    Csv,
}

impl Format {
    /// File extension, also the canonical name.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl Serialize for Format {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.extension())
    }
}

/// A format name other than `json` or `csv`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The value is not a supported format.
    #[error("unsupported format {0:?}: choose either \"json\" or \"csv\"")]
    Unsupported(String),
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(FormatError::Unsupported(s.to_string())),
        }
    }
}

/// Errors from decoding or encoding a history.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Unknown format name.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// JSON content could not be parsed as an array of records.
    #[error("malformed JSON history: {0}")]
    DecodeJson(#[source] serde_json::Error),

    /// Stored bytes are not UTF-8.
    #[error("history is not valid UTF-8: {0}")]
    DecodeUtf8(#[from] std::str::Utf8Error),

    /// CSV content violates the fixed layout.
    #[error("malformed CSV history at line {line}: {reason}")]
    DecodeCsv {
        /// 1-based line number in the stored file.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Serializing the history failed.
    #[error("failed to encode history: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A decoded history and the number of records the stored file contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The records, with duplicate dates collapsed.
    pub history: History,
    /// Records present in the file (array length or non-header rows).
    pub record_count: usize,
}

/// Decode stored bytes in the given format.
pub fn decode(bytes: &[u8], format: Format) -> CodecResult<Decoded> {
    match format {
        Format::Json => decode_json(bytes),
        Format::Csv => decode_csv(std::str::from_utf8(bytes)?),
    }
}

/// Decode with a format given by name, rejecting unknown names.
pub fn decode_named(bytes: &[u8], format: &str) -> CodecResult<Decoded> {
    decode(bytes, format.parse()?)
}

/// Encode a history as file content.
pub fn encode(history: &History, format: Format) -> CodecResult<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(history.records()).map_err(CodecError::Encode),
        Format::Csv => Ok(encode_csv(history)),
    }
}

fn decode_json(bytes: &[u8]) -> CodecResult<Decoded> {
    let records: Vec<DailyRecord> = serde_json::from_slice(bytes).map_err(CodecError::DecodeJson)?;
    let record_count = records.len();
    Ok(Decoded {
        history: records.into_iter().collect(),
        record_count,
    })
}

fn decode_csv(text: &str) -> CodecResult<Decoded> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let Some((header_line, header)) = lines.next() else {
        return Ok(Decoded {
            history: History::empty(),
            record_count: 0,
        });
    };

    if header != CSV_HEADER {
        return Err(CodecError::DecodeCsv {
            line: header_line,
            reason: format!("expected header {CSV_HEADER:?}, found {header:?}"),
        });
    }

    let records = lines
        .map(|(line, row)| parse_row(row).map_err(|reason| CodecError::DecodeCsv { line, reason }))
        .collect::<CodecResult<Vec<_>>>()?;

    let record_count = records.len();
    Ok(Decoded {
        history: records.into_iter().collect(),
        record_count,
    })
}

fn parse_row(row: &str) -> Result<DailyRecord, String> {
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    if fields.len() != CSV_COLUMNS {
        return Err(format!(
            "expected {CSV_COLUMNS} columns, found {}",
            fields.len()
        ));
    }

    let date = fields[0]
        .parse::<NaiveDate>()
        .map_err(|e| format!("invalid date {:?}: {e}", fields[0]))?;
    let int = |idx: usize| {
        fields[idx]
            .parse::<u64>()
            .map_err(|e| format!("invalid integer {:?}: {e}", fields[idx]))
    };

    Ok(DailyRecord {
        date,
        stargazers: int(1)?,
        commits: int(2)?,
        contributors: int(3)?,
        traffic_views: int(4)?,
        traffic_uniques: int(5)?,
        clones_count: int(6)?,
        clones_uniques: int(7)?,
    })
}

fn encode_csv(history: &History) -> String {
    let mut lines = Vec::with_capacity(history.len() + 1);
    lines.push(CSV_HEADER.to_string());
    lines.extend(history.records().iter().map(|r| {
        format!(
            "{},{},{},{},{},{},{},{}",
            r.date.format("%Y-%m-%d"),
            r.stargazers,
            r.commits,
            r.contributors,
            r.traffic_views,
            r.traffic_uniques,
            r.clones_count,
            r.clones_uniques,
        )
    }));
    lines.join("\n")
}
