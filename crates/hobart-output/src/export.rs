//! Decision record export.
//!
//! Batches of [`DecisionRecord`]s can be written as CSV, compact JSON, or
//! pretty-printed JSON. Records are flat, so the CSV layout is one row per
//! applicant with a header derived from the record fields.

use hobart_decision::DecisionRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output was not valid UTF-8.
    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Unrecognized format name.
    #[error("unknown export format '{0}', expected csv, json, or json-pretty")]
    UnknownFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values.
    Csv,

    /// Compact JSON array.
    Json,

    /// Pretty-printed JSON array.
    PrettyJson,
}

impl ExportFormat {
    /// File extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::PrettyJson),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Serialize decision records to a string in the given format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn decisions_to_string(
    records: &[DecisionRecord],
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            for record in records {
                wtr.serialize(record)?;
            }
            Ok(String::from_utf8(
                wtr.into_inner().map_err(|e| e.into_error())?,
            )?)
        }
        ExportFormat::Json => Ok(serde_json::to_string(records)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(records)?),
    }
}

/// Write decision records to a file in the given format.
///
/// # Errors
///
/// Returns an error if serialization or file writing fails.
pub fn export_decisions(
    records: &[DecisionRecord],
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    let content = decisions_to_string(records, format)?;
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hobart_decision::ScoreEngine;

    fn sample_records() -> Vec<DecisionRecord> {
        let engine = ScoreEngine::default();
        vec![
            engine.decide(100_001, 0.08).unwrap(),
            engine.decide(100_002, 0.35).unwrap(),
        ]
    }

    #[test]
    fn csv_has_one_header_and_one_row_per_record() {
        let csv = decisions_to_string(&sample_records(), ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.trim_end().lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("applicant_id,pd,score,band"));
        assert!(lines[1].starts_with("100001,0.08,"));
        assert!(lines[1].contains("Approve"));
        assert!(lines[2].contains("Reject"));
    }

    #[test]
    fn json_round_trips() {
        let records = sample_records();
        let json = decisions_to_string(&records, ExportFormat::Json).unwrap();
        let back: Vec<DecisionRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records, back);
    }

    #[test]
    fn pretty_json_is_indented() {
        let json = decisions_to_string(&sample_records(), ExportFormat::PrettyJson).unwrap();
        assert!(json.contains("\n  "));
        assert!(json.contains("\"applicant_id\": 100001"));
    }

    #[test]
    fn export_to_file_writes_the_content() {
        use std::io::Read;

        let records = sample_records();
        let path = std::env::temp_dir().join("hobart_decisions_test.csv");
        export_decisions(&records, &path, ExportFormat::Csv).unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.contains("100001"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn format_parses_from_cli_names() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(
            "json-pretty".parse::<ExportFormat>().unwrap(),
            ExportFormat::PrettyJson
        );
        assert!(matches!(
            "parquet".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat(_))
        ));
    }

    #[test]
    fn format_extensions() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}
