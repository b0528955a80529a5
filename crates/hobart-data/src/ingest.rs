//! Raw table loading and schema normalization.
//!
//! Loading performs no value transformation: column names are lowercased,
//! required columns are checked, and the frames are handed to the derivers
//! as-is. Column names are case-insensitive on the way in and lowercase
//! everywhere downstream.

use crate::error::{DataError, Result};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Applicant identifier column, shared by every table.
pub const ID_COL: &str = "sk_id_curr";

/// Loan identifier column for previous-application, card, installment,
/// and point-of-sale tables.
pub const LOAN_COL: &str = "sk_id_prev";

/// External (bureau) loan identifier column.
pub const BUREAU_LOAN_COL: &str = "sk_id_bureau";

/// Logical names of the raw source tables, used as file stems.
pub const TABLE_APPLICATION: &str = "application";
/// Credit-bureau loan table.
pub const TABLE_BUREAU: &str = "bureau";
/// Credit-bureau monthly balance-status table.
pub const TABLE_BUREAU_BALANCE: &str = "bureau_balance";
/// Previous in-house application table.
pub const TABLE_PREVIOUS: &str = "previous_application";
/// Revolving-card monthly statement table.
pub const TABLE_CARD: &str = "credit_card_balance";
/// Installment payment schedule table.
pub const TABLE_INSTALLMENT: &str = "installments_payments";
/// Point-of-sale loan monthly status table.
pub const TABLE_POS: &str = "pos_cash_balance";

/// Read a table from disk, dispatching on the file extension.
///
/// Supports Parquet and CSV. Column names are lowercased; values are left
/// untouched.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut df = match ext.as_str() {
        "parquet" => ParquetReader::new(File::open(path)?).finish()?,
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        other => return Err(DataError::UnsupportedFormat(other.to_string())),
    };

    let table = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    normalize_columns(&mut df, &table)?;
    Ok(df)
}

/// Lowercase all column names in place.
///
/// Two raw columns that collapse to the same lowercase name indicate a
/// malformed extract and are rejected rather than silently suffixed.
pub fn normalize_columns(df: &mut DataFrame, table: &str) -> Result<()> {
    let renames: Vec<(String, String)> = df
        .get_column_names()
        .iter()
        .map(|name| (name.to_string(), name.to_lowercase()))
        .collect();

    let mut seen = HashSet::new();
    for (_, lower) in &renames {
        if !seen.insert(lower.clone()) {
            return Err(DataError::DuplicateColumn {
                table: table.to_string(),
                column: lower.clone(),
            });
        }
    }

    for (original, lower) in renames {
        if original != lower {
            df.rename(&original, lower.into())?;
        }
    }
    Ok(())
}

/// Assert that every required column is present.
///
/// A missing required raw column is fatal for the consuming deriver; it
/// must never silently substitute a different column.
pub fn validate_required(df: &DataFrame, table: &str, required: &[&str]) -> Result<()> {
    let names = df.get_column_names();
    for column in required {
        if !names.iter().any(|name| name.as_str() == *column) {
            return Err(DataError::MissingColumn {
                table: table.to_string(),
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

/// Distinct, non-null applicant IDs from a frame, as `i64`.
pub fn unique_ids(df: &DataFrame, column: &str) -> Result<Vec<i64>> {
    let ids = df
        .column(column)?
        .as_materialized_series()
        .unique()?
        .cast(&DataType::Int64)?;
    Ok(ids.i64()?.into_iter().flatten().collect())
}

/// The raw tables of one scoring batch, loaded and normalized.
///
/// The application table is mandatory; every other source is optional and
/// absent sources simply produce no derived columns for their applicants.
#[derive(Debug)]
pub struct SourceBundle {
    /// Application table (one row per applicant).
    pub application: DataFrame,
    /// Credit-bureau loans.
    pub bureau: Option<DataFrame>,
    /// Credit-bureau monthly balance statuses.
    pub bureau_balance: Option<DataFrame>,
    /// Previous in-house applications.
    pub previous: Option<DataFrame>,
    /// Revolving-card monthly statements.
    pub card: Option<DataFrame>,
    /// Installment schedule rows.
    pub installment: Option<DataFrame>,
    /// Point-of-sale monthly statuses.
    pub pos: Option<DataFrame>,
}

impl SourceBundle {
    /// Load a bundle from a directory of `<table>.parquet` / `<table>.csv`
    /// files named after the logical table names.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let application = match find_table(dir, TABLE_APPLICATION) {
            Some(path) => read_table(&path)?,
            None => {
                return Err(DataError::MissingColumn {
                    table: TABLE_APPLICATION.to_string(),
                    column: ID_COL.to_string(),
                });
            }
        };
        validate_required(&application, TABLE_APPLICATION, &[ID_COL])?;

        Ok(Self {
            application,
            bureau: load_optional(dir, TABLE_BUREAU)?,
            bureau_balance: load_optional(dir, TABLE_BUREAU_BALANCE)?,
            previous: load_optional(dir, TABLE_PREVIOUS)?,
            card: load_optional(dir, TABLE_CARD)?,
            installment: load_optional(dir, TABLE_INSTALLMENT)?,
            pos: load_optional(dir, TABLE_POS)?,
        })
    }

    /// Distinct applicant IDs present in the application table.
    pub fn applicant_ids(&self) -> Result<Vec<i64>> {
        unique_ids(&self.application, ID_COL)
    }
}

fn find_table(dir: &Path, stem: &str) -> Option<PathBuf> {
    ["parquet", "csv"]
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.exists())
}

fn load_optional(dir: &Path, stem: &str) -> Result<Option<DataFrame>> {
    match find_table(dir, stem) {
        Some(path) => {
            let df = read_table(&path)?;
            log::debug!("loaded {stem}: {} rows", df.height());
            Ok(Some(df))
        }
        None => {
            log::debug!("source table {stem} not present");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "SK_ID_CURR" => [100i64, 101, 101, 102],
            "AMT_CREDIT" => [1000.0, 2000.0, 2500.0, 3000.0],
        )
        .unwrap()
    }

    #[test]
    fn normalize_lowercases_all_columns() {
        let mut df = frame();
        normalize_columns(&mut df, "application").unwrap();
        assert_eq!(df.get_column_names()[0].as_str(), "sk_id_curr");
        assert_eq!(df.get_column_names()[1].as_str(), "amt_credit");
    }

    #[test]
    fn normalize_rejects_case_colliding_columns() {
        let mut df = df!(
            "sk_id_curr" => [1i64],
            "SK_ID_CURR" => [2i64],
        )
        .unwrap();
        let err = normalize_columns(&mut df, "application").unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn { .. }));
    }

    #[test]
    fn validate_required_names_the_missing_column() {
        let mut df = frame();
        normalize_columns(&mut df, "bureau").unwrap();
        let err = validate_required(&df, "bureau", &["sk_id_curr", "credit_active"]).unwrap_err();
        match err {
            DataError::MissingColumn { table, column } => {
                assert_eq!(table, "bureau");
                assert_eq!(column, "credit_active");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unique_ids_deduplicates() {
        let mut df = frame();
        normalize_columns(&mut df, "application").unwrap();
        let mut ids = unique_ids(&df, ID_COL).unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![100, 101, 102]);
    }
}
