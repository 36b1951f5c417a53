//! Spreadsheet loading: turns the first sheet of an xlsx workbook into a
//! `Dataset` ready for parameterized insertion.
//!
//! Column names are taken verbatim from the first row. Spreadsheet-native
//! cell types map 1:1 to `CellValue` variants and empty cells map to
//! `Null`. Duplicate column names are rejected (see `Dataset::new`).

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::SheetSyncError;
use crate::models::{CellValue, Dataset};
use crate::Result;

/// Loads the first sheet of an xlsx file into a `Dataset`.
///
/// The first row is the header; every following row becomes a data row.
/// Worksheet ranges are ragged, so rows shorter than the header are padded
/// with `Null` and longer rows are truncated to the header width.
///
/// # Errors
/// - `FileNotFound` when `path` does not resolve to a readable file
/// - `Parse` when the container is malformed, the workbook has no sheets,
///   the sheet has no header row, or the header is unusable
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if std::fs::metadata(path).is_err() {
        return Err(SheetSyncError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| SheetSyncError::parse(format!("{}: {e}", path.display())))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .ok_or_else(|| SheetSyncError::parse("workbook has no sheets"))?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SheetSyncError::parse(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| SheetSyncError::parse(format!("sheet '{sheet_name}' has no header row")))?;

    let columns = parse_header(header)?;
    debug!(
        "Loaded header from sheet '{}': {} column(s)",
        sheet_name,
        columns.len()
    );

    let width = columns.len();
    let mut dataset = Dataset::new(columns)?;
    for row in rows {
        dataset.push_row(normalize_row(row, width))?;
    }

    Ok(dataset)
}

/// Extracts column names verbatim from the header row.
fn parse_header(header: &[Data]) -> Result<Vec<String>> {
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Data::String(s) if !s.is_empty() => Ok(s.clone()),
            Data::Empty => Err(SheetSyncError::parse(format!(
                "header cell {} is empty",
                i + 1
            ))),
            other => Ok(other.to_string()),
        })
        .collect()
}

/// Converts one worksheet row into cell values aligned to the header width.
fn normalize_row(row: &[Data], width: usize) -> Vec<CellValue> {
    (0..width)
        .map(|i| row.get(i).map_or(CellValue::Null, cell_to_value))
        .collect()
}

/// Maps a spreadsheet cell onto its `CellValue` variant.
///
/// Excel stores most numbers as floats; integral floats come back as
/// `Integer` so that numeric columns round-trip cleanly. Error cells have
/// no usable value and map to `Null`.
fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                CellValue::Integer(*f as i64)
            } else {
                CellValue::Float(*f)
            }
        }
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or(CellValue::Null, CellValue::DateTime),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(CellValue::DateTime)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_cell_coercion() {
        assert_eq!(cell_to_value(&Data::Empty), CellValue::Null);
        assert_eq!(
            cell_to_value(&Data::String("hi".into())),
            CellValue::Text("hi".into())
        );
        assert_eq!(cell_to_value(&Data::Int(7)), CellValue::Integer(7));
        assert_eq!(cell_to_value(&Data::Bool(true)), CellValue::Boolean(true));
    }

    #[test]
    fn test_integral_float_becomes_integer() {
        assert_eq!(cell_to_value(&Data::Float(42.0)), CellValue::Integer(42));
        assert_eq!(cell_to_value(&Data::Float(-3.0)), CellValue::Integer(-3));
        assert_eq!(cell_to_value(&Data::Float(1.5)), CellValue::Float(1.5));
        assert_eq!(
            cell_to_value(&Data::Float(f64::INFINITY)),
            CellValue::Float(f64::INFINITY)
        );
    }

    #[test]
    fn test_iso_datetime_cell() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(
            cell_to_value(&Data::DateTimeIso("2024-03-01T12:30:00".into())),
            CellValue::DateTime(expected)
        );
    }

    #[test]
    fn test_normalize_row_pads_and_truncates() {
        let row = vec![Data::Int(1), Data::String("a".into())];

        // Shorter than the header: padded with Null
        let padded = normalize_row(&row, 4);
        assert_eq!(padded.len(), 4);
        assert_eq!(padded[2], CellValue::Null);
        assert_eq!(padded[3], CellValue::Null);

        // Longer than the header: truncated
        let truncated = normalize_row(&row, 1);
        assert_eq!(truncated, vec![CellValue::Integer(1)]);
    }

    #[test]
    fn test_parse_header_rejects_empty_cell() {
        let header = vec![Data::String("id".into()), Data::Empty];
        assert!(parse_header(&header).is_err());
    }

    #[test]
    fn test_parse_header_stringifies_non_text_cells() {
        let header = vec![Data::String("id".into()), Data::Int(2024)];
        let columns = parse_header(&header).unwrap();
        assert_eq!(columns, vec!["id".to_string(), "2024".to_string()]);
    }

    #[test]
    fn test_load_dataset_missing_file() {
        let err = load_dataset(Path::new("/nonexistent/data.xlsx")).unwrap_err();
        assert!(matches!(err, SheetSyncError::FileNotFound { .. }));
    }
}
