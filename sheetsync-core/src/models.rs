//! Core data model: cell values, tabular datasets, table handles, and
//! export summaries.
//!
//! A `Dataset` is the interchange type between the spreadsheet side and the
//! database side: column names in source order plus positionally aligned
//! rows. Datasets are ephemeral; one is built per source spreadsheet or per
//! source table and consumed immediately.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::SheetSyncError;

/// Maximum sheet name length imposed by the xlsx format.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// A single typed cell value.
///
/// Spreadsheet-native numeric, text, boolean, and date cell types map 1:1
/// to these variants; empty cells map to `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Empty cell / SQL NULL
    Null,
    /// Integral number
    Integer(i64),
    /// Floating-point number
    Float(f64),
    /// Text
    Text(String),
    /// Boolean
    Boolean(bool),
    /// Date or date-time, without timezone
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// An in-memory table: ordered column names plus positionally aligned rows.
///
/// Invariant: every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Creates an empty dataset with the given column names.
    ///
    /// # Errors
    /// Fails fast on duplicate column names: a duplicated header would
    /// silently mis-map cells to columns, so it is rejected outright.
    pub fn new(columns: Vec<String>) -> crate::Result<Self> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(SheetSyncError::parse(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Appends a row.
    ///
    /// # Errors
    /// Fails if the row length does not match the column count.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> crate::Result<()> {
        if row.len() != self.columns.len() {
            return Err(SheetSyncError::parse(format!(
                "row has {} cell(s), expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in source order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in source order.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True if the dataset holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A validated table name used to build SQL identifiers.
///
/// Table names originate from trusted schema discovery or trusted CLI
/// input; quoting tolerates reserved words and special characters but is
/// not an injection defense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHandle(String);

impl TableHandle {
    /// Creates a table handle.
    ///
    /// # Errors
    /// Fails if the name is empty.
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SheetSyncError::configuration("table name cannot be empty"));
        }
        Ok(Self(name))
    }

    /// The raw table name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The backtick-quoted SQL identifier.
    pub fn quoted(&self) -> String {
        quote_identifier(&self.0)
    }

    /// The sheet name for this table: truncated to the xlsx limit of 31
    /// characters. Truncated names are not deduplicated; a collision is
    /// surfaced by the workbook writer.
    pub fn sheet_name(&self) -> String {
        self.0.chars().take(MAX_SHEET_NAME_LEN).collect()
    }
}

impl std::fmt::Display for TableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quotes an identifier with MySQL backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Outcome of exporting one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    /// Table exported successfully
    Exported {
        /// Number of data rows written to the sheet
        rows: u64,
    },
    /// Table export failed; sibling tables were unaffected
    Failed {
        /// Failure description
        reason: String,
    },
}

/// Per-table outcomes of an export-all run, in discovery order.
///
/// Built incrementally and never partially discarded: one table's failure
/// does not remove prior successes from the summary or from the
/// already-written workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    outcomes: Vec<(String, TableOutcome)>,
}

impl ExportSummary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful table export.
    pub fn record_exported(&mut self, table: impl Into<String>, rows: u64) {
        self.outcomes
            .push((table.into(), TableOutcome::Exported { rows }));
    }

    /// Records a failed table export.
    pub fn record_failed(&mut self, table: impl Into<String>, reason: impl Into<String>) {
        self.outcomes.push((
            table.into(),
            TableOutcome::Failed {
                reason: reason.into(),
            },
        ));
    }

    /// All outcomes in discovery order.
    pub fn outcomes(&self) -> &[(String, TableOutcome)] {
        &self.outcomes
    }

    /// Looks up the outcome for a table.
    pub fn outcome_for(&self, table: &str) -> Option<&TableOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, outcome)| outcome)
    }

    /// Number of tables attempted.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True if no tables were attempted.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of successfully exported tables.
    pub fn exported_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TableOutcome::Exported { .. }))
            .count()
    }

    /// True if any table failed.
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| matches!(o, TableOutcome::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_rejects_duplicate_columns() {
        let result = Dataset::new(vec!["id".to_string(), "name".to_string(), "id".to_string()]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("duplicate column name 'id'"));
    }

    #[test]
    fn test_dataset_row_alignment() {
        let mut dataset = Dataset::new(vec!["id".to_string(), "name".to_string()]).unwrap();
        dataset
            .push_row(vec![CellValue::Integer(1), CellValue::Text("a".into())])
            .unwrap();

        // Wrong arity is rejected
        assert!(dataset.push_row(vec![CellValue::Integer(2)]).is_err());
        assert_eq!(dataset.row_count(), 1);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders"), "`orders`");
        assert_eq!(quote_identifier("select"), "`select`");
        assert_eq!(quote_identifier("weird`name"), "`weird``name`");
    }

    #[test]
    fn test_table_handle_rejects_empty_name() {
        assert!(TableHandle::new("").is_err());
        assert!(TableHandle::new("orders").is_ok());
    }

    #[test]
    fn test_sheet_name_truncation() {
        // 32 characters in, first 31 out
        let name = "a".repeat(32);
        let handle = TableHandle::new(name).unwrap();
        assert_eq!(handle.sheet_name(), "a".repeat(31));

        let short = TableHandle::new("orders").unwrap();
        assert_eq!(short.sheet_name(), "orders");
    }

    #[test]
    fn test_sheet_name_truncation_is_char_aware() {
        let name = "é".repeat(40);
        let handle = TableHandle::new(name).unwrap();
        assert_eq!(handle.sheet_name().chars().count(), 31);
    }

    #[test]
    fn test_export_summary_preserves_order_and_failures() {
        let mut summary = ExportSummary::new();
        summary.record_exported("users", 10);
        summary.record_failed("orders", "query failed");
        summary.record_exported("items", 0);

        assert_eq!(summary.len(), 3);
        assert_eq!(summary.exported_count(), 2);
        assert!(summary.has_failures());
        assert_eq!(
            summary.outcome_for("orders"),
            Some(&TableOutcome::Failed {
                reason: "query failed".to_string()
            })
        );
        // Discovery order preserved
        let names: Vec<_> = summary.outcomes().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["users", "orders", "items"]);
    }
}
