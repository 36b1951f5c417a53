//! Export-all orchestration against an in-memory table source: per-table
//! failure isolation, empty schemas, and sheet naming.

use std::collections::HashMap;

use async_trait::async_trait;
use calamine::{open_workbook, Reader, Xlsx};
use sheetsync_core::error::SheetSyncError;
use sheetsync_core::models::{CellValue, Dataset, TableHandle, TableOutcome};
use sheetsync_core::transfer::{export_all_to_workbook, TableSource};
use sheetsync_core::Result;

/// In-memory stand-in for a connected database.
struct FixtureSource {
    order: Vec<String>,
    tables: HashMap<String, Dataset>,
    failing: Vec<String>,
}

impl FixtureSource {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            tables: HashMap::new(),
            failing: Vec::new(),
        }
    }

    fn with_table(mut self, name: &str, dataset: Dataset) -> Self {
        self.order.push(name.to_string());
        self.tables.insert(name.to_string(), dataset);
        self
    }

    fn with_failing_table(mut self, name: &str) -> Self {
        self.order.push(name.to_string());
        self.failing.push(name.to_string());
        self
    }
}

#[async_trait]
impl TableSource for FixtureSource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.order.clone())
    }

    async fn fetch_table(&self, table: &TableHandle) -> Result<Dataset> {
        if self.failing.iter().any(|t| t == table.name()) {
            return Err(SheetSyncError::query_failed(
                table.name(),
                "synthetic query failure",
                std::io::Error::other("boom"),
            ));
        }
        self.tables.get(table.name()).cloned().ok_or_else(|| {
            SheetSyncError::query_failed(
                table.name(),
                "no such table",
                std::io::Error::other("missing"),
            )
        })
    }
}

fn two_row_dataset() -> Dataset {
    let mut dataset = Dataset::new(vec!["id".to_string(), "label".to_string()]).unwrap();
    dataset
        .push_row(vec![CellValue::Integer(1), CellValue::Text("one".into())])
        .unwrap();
    dataset
        .push_row(vec![CellValue::Integer(2), CellValue::Text("two".into())])
        .unwrap();
    dataset
}

fn sheet_names(path: &std::path::Path) -> Vec<String> {
    let workbook: Xlsx<_> = open_workbook(path).unwrap();
    workbook.sheet_names().to_vec()
}

#[tokio::test]
async fn failing_table_is_isolated_from_siblings() {
    let source = FixtureSource::new()
        .with_table("alpha", two_row_dataset())
        .with_failing_table("bravo")
        .with_table("charlie", two_row_dataset());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.xlsx");

    let summary = export_all_to_workbook(&source, &path).await.unwrap();

    assert_eq!(summary.len(), 3);
    assert_eq!(summary.exported_count(), 2);
    assert_eq!(
        summary.outcome_for("alpha"),
        Some(&TableOutcome::Exported { rows: 2 })
    );
    assert!(matches!(
        summary.outcome_for("bravo"),
        Some(TableOutcome::Failed { .. })
    ));

    // The workbook holds exactly the two surviving sheets, in order
    assert_eq!(sheet_names(&path), vec!["alpha", "charlie"]);
}

#[tokio::test]
async fn empty_schema_produces_file_and_empty_summary() {
    let source = FixtureSource::new();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.xlsx");

    let summary = export_all_to_workbook(&source, &path).await.unwrap();

    assert!(summary.is_empty());
    assert!(!summary.has_failures());
    assert!(path.exists());
}

#[tokio::test]
async fn long_table_name_is_truncated_to_31_chars() {
    let long_name = "abcdefghijklmnopqrstuvwxyz_01234"; // 32 chars
    let source = FixtureSource::new().with_table(long_name, two_row_dataset());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.xlsx");

    let summary = export_all_to_workbook(&source, &path).await.unwrap();
    assert_eq!(summary.exported_count(), 1);
    // Summary keys keep the full table name; only the sheet is truncated
    assert!(summary.outcome_for(long_name).is_some());

    assert_eq!(sheet_names(&path), vec!["abcdefghijklmnopqrstuvwxyz_0123"]);
}

#[tokio::test]
async fn truncation_collision_fails_one_table_not_the_run() {
    // Both names share the same first 31 characters, so they collide
    // after sheet-name truncation
    let first = "orders_2024_quarterly_breakdown_a"; // 33 chars
    let second = "orders_2024_quarterly_breakdown_b";
    let source = FixtureSource::new()
        .with_table(first, two_row_dataset())
        .with_table(second, two_row_dataset());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collision.xlsx");

    let summary = export_all_to_workbook(&source, &path).await.unwrap();

    assert_eq!(summary.len(), 2);
    assert_eq!(summary.exported_count(), 1);
    assert_eq!(
        summary.outcome_for(first),
        Some(&TableOutcome::Exported { rows: 2 })
    );
    assert!(matches!(
        summary.outcome_for(second),
        Some(TableOutcome::Failed { .. })
    ));

    // The first table's sheet survives under the truncated name
    assert_eq!(sheet_names(&path), vec!["orders_2024_quarterly_breakdown"]);
}

#[tokio::test]
async fn all_tables_failing_still_saves_a_workbook() {
    let source = FixtureSource::new()
        .with_failing_table("alpha")
        .with_failing_table("bravo");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all_failed.xlsx");

    let summary = export_all_to_workbook(&source, &path).await.unwrap();

    assert_eq!(summary.len(), 2);
    assert_eq!(summary.exported_count(), 0);
    assert!(summary.has_failures());
    assert!(path.exists());
}
