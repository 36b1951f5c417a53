//! Transfer operations: single-table import, single-table export, and
//! whole-database export.
//!
//! Each entry point owns the full connect/operate/close lifecycle: the
//! session is opened once, used by one sequential call stack, and closed
//! on every exit path.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{ConnectionConfig, TransferOptions};
use crate::db::MySqlSession;
use crate::models::{Dataset, ExportSummary, TableHandle};
use crate::workbook::WorkbookBuilder;
use crate::{sheet, Result};

/// A source of named tables.
///
/// This is the seam between the export orchestrator and the database: the
/// live implementation materializes each table eagerly, and a streaming
/// row producer could replace it later without changing the orchestrator.
/// Test fixtures implement it in memory.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Lists table names in discovery order.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Reads one table in full.
    async fn fetch_table(&self, table: &TableHandle) -> Result<Dataset>;
}

#[async_trait]
impl TableSource for MySqlSession {
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.list_tables().await
    }

    async fn fetch_table(&self, table: &TableHandle) -> Result<Dataset> {
        self.fetch_table(table).await
    }
}

/// Imports a spreadsheet into one table.
///
/// Loads the file first (nothing is connected if the file is unusable),
/// then inserts all rows in one transaction.
///
/// # Errors
/// Load errors (`FileNotFound`, `Parse`), connection errors, or `Insert`
/// on row failure; the target table is left untouched on failure.
pub async fn import_file(
    config: &ConnectionConfig,
    table_name: &str,
    path: &Path,
    options: &TransferOptions,
) -> Result<u64> {
    let table = TableHandle::new(table_name)?;
    let dataset = sheet::load_dataset(path)?;
    info!(
        "Loaded {} row(s), {} column(s) from {}",
        dataset.row_count(),
        dataset.columns().len(),
        path.display()
    );

    let session = MySqlSession::connect(config).await?;
    let result = session.insert_rows(&table, &dataset, options).await;
    session.close().await;

    if let Ok(rows) = &result {
        info!("Imported {rows} row(s) into '{table}'");
    }
    result
}

/// Exports one table into a single-sheet workbook at `output`.
///
/// # Errors
/// Connection errors, `Query` on fetch failure, or `SheetWrite` if the
/// workbook cannot be written.
pub async fn export_one_table(
    config: &ConnectionConfig,
    table_name: &str,
    output: &Path,
) -> Result<u64> {
    let table = TableHandle::new(table_name)?;

    let session = MySqlSession::connect(config).await?;
    let result = export_single(&session, &table, output).await;
    session.close().await;

    if let Ok(rows) = &result {
        info!("Exported {rows} row(s) from '{table}' to {}", output.display());
    }
    result
}

async fn export_single(session: &MySqlSession, table: &TableHandle, output: &Path) -> Result<u64> {
    let dataset = session.fetch_table(table).await?;
    let rows = dataset.row_count() as u64;

    let mut builder = WorkbookBuilder::new();
    builder.add_sheet(&table.sheet_name(), &dataset)?;
    builder.save(output)?;
    Ok(rows)
}

/// Exports every discovered table into one workbook at `output`.
///
/// # Errors
/// Connection and schema-discovery errors abort the run; per-table export
/// failures do not (see [`export_all_to_workbook`]).
pub async fn export_all_tables(config: &ConnectionConfig, output: &Path) -> Result<ExportSummary> {
    let session = MySqlSession::connect(config).await?;
    let result = export_all_to_workbook(&session, output).await;
    session.close().await;

    if let Ok(summary) = &result {
        info!(
            "Exported {}/{} table(s) to {}",
            summary.exported_count(),
            summary.len(),
            output.display()
        );
    }
    result
}

/// Exports every table of `source` into one workbook, one sheet per table.
///
/// Tables are attempted in discovery order. A failure while querying or
/// writing one table is recorded in the summary and the run continues with
/// the next table; the workbook is finalized only after all tables were
/// attempted. Zero successful tables still produce a valid workbook file.
///
/// # Errors
/// Only discovery (`Schema`) and final container-save (`SheetWrite`)
/// failures abort the run.
pub async fn export_all_to_workbook(
    source: &dyn TableSource,
    output: &Path,
) -> Result<ExportSummary> {
    let tables = source.list_tables().await?;
    info!("Found {} table(s) to export", tables.len());

    let mut builder = WorkbookBuilder::new();
    let mut summary = ExportSummary::new();

    for name in &tables {
        match export_into(source, name, &mut builder).await {
            Ok(rows) => {
                info!("Exported table '{name}' ({rows} row(s))");
                summary.record_exported(name, rows);
            }
            Err(e) => {
                warn!("Skipping table '{name}': {e}");
                summary.record_failed(name, e.to_string());
            }
        }
    }

    builder.save(output)?;
    Ok(summary)
}

async fn export_into(
    source: &dyn TableSource,
    name: &str,
    builder: &mut WorkbookBuilder,
) -> Result<u64> {
    let table = TableHandle::new(name)?;
    let dataset = source.fetch_table(&table).await?;
    let rows = dataset.row_count() as u64;
    builder.add_sheet(&table.sheet_name(), &dataset)?;
    Ok(rows)
}
