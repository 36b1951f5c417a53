//! Full-table export queries.
//!
//! A table is materialized eagerly into a `Dataset`; streaming is a
//! deliberate non-feature of the current contract, and the `TableSource`
//! seam in `transfer` is where a lazy row producer would slot in later.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::Row;
use tracing::debug;

use super::MySqlSession;
use crate::error::SheetSyncError;
use crate::models::{CellValue, Dataset, TableHandle};
use crate::Result;

impl MySqlSession {
    /// Fetches all rows of `table` as a dataset.
    ///
    /// Column names and order come from `INFORMATION_SCHEMA` ordinal
    /// positions, which matches the `SELECT *` projection and is available
    /// even when the table is empty.
    ///
    /// # Errors
    /// Returns `Query` on any execution failure, including a nonexistent
    /// table.
    pub async fn fetch_table(&self, table: &TableHandle) -> Result<Dataset> {
        let columns = self.fetch_column_names(table).await?;
        if columns.is_empty() {
            return Err(SheetSyncError::query_failed(
                table.name(),
                "table not found or has no columns",
                sqlx::Error::RowNotFound,
            ));
        }

        let sql = format!("SELECT * FROM {}", table.quoted());
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                SheetSyncError::query_failed(table.name(), "full-table query failed", e)
            })?;

        let width = columns.len();
        let mut dataset = Dataset::new(columns)?;
        for row in &rows {
            dataset.push_row((0..width).map(|i| extract_cell(row, i)).collect())?;
        }

        debug!("Fetched {} row(s) from '{table}'", dataset.row_count());
        Ok(dataset)
    }

    /// Column names in ordinal order for `table`.
    async fn fetch_column_names(&self, table: &TableHandle) -> Result<Vec<String>> {
        // CAST to CHAR avoids VARBINARY results from MySQL 8.0+
        let column_query = r"
            SELECT CAST(COLUMN_NAME AS CHAR) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ?
            AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        ";

        let rows = sqlx::query(column_query)
            .bind(self.database())
            .bind(table.name())
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                SheetSyncError::query_failed(table.name(), "failed to read column metadata", e)
            })?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("COLUMN_NAME").map_err(|e| {
                    SheetSyncError::query_failed(table.name(), "unreadable column name", e)
                })
            })
            .collect()
    }
}

/// Extracts one column of a result row as a `CellValue`.
///
/// Types are tried in order of likelihood; driver types outside the ladder
/// (DECIMAL, BLOB, ...) come back as `Null`. TINYINT(1) decodes as an
/// integer, not a boolean. The signed rung rejects UNSIGNED-flagged
/// columns, so an unsigned rung follows it.
fn extract_cell(row: &MySqlRow, index: usize) -> CellValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or(CellValue::Null, CellValue::Integer);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(index) {
        return v.map_or(CellValue::Null, unsigned_to_cell);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or(CellValue::Null, CellValue::Float);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return v.map_or(CellValue::Null, |f| CellValue::Float(f64::from(f)));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map_or(CellValue::Null, CellValue::Boolean);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(index) {
        return v.map_or(CellValue::Null, CellValue::DateTime);
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
        return v.map_or(CellValue::Null, |dt| CellValue::DateTime(dt.naive_utc()));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(index) {
        return v.map_or(CellValue::Null, |d| {
            CellValue::DateTime(d.and_time(NaiveTime::MIN))
        });
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map_or(CellValue::Null, CellValue::Text);
    }

    // Unsupported driver type
    CellValue::Null
}

/// Maps an unsigned column value into a cell. BIGINT UNSIGNED values past
/// `i64::MAX` cannot be represented as an integer cell and are carried as
/// text instead of being truncated.
fn unsigned_to_cell(value: u64) -> CellValue {
    match i64::try_from(value) {
        Ok(v) => CellValue::Integer(v),
        Err(_) => CellValue::Text(value.to_string()),
    }
}
