//! Parameterized insert execution.
//!
//! All rows of one call are inserted inside a single transaction, in
//! source order. Any row failure rolls the whole call back; partial
//! success is never committed.

use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::MySql;
use tracing::{debug, warn};

use super::MySqlSession;
use crate::config::TransferOptions;
use crate::error::SheetSyncError;
use crate::models::{quote_identifier, CellValue, Dataset, TableHandle};
use crate::Result;

impl MySqlSession {
    /// Inserts every dataset row into `table`.
    ///
    /// Rows are bound positionally against the dataset's column list and
    /// executed in source order, `options.batch_size` rows per statement.
    /// A zero-row dataset commits nothing and returns 0.
    ///
    /// # Errors
    /// Returns `Insert` carrying the number of rows submitted up to and
    /// including the failing statement; the transaction is rolled back so
    /// the table is left untouched.
    pub async fn insert_rows(
        &self,
        table: &TableHandle,
        dataset: &Dataset,
        options: &TransferOptions,
    ) -> Result<u64> {
        if dataset.is_empty() {
            debug!("No rows to insert into '{table}'");
            return Ok(0);
        }

        let batch = options.batch_size.max(1);
        let batch_sql = build_insert_statement(table, dataset.columns(), batch);

        let mut tx = self.pool().begin().await.map_err(|e| {
            SheetSyncError::connection_failed("failed to begin insert transaction", e)
        })?;

        let mut rows_attempted: u64 = 0;
        for chunk in dataset.rows().chunks(batch) {
            let remainder_sql;
            let sql = if chunk.len() == batch {
                batch_sql.as_str()
            } else {
                remainder_sql = build_insert_statement(table, dataset.columns(), chunk.len());
                remainder_sql.as_str()
            };

            let mut query = sqlx::query(sql);
            for row in chunk {
                for value in row {
                    query = bind_cell(query, value);
                }
            }

            rows_attempted += chunk.len() as u64;
            if let Err(e) = query.execute(&mut *tx).await {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed insert also failed: {rollback_err}");
                }
                return Err(SheetSyncError::Insert {
                    context: format!("into table '{table}'"),
                    rows_attempted,
                    source: Box::new(e),
                });
            }
        }

        tx.commit().await.map_err(|e| SheetSyncError::Insert {
            context: format!("failed to commit insert into '{table}'"),
            rows_attempted,
            source: Box::new(e),
        })?;

        debug!("Inserted {rows_attempted} row(s) into '{table}'");
        Ok(rows_attempted)
    }
}

/// Builds a parameterized INSERT with quoted identifiers and `row_count`
/// positional placeholder groups.
fn build_insert_statement(table: &TableHandle, columns: &[String], row_count: usize) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    let placeholder_group = format!("({})", vec!["?"; columns.len()].join(", "));
    let values = vec![placeholder_group; row_count].join(", ");

    format!(
        "INSERT INTO {} ({column_list}) VALUES {values}",
        table.quoted()
    )
}

/// Binds one cell value as the next positional parameter.
fn bind_cell<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &CellValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        CellValue::Null => query.bind(Option::<String>::None),
        CellValue::Integer(i) => query.bind(*i),
        CellValue::Float(f) => query.bind(*f),
        CellValue::Text(s) => query.bind(s.clone()),
        CellValue::Boolean(b) => query.bind(*b),
        CellValue::DateTime(dt) => query.bind(*dt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> TableHandle {
        TableHandle::new(name).unwrap()
    }

    #[test]
    fn test_build_insert_single_row() {
        let sql = build_insert_statement(
            &table("users"),
            &["id".to_string(), "name".to_string()],
            1,
        );
        assert_eq!(sql, "INSERT INTO `users` (`id`, `name`) VALUES (?, ?)");
    }

    #[test]
    fn test_build_insert_quotes_reserved_words() {
        let sql = build_insert_statement(
            &table("order"),
            &["select".to_string(), "group".to_string()],
            1,
        );
        assert_eq!(sql, "INSERT INTO `order` (`select`, `group`) VALUES (?, ?)");
    }

    #[test]
    fn test_build_insert_multi_row_batch() {
        let sql = build_insert_statement(&table("t"), &["a".to_string(), "b".to_string()], 3);
        assert_eq!(
            sql,
            "INSERT INTO `t` (`a`, `b`) VALUES (?, ?), (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_build_insert_escapes_backticks() {
        let sql = build_insert_statement(&table("odd`table"), &["col`umn".to_string()], 1);
        assert_eq!(sql, "INSERT INTO `odd``table` (`col``umn`) VALUES (?)");
    }
}
