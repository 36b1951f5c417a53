//! Table-name discovery.

use sqlx::Row;
use tracing::debug;

use super::MySqlSession;
use crate::error::SheetSyncError;
use crate::Result;

impl MySqlSession {
    /// Lists all table names visible in the connected database.
    ///
    /// Names are returned in whatever order the server reports; callers
    /// that need deterministic output sort the result themselves. A
    /// database with no tables yields an empty list, not an error.
    ///
    /// # Errors
    /// Returns `Schema` if the introspection query fails.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SHOW TABLES")
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                SheetSyncError::schema_failed(
                    format!("failed to list tables in '{}'", self.database()),
                    e,
                )
            })?;

        let tables = rows
            .iter()
            .map(|row| {
                row.try_get::<String, _>(0).map_err(|e| {
                    SheetSyncError::schema_failed("unreadable table name in SHOW TABLES result", e)
                })
            })
            .collect::<Result<Vec<String>>>()?;

        debug!(
            "Discovered {} table(s) in '{}'",
            tables.len(),
            self.database()
        );
        Ok(tables)
    }
}
