//! MySQL session management and transfer queries.
//!
//! # Module Structure
//! - `schema`: table-name discovery
//! - `insert`: parameterized insert execution with transactional rollback
//! - `query`: full-table fetch into a `Dataset`
//!
//! One `MySqlSession` is opened per operation and closed by the caller on
//! every exit path. There are no retries; a single failed connection
//! attempt is reported with its cause classified.

pub mod insert;
pub mod query;
pub mod schema;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::config::ConnectionConfig;
use crate::error::SheetSyncError;
use crate::Result;

// MySQL server error numbers used for connection-failure classification.
// Kept at u16 to match `MySqlDatabaseError::number`.
const ER_DBACCESS_DENIED_ERROR: u16 = 1044;
const ER_ACCESS_DENIED_ERROR: u16 = 1045;
const ER_BAD_DB_ERROR: u16 = 1049;

/// A live MySQL session scoped to one database.
pub struct MySqlSession {
    pool: MySqlPool,
    database: String,
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSession")
            .field("database", &self.database)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

impl MySqlSession {
    /// Opens a session for the configured database.
    ///
    /// The connection is established eagerly (one probe query), so
    /// credential and missing-database failures are classified here rather
    /// than surfacing later from an arbitrary query.
    ///
    /// # Errors
    /// - `Authentication` when the server rejects the credentials
    /// - `DatabaseNotFound` when the named database does not exist
    /// - `Connection` for any other connection-level failure
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)
            .charset(&config.charset);

        // The whole transfer runs on one sequential call stack, so a single
        // connection is all the pool ever needs.
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| classify_connect_error(e, config))?;

        Ok(Self {
            pool,
            database: config.database.clone(),
        })
    }

    /// Runs a trivial probe query to verify the session is usable.
    ///
    /// # Errors
    /// Returns `Connection` if the probe fails.
    pub async fn ping(&self) -> Result<()> {
        let result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SheetSyncError::connection_failed("connectivity probe failed", e))?;

        if result != 1 {
            return Err(SheetSyncError::configuration(
                "connectivity probe returned an unexpected result",
            ));
        }
        Ok(())
    }

    /// Name of the connected database.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Closes the session gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub(crate) fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// Classifies a connection failure into the reportable categories.
fn classify_connect_error(error: sqlx::Error, config: &ConnectionConfig) -> SheetSyncError {
    let server_errno = match &error {
        sqlx::Error::Database(db_err) => db_err
            .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
            .map(sqlx::mysql::MySqlDatabaseError::number),
        _ => None,
    };

    match server_errno {
        Some(ER_ACCESS_DENIED_ERROR | ER_DBACCESS_DENIED_ERROR) => SheetSyncError::Authentication {
            source: Box::new(error),
        },
        Some(ER_BAD_DB_ERROR) => SheetSyncError::DatabaseNotFound {
            database: config.database.clone(),
            source: Box::new(error),
        },
        _ => SheetSyncError::connection_failed(format!("could not connect to {config}"), error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_numbers_are_driver_width() {
        // `MySqlDatabaseError::number` returns u16; the constants must
        // compare against it without widening.
        fn server_errno(n: u16) -> u16 {
            n
        }
        assert_eq!(server_errno(ER_DBACCESS_DENIED_ERROR), 1044);
        assert_eq!(server_errno(ER_ACCESS_DENIED_ERROR), 1045);
        assert_eq!(server_errno(ER_BAD_DB_ERROR), 1049);
    }

    #[test]
    fn test_classify_non_database_error_as_connection() {
        let config = ConnectionConfig::new("localhost", "root", "app");
        let error = sqlx::Error::PoolTimedOut;

        let classified = classify_connect_error(error, &config);
        assert!(matches!(classified, SheetSyncError::Connection { .. }));
        assert!(classified.to_string().contains("localhost:3306/app"));
    }
}
