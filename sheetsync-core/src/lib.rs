//! Core transfer logic for sheetsync.
//!
//! sheetsync moves tabular data between xlsx workbooks and MySQL: a
//! spreadsheet's rows into a table, or one or all tables into workbook
//! sheets. This crate holds everything with design content — row
//! marshalling, schema mapping, parameterized insert batching, and
//! result-set reconstruction — behind three one-shot entry points:
//!
//! - [`transfer::import_file`]
//! - [`transfer::export_one_table`]
//! - [`transfer::export_all_tables`]
//!
//! Every operation is a full, synchronous, whole-table transfer with no
//! resumability: connection parameters are caller-supplied per invocation
//! and the session is closed on every exit path.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod sheet;
pub mod transfer;
pub mod workbook;

// Re-export commonly used types
pub use config::{ConnectionConfig, TransferOptions};
pub use error::{Result, SheetSyncError};
pub use logging::init_logging;
pub use models::{CellValue, Dataset, ExportSummary, TableHandle, TableOutcome};
pub use transfer::{export_all_tables, export_one_table, import_file, TableSource};
