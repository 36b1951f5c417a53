//! Workbook writing: reconstructs spreadsheet sheets from datasets.
//!
//! `WorkbookBuilder` accumulates one sheet per exported table and writes
//! the container once at the end, so per-table failures never corrupt
//! sheets that were already added.

use std::collections::HashSet;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::SheetSyncError;
use crate::models::{CellValue, Dataset};
use crate::Result;

/// xlsx column limit; datasets wider than this cannot be written.
const MAX_COLUMNS: usize = 16_384;

/// Builds an xlsx workbook sheet by sheet.
pub struct WorkbookBuilder {
    workbook: Workbook,
    datetime_format: Format,
    // Lowercased names already attached; xlsx sheet names are
    // case-insensitive
    used_names: HashSet<String>,
}

impl Default for WorkbookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookBuilder {
    /// Creates an empty workbook builder.
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            datetime_format: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
            used_names: HashSet::new(),
        }
    }

    /// Number of sheets added so far.
    pub fn sheet_count(&self) -> usize {
        self.used_names.len()
    }

    /// Writes a dataset as a new sheet: a header row followed by one row
    /// per dataset row.
    ///
    /// The sheet is built standalone and only attached to the workbook on
    /// success, so a failed sheet leaves no half-written orphan behind.
    ///
    /// # Errors
    /// Fails with `SheetWrite` if the name is invalid for the xlsx format,
    /// already used in this workbook (possible after 31-character
    /// truncation), or the dataset exceeds sheet dimensions. Duplicates are
    /// rejected here, per sheet, rather than deduplicated or deferred to
    /// the final container save.
    pub fn add_sheet(&mut self, name: &str, dataset: &Dataset) -> Result<()> {
        let name_key = name.to_lowercase();
        if self.used_names.contains(&name_key) {
            return Err(SheetSyncError::SheetWrite {
                context: format!("sheet name '{name}' is already used in this workbook"),
                source: "duplicate sheet name".into(),
            });
        }

        if dataset.columns().len() > MAX_COLUMNS {
            return Err(SheetSyncError::SheetWrite {
                context: format!(
                    "dataset has {} columns, xlsx allows at most {MAX_COLUMNS}",
                    dataset.columns().len()
                ),
                source: "column limit exceeded".into(),
            });
        }

        let mut worksheet = Worksheet::new();
        worksheet
            .set_name(name)
            .map_err(|e| SheetSyncError::sheet_write_failed(format!("sheet name '{name}'"), e))?;

        for (col, column_name) in dataset.columns().iter().enumerate() {
            worksheet
                .write_string(0, col as u16, column_name)
                .map_err(|e| {
                    SheetSyncError::sheet_write_failed(format!("header of sheet '{name}'"), e)
                })?;
        }

        for (row_idx, row) in dataset.rows().iter().enumerate() {
            let row_num = row_idx as u32 + 1;
            for (col_idx, value) in row.iter().enumerate() {
                self.write_value(&mut worksheet, row_num, col_idx as u16, value)
                    .map_err(|e| {
                        SheetSyncError::sheet_write_failed(
                            format!("row {row_num} of sheet '{name}'"),
                            e,
                        )
                    })?;
            }
        }

        self.workbook.push_worksheet(worksheet);
        self.used_names.insert(name_key);
        Ok(())
    }

    fn write_value(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: &CellValue,
    ) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
        match value {
            CellValue::Null => {} // leave the cell empty
            CellValue::Integer(i) => {
                // xlsx stores numbers as IEEE doubles; magnitudes past
                // 2^53 round to the nearest representable value
                #[allow(clippy::cast_precision_loss)]
                worksheet.write_number(row, col, *i as f64)?;
            }
            CellValue::Float(f) => {
                worksheet.write_number(row, col, *f)?;
            }
            CellValue::Text(s) => {
                worksheet.write_string(row, col, s)?;
            }
            CellValue::Boolean(b) => {
                worksheet.write_boolean(row, col, *b)?;
            }
            CellValue::DateTime(dt) => {
                worksheet.write_datetime_with_format(row, col, dt, &self.datetime_format)?;
            }
        }
        Ok(())
    }

    /// Finalizes and writes the workbook container.
    ///
    /// Called exactly once, after every sheet has been attempted. A builder
    /// with zero sheets still produces a valid workbook file.
    ///
    /// # Errors
    /// Fails with `SheetWrite` if the container cannot be written.
    pub fn save(mut self, path: &Path) -> Result<()> {
        self.workbook
            .save(path)
            .map_err(|e| SheetSyncError::sheet_write_failed(format!("{}", path.display()), e))
    }
}
