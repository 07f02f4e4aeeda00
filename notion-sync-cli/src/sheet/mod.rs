//! Tabular sync source
//!
//! A sheet is a header row plus data rows of cells. Cells keep both their
//! displayed text and, when the source knows it, the formula behind them (an
//! `=IMAGE("...")` cell has no text but still carries a URL).
//!
//! Stores persist every single-cell write immediately so a page id written
//! back after a create survives an interrupted run.

pub mod csv_source;
pub mod xlsx_source;

pub use csv_source::CsvSheet;
pub use xlsx_source::XlsxWorkbook;

use anyhow::{Context, Result, bail};
use std::path::Path;

/// One spreadsheet cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Displayed value as text
    pub value: String,
    /// Formula text including the leading `=`
    pub formula: Option<String>,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            formula: None,
        }
    }

    pub fn formula(formula: impl Into<String>) -> Self {
        Self {
            value: String::new(),
            formula: Some(formula.into()),
        }
    }

    /// Parse a raw text cell. Text files have no computed values, so text
    /// beginning with `=` is kept as the value and also recorded as a formula
    pub fn from_raw(raw: &str) -> Self {
        if raw.starts_with('=') {
            Self {
                value: raw.to_string(),
                formula: Some(raw.to_string()),
            }
        } else {
            Self::text(raw)
        }
    }

    /// Text written back to a text-based file
    pub fn raw(&self) -> &str {
        self.formula.as_deref().unwrap_or(&self.value)
    }
}

/// A header row and its data rows, held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Build from raw text records where the first record is the header row
    pub fn from_records(name: impl Into<String>, records: Vec<Vec<String>>) -> Self {
        let mut records = records.into_iter();
        let headers = records
            .next()
            .map(|h| h.into_iter().map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = records
            .map(|r| r.iter().map(|s| Cell::from_raw(s)).collect())
            .collect();
        Self::new(name, headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows (header excluded)
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows (header excluded)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by its trimmed header
    pub fn column_index(&self, header: &str) -> Option<usize> {
        let header = header.trim();
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Displayed text of a cell, empty when the cell does not exist
    pub fn cell_text(&self, row: usize, column: usize) -> &str {
        self.cell(row, column).map(|c| c.value.as_str()).unwrap_or("")
    }

    /// Sheet row number shown to operators (header is row 1)
    pub fn display_row(row: usize) -> usize {
        row + 2
    }

    /// Set the text of a cell, growing the row as needed
    pub fn set_value(&mut self, row: usize, column: usize, value: &str) -> Result<()> {
        if column >= self.headers.len() {
            bail!("Column {} is outside the header row", column + 1);
        }
        let cells = self
            .rows
            .get_mut(row)
            .with_context(|| format!("Row {} does not exist", Self::display_row(row)))?;
        if cells.len() <= column {
            cells.resize(column + 1, Cell::default());
        }
        cells[column] = Cell::text(value);
        Ok(())
    }

    /// Add a header at the end if it is missing; returns the column index and
    /// whether it was added
    pub fn add_column(&mut self, header: &str) -> (usize, bool) {
        match self.column_index(header) {
            Some(idx) => (idx, false),
            None => {
                self.headers.push(header.trim().to_string());
                (self.headers.len() - 1, true)
            }
        }
    }

    /// All rows as raw text records, header first
    pub fn to_records(&self) -> Vec<Vec<String>> {
        let width = self.headers.len();
        let mut records = Vec::with_capacity(self.rows.len() + 1);
        records.push(self.headers.clone());
        for row in &self.rows {
            let mut record: Vec<String> = row.iter().map(|c| c.raw().to_string()).collect();
            if record.len() < width {
                record.resize(width, String::new());
            }
            records.push(record);
        }
        records
    }
}

/// Read access to a sheet plus persisted single-cell writes
pub trait SheetStore {
    fn sheet(&self) -> &Sheet;

    /// Write `value` into a cell and persist it before returning
    fn write_cell(&mut self, row: usize, column: usize, value: &str) -> Result<()>;

    /// Make sure a column exists, persisting the header if it had to be added
    fn ensure_column(&mut self, header: &str) -> Result<usize>;
}

/// A bare in-memory sheet never persists anything
impl SheetStore for Sheet {
    fn sheet(&self) -> &Sheet {
        self
    }

    fn write_cell(&mut self, row: usize, column: usize, value: &str) -> Result<()> {
        self.set_value(row, column, value)
    }

    fn ensure_column(&mut self, header: &str) -> Result<usize> {
        Ok(self.add_column(header).0)
    }
}

/// Open a CSV or XLSX source based on its extension
pub fn open_source(path: &Path, sheet_name: Option<&str>) -> Result<Box<dyn SheetStore>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => {
            if sheet_name.is_some() {
                log::warn!("--sheet is ignored for CSV sources");
            }
            Ok(Box::new(CsvSheet::open(path)?))
        }
        "xlsx" | "xlsm" => Ok(Box::new(XlsxWorkbook::open(path, sheet_name)?)),
        other => bail!(
            "Unsupported source format '{}' for {} (expected .csv or .xlsx)",
            other,
            path.display()
        ),
    }
}
