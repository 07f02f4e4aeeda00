//! XLSX-backed sheet store
//!
//! Values and formulas of every sheet are read with calamine. Writes rebuild
//! the workbook with rust_xlsxwriter. Cell formatting is not preserved, except
//! that date, date-time and duration cells are written back as serial numbers
//! with a matching number format.

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Format, Formula, Workbook};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{Cell, Sheet, SheetStore};

const SECONDS_PER_DAY: f64 = 86_400.0;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";

#[derive(Debug, Clone, Copy, PartialEq)]
enum SerialKind {
    Date,
    DateTime,
    Duration,
}

impl SerialKind {
    fn of(serial: f64, is_duration: bool) -> Self {
        if is_duration || (0.0..1.0).contains(&serial) {
            SerialKind::Duration
        } else if serial.fract() != 0.0 {
            SerialKind::DateTime
        } else {
            SerialKind::Date
        }
    }
}

/// A date/time cell as loaded, kept so an untouched cell is written back typed
#[derive(Debug, Clone, PartialEq)]
struct SerialCell {
    serial: f64,
    kind: SerialKind,
    /// Text the cell was loaded as
    text: String,
}

/// Date/time cells of one sheet keyed by (data row, column)
type SerialCells = HashMap<(usize, usize), SerialCell>;

/// All sheets of a workbook, one of which is being synced
#[derive(Debug)]
pub struct XlsxWorkbook {
    path: PathBuf,
    sheets: Vec<Sheet>,
    serials: Vec<SerialCells>,
    active: usize,
}

impl XlsxWorkbook {
    /// Load a workbook; `sheet_name` selects the synced sheet (first sheet by default)
    pub fn open(path: &Path, sheet_name: Option<&str>) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

        let names: Vec<String> = workbook.sheet_names().to_vec();
        if names.is_empty() {
            return Err(anyhow!("Workbook has no sheets: {}", path.display()));
        }

        let mut sheets = Vec::with_capacity(names.len());
        let mut serials = Vec::with_capacity(names.len());
        for name in &names {
            let values = workbook
                .worksheet_range(name)
                .with_context(|| format!("Failed to read sheet: {}", name))?;
            let formulas = workbook
                .worksheet_formula(name)
                .with_context(|| format!("Failed to read formulas of sheet: {}", name))?;
            let (sheet, dates) = build_sheet(name, &values, &formulas);
            sheets.push(sheet);
            serials.push(dates);
        }

        let active = match sheet_name {
            Some(wanted) => names
                .iter()
                .position(|n| n == wanted)
                .with_context(|| format!("Sheet '{}' not found in {}", wanted, path.display()))?,
            None => 0,
        };

        log::debug!(
            "Loaded workbook {} ({} sheets), syncing '{}'",
            path.display(),
            sheets.len(),
            names[active]
        );

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
            serials,
            active,
        })
    }

    fn persist(&self) -> Result<()> {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format(DATE_FORMAT);
        let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
        let duration_format = Format::new().set_num_format(DURATION_FORMAT);
        let no_serials = SerialCells::new();

        for (sheet_idx, sheet) in self.sheets.iter().enumerate() {
            let serials = self.serials.get(sheet_idx).unwrap_or(&no_serials);
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            for (col, header) in sheet.headers().iter().enumerate() {
                worksheet.write_string(0, col as u16, header)?;
            }

            for (row_idx, cells) in sheet.rows().iter().enumerate() {
                let row = (row_idx + 1) as u32;
                for (col_idx, cell) in cells.iter().enumerate() {
                    let col = col_idx as u16;
                    if let Some(formula) = &cell.formula {
                        worksheet.write_formula(
                            row,
                            col,
                            Formula::new(formula).set_result(&cell.value),
                        )?;
                    } else if cell.value.is_empty() {
                        continue;
                    } else if let Some(serial) = serials
                        .get(&(row_idx, col_idx))
                        .filter(|s| s.text == cell.value)
                    {
                        let format = match serial.kind {
                            SerialKind::Date => &date_format,
                            SerialKind::DateTime => &datetime_format,
                            SerialKind::Duration => &duration_format,
                        };
                        worksheet.write_number_with_format(row, col, serial.serial, format)?;
                    } else if let Some(number) = as_number(&cell.value) {
                        worksheet.write_number(row, col, number)?;
                    } else {
                        worksheet.write_string(row, col, &cell.value)?;
                    }
                }
            }
        }

        workbook
            .save(&self.path)
            .with_context(|| format!("Failed to save Excel file: {}", self.path.display()))?;
        Ok(())
    }
}

impl SheetStore for XlsxWorkbook {
    fn sheet(&self) -> &Sheet {
        &self.sheets[self.active]
    }

    fn write_cell(&mut self, row: usize, column: usize, value: &str) -> Result<()> {
        self.sheets[self.active].set_value(row, column, value)?;
        self.persist()
    }

    fn ensure_column(&mut self, header: &str) -> Result<usize> {
        let (idx, added) = self.sheets[self.active].add_column(header);
        if added {
            log::info!("Added column '{}' to {}", header, self.path.display());
            self.persist()?;
        }
        Ok(idx)
    }
}

/// Merge the value and formula ranges into a sheet anchored at A1, along with
/// the sheet's date/time cells
fn build_sheet(name: &str, values: &Range<Data>, formulas: &Range<String>) -> (Sheet, SerialCells) {
    let mut grid: Vec<Vec<Cell>> = Vec::new();
    let mut serials = SerialCells::new();

    if let Some((row0, col0)) = values.start() {
        for (r, row) in values.rows().enumerate() {
            for (c, data) in row.iter().enumerate() {
                let text = cell_to_text(data);
                if text.is_empty() {
                    continue;
                }
                let (abs_row, abs_col) = (row0 as usize + r, col0 as usize + c);
                if let (Data::DateTime(dt), Some(data_row)) = (data, abs_row.checked_sub(1)) {
                    let serial = dt.as_f64();
                    serials.insert(
                        (data_row, abs_col),
                        SerialCell {
                            serial,
                            kind: SerialKind::of(serial, dt.is_duration()),
                            text: text.clone(),
                        },
                    );
                }
                grid_cell(&mut grid, abs_row, abs_col).value = text;
            }
        }
    }

    if let Some((row0, col0)) = formulas.start() {
        for (r, row) in formulas.rows().enumerate() {
            for (c, formula) in row.iter().enumerate() {
                if formula.is_empty() {
                    continue;
                }
                let formula = if formula.starts_with('=') {
                    formula.clone()
                } else {
                    format!("={}", formula)
                };
                grid_cell(&mut grid, row0 as usize + r, col0 as usize + c).formula = Some(formula);
            }
        }
    }

    let mut rows = grid.into_iter();
    let headers = rows
        .next()
        .map(|h| h.into_iter().map(|c| c.value.trim().to_string()).collect())
        .unwrap_or_default();

    (Sheet::new(name, headers, rows.collect()), serials)
}

fn grid_cell(grid: &mut Vec<Vec<Cell>>, row: usize, col: usize) -> &mut Cell {
    if grid.len() <= row {
        grid.resize_with(row + 1, Vec::new);
    }
    let cells = &mut grid[row];
    if cells.len() <= col {
        cells.resize(col + 1, Cell::default());
    }
    &mut cells[col]
}

/// Convert an Excel cell to the text a spreadsheet would display
fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Whole numbers print without a trailing ".0"
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => serial_to_text(dt.as_f64(), dt.is_duration()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Render an Excel serial date (1900 system) as `YYYY-MM-DD[ HH:MM:SS]`, or
/// a time-of-day/duration as `H:MM:SS`
fn serial_to_text(serial: f64, is_duration: bool) -> String {
    if SerialKind::of(serial, is_duration) == SerialKind::Duration {
        let total = (serial * SECONDS_PER_DAY).round() as i64;
        return format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60);
    }

    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return serial.to_string();
    };
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * SECONDS_PER_DAY).round() as i64;
    let Some(date) = epoch.checked_add_signed(Duration::days(days)) else {
        return serial.to_string();
    };

    if seconds == 0 {
        date.format("%Y-%m-%d").to_string()
    } else {
        let datetime = date.and_hms_opt(0, 0, 0).map(|d| d + Duration::seconds(seconds));
        match datetime {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Numbers are written back as numbers; text with leading zeros stays text
fn as_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.len() > 1 && trimmed.starts_with('0') && !trimmed.starts_with("0.") {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnRule;
    use crate::sync::images::{is_image_formula, parse_image_formula};
    use crate::sync::normalize::{NormalizedValue, normalize};

    #[test]
    fn test_serial_to_text_date() {
        // 45356 = 2024-03-05
        assert_eq!(serial_to_text(45356.0, false), "2024-03-05");
        assert_eq!(serial_to_text(45356.5, false), "2024-03-05 12:00:00");
    }

    #[test]
    fn test_serial_to_text_time() {
        // 1:02:03 as a fraction of a day
        let serial = 3723.0 / SECONDS_PER_DAY;
        assert_eq!(serial_to_text(serial, false), "1:02:03");
        assert_eq!(serial_to_text(1.5, true), "36:00:00");
    }

    #[test]
    fn test_cell_to_text() {
        assert_eq!(cell_to_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_text(&Data::Float(0.445)), "0.445");
        assert_eq!(cell_to_text(&Data::Bool(true)), "true");
        assert_eq!(cell_to_text(&Data::Empty), "");
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number("42"), Some(42.0));
        assert_eq!(as_number("0.5"), Some(0.5));
        assert_eq!(as_number("007"), None);
        assert_eq!(as_number("abc"), None);
        assert_eq!(as_number("NaN"), None);
    }

    #[test]
    fn test_persist_and_reopen_roundtrip() {
        let path = std::env::temp_dir().join(format!("notion-sync-xlsx-{}.xlsx", std::process::id()));
        let sheet = Sheet::new(
            "Videos",
            vec!["Title".into(), "STR".into(), "Thumbnail".into()],
            vec![vec![
                Cell::text("Episode 1"),
                Cell::text("0.445"),
                Cell::formula("=IMAGE(\"https://x.com/a.png\")"),
            ]],
        );
        let mut workbook = XlsxWorkbook {
            path: path.clone(),
            sheets: vec![sheet],
            serials: vec![SerialCells::new()],
            active: 0,
        };

        let id_col = workbook.ensure_column("Notion Page ID").unwrap();
        workbook.write_cell(0, id_col, "page-1").unwrap();

        let reopened = XlsxWorkbook::open(&path, Some("Videos")).unwrap();
        let sheet = reopened.sheet();
        assert_eq!(sheet.cell_text(0, 0), "Episode 1");
        assert_eq!(sheet.cell_text(0, 1), "0.445");
        assert_eq!(sheet.cell_text(0, id_col), "page-1");
        let formula = sheet.cell(0, 2).unwrap().formula.clone().unwrap();
        assert!(is_image_formula(&formula));
        assert_eq!(parse_image_formula(&formula).as_deref(), Some("https://x.com/a.png"));

        std::fs::remove_file(path).ok();
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("notion-sync-{}-{}.xlsx", label, std::process::id()))
    }

    /// A workbook as Excel itself saves it: IMAGE carries the `_xlfn.` prefix
    /// and a date is a serial number with a date format
    fn write_excel_style_workbook(path: &Path) {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Videos").unwrap();
        worksheet.write_string(0, 0, "Title").unwrap();
        worksheet.write_string(0, 1, "Publish Date").unwrap();
        worksheet.write_string(0, 2, "Thumbnail").unwrap();
        worksheet.write_string(1, 0, "Episode 1").unwrap();
        worksheet
            .write_number_with_format(1, 1, 45356.0, &Format::new().set_num_format("yyyy-mm-dd"))
            .unwrap();
        worksheet
            .write_formula(
                1,
                2,
                Formula::new("=_xlfn.IMAGE(\"https://x.com/a.png\")").set_result("0"),
            )
            .unwrap();
        workbook.save(path).unwrap();
    }

    fn thumbnail_urls(workbook: &XlsxWorkbook) -> NormalizedValue {
        let cell = workbook.sheet().cell(0, 2).cloned().unwrap_or_default();
        normalize(ColumnRule::Image, &cell)
    }

    #[test]
    fn test_prefixed_image_formula_survives_write_back() {
        let path = temp_path("xlfn");
        write_excel_style_workbook(&path);
        let expected = NormalizedValue::Images(vec!["https://x.com/a.png".into()]);

        let mut workbook = XlsxWorkbook::open(&path, None).unwrap();
        assert_eq!(thumbnail_urls(&workbook), expected);

        let id_col = workbook.ensure_column("Notion Page ID").unwrap();
        workbook.write_cell(0, id_col, "page-1").unwrap();

        let reopened = XlsxWorkbook::open(&path, None).unwrap();
        assert_eq!(thumbnail_urls(&reopened), expected);
        assert_eq!(reopened.sheet().cell_text(0, id_col), "page-1");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_date_cells_stay_dates_after_write_back() {
        let path = temp_path("dates");
        write_excel_style_workbook(&path);

        let mut workbook = XlsxWorkbook::open(&path, None).unwrap();
        assert_eq!(workbook.sheet().cell_text(0, 1), "2024-03-05");
        let id_col = workbook.ensure_column("Notion Page ID").unwrap();
        workbook.write_cell(0, id_col, "page-1").unwrap();

        let mut raw: Xlsx<_> = open_workbook(&path).unwrap();
        let range = raw.worksheet_range("Videos").unwrap();
        match range.get_value((1, 1)) {
            Some(Data::DateTime(dt)) => assert_eq!(dt.as_f64(), 45356.0),
            other => panic!("expected a date cell, got {:?}", other),
        }

        let reopened = XlsxWorkbook::open(&path, None).unwrap();
        assert_eq!(reopened.sheet().cell_text(0, 1), "2024-03-05");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_overwritten_date_cell_is_written_as_text() {
        let path = temp_path("date-edit");
        write_excel_style_workbook(&path);

        let mut workbook = XlsxWorkbook::open(&path, None).unwrap();
        workbook.write_cell(0, 1, "soon").unwrap();

        let reopened = XlsxWorkbook::open(&path, None).unwrap();
        assert_eq!(reopened.sheet().cell_text(0, 1), "soon");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_serial_kind() {
        assert_eq!(SerialKind::of(45356.0, false), SerialKind::Date);
        assert_eq!(SerialKind::of(45356.5, false), SerialKind::DateTime);
        assert_eq!(SerialKind::of(0.25, false), SerialKind::Duration);
        assert_eq!(SerialKind::of(1.5, true), SerialKind::Duration);
    }
}
