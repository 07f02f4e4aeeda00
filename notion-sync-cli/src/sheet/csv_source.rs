//! CSV-backed sheet store

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

use super::{Sheet, SheetStore};

/// A CSV file loaded into memory and rewritten on every change
#[derive(Debug)]
pub struct CsvSheet {
    path: PathBuf,
    sheet: Sheet,
}

impl CsvSheet {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let mut records = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Failed to read CSV line {} of {}", idx + 1, path.display()))?;
            records.push(record.iter().map(|s| s.to_string()).collect());
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet")
            .to_string();

        log::debug!("Loaded {} CSV records from {}", records.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            sheet: Sheet::from_records(name, records),
        })
    }

    /// Rewrite the whole file through a temporary sibling
    fn persist(&self) -> Result<()> {
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut wtr = WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp)
                .with_context(|| format!("Failed to create CSV file: {}", tmp.display()))?;
            for record in self.sheet.to_records() {
                wtr.write_record(&record)
                    .context("Failed to write CSV record")?;
            }
            wtr.flush().context("Failed to flush CSV writer")?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl SheetStore for CsvSheet {
    fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    fn write_cell(&mut self, row: usize, column: usize, value: &str) -> Result<()> {
        self.sheet.set_value(row, column, value)?;
        self.persist()
    }

    fn ensure_column(&mut self, header: &str) -> Result<usize> {
        let (idx, added) = self.sheet.add_column(header);
        if added {
            log::info!("Added column '{}' to {}", header, self.path.display());
            self.persist()?;
        }
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_csv(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "notion-sync-{}-{}.csv",
            name,
            std::process::id()
        ));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_open_reads_headers_and_rows() {
        let path = temp_csv("open", "Title,STR\nEpisode 1,44.5%\nEpisode 2\n");
        let store = CsvSheet::open(&path).unwrap();

        let sheet = store.sheet();
        assert_eq!(sheet.headers(), &["Title".to_string(), "STR".to_string()]);
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.cell_text(0, 1), "44.5%");
        assert_eq!(sheet.cell_text(1, 1), "");

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_write_cell_persists_immediately() {
        let path = temp_csv("write", "Title,Thumbnail\nA,\"=IMAGE(\"\"https://x.com/a.png\"\")\"\n");
        let mut store = CsvSheet::open(&path).unwrap();

        let id_col = store.ensure_column("Notion Page ID").unwrap();
        store.write_cell(0, id_col, "page-1").unwrap();

        let reopened = CsvSheet::open(&path).unwrap();
        let sheet = reopened.sheet();
        assert_eq!(sheet.column_index("Notion Page ID"), Some(2));
        assert_eq!(sheet.cell_text(0, 2), "page-1");
        assert_eq!(
            sheet.cell(0, 1).unwrap().formula.as_deref(),
            Some("=IMAGE(\"https://x.com/a.png\")")
        );

        fs::remove_file(path).ok();
    }
}
