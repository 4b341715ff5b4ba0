// src/inventory.rs
use crate::batch::RecordResult;
use crate::domain::SourceRecord;
use std::error::Error;
use std::fmt;
use std::path::Path;

/// Result columns appended per provider, in output order.
pub const RESULT_COLUMNS: [&str; 6] = [
    "Autotrader",
    "Autotrader Notes",
    "Autotrader URL",
    "Carsguide",
    "Carsguide Notes",
    "Carsguide URL",
];

#[derive(Debug)]
pub enum InventoryError {
    Io(String),
    Csv(String),
}

impl fmt::Display for InventoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryError::Io(msg) => write!(f, "I/O error: {msg}"),
            InventoryError::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl Error for InventoryError {}

/// The inventory CSV held in memory: every input column is preserved
/// verbatim, and the six result columns are created on first use or
/// overwritten in place, so running the tool over its own output is
/// idempotent.
pub struct InventoryTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl InventoryTable {
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| InventoryError::Io(format!("{}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| InventoryError::Csv(e.to_string()))?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| InventoryError::Csv(e.to_string()))?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(InventoryTable { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Typed view over every row, in input order.
    pub fn records(&self) -> Vec<SourceRecord> {
        self.rows
            .iter()
            .map(|row| {
                SourceRecord::from_fields(|name| {
                    self.column(name)
                        .and_then(|idx| row.get(idx))
                        .map(|cell| cell.trim())
                        .filter(|cell| !cell.is_empty())
                        .map(String::from)
                })
            })
            .collect()
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        match self.column(name) {
            Some(idx) => idx,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        }
    }

    /// Write one result per row into the six result columns. `results` must
    /// be aligned with the table's rows (the batch produces exactly one
    /// result per record, in order).
    pub fn apply_results(&mut self, results: &[RecordResult]) {
        let columns: Vec<usize> = RESULT_COLUMNS
            .iter()
            .map(|name| self.ensure_column(name))
            .collect();
        let width = self.headers.len();

        for (row, result) in self.rows.iter_mut().zip(results) {
            if row.len() < width {
                row.resize(width, String::new());
            }
            let values = [
                result.autotrader.status.as_str().to_string(),
                result.autotrader.notes.clone(),
                result.autotrader.url.clone(),
                result.carsguide.status.as_str().to_string(),
                result.carsguide.notes.clone(),
                result.carsguide.url.clone(),
            ];
            for (idx, value) in columns.iter().zip(values) {
                row[*idx] = value;
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), InventoryError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| InventoryError::Io(format!("{}: {e}", path.display())))?;

        writer
            .write_record(&self.headers)
            .map_err(|e| InventoryError::Csv(e.to_string()))?;

        let width = self.headers.len();
        for row in &self.rows {
            if row.len() < width {
                let mut padded = row.clone();
                padded.resize(width, String::new());
                writer
                    .write_record(&padded)
                    .map_err(|e| InventoryError::Csv(e.to_string()))?;
            } else {
                writer
                    .write_record(row)
                    .map_err(|e| InventoryError::Csv(e.to_string()))?;
            }
        }

        writer
            .flush()
            .map_err(|e| InventoryError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::RowOutcome;
    use crate::domain::MatchStatus;

    fn sample_csv(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("inventory.csv");
        std::fs::write(
            &path,
            "Make,Model,Year,StockNo,Price,KM,Colour\n\
             Toyota,Corolla,2021,AB123,20500,45123,White\n\
             Mazda,CX-5,,CD456,31000,12000,Red\n",
        )
        .unwrap();
        path
    }

    fn sample_results() -> Vec<RecordResult> {
        vec![
            RecordResult {
                autotrader: RowOutcome {
                    status: MatchStatus::Found,
                    notes: String::new(),
                    url: "https://www.autotrader.com.au/cars/1".to_string(),
                },
                carsguide: RowOutcome {
                    status: MatchStatus::Mismatched,
                    notes: "Price: CSV=20500, API=21500".to_string(),
                    url: "https://www.carsguide.com.au/cars/1".to_string(),
                },
            },
            RecordResult {
                autotrader: RowOutcome::not_searched(),
                carsguide: RowOutcome::not_searched(),
            },
        ]
    }

    #[test]
    fn load_builds_typed_records() {
        let dir = tempfile::tempdir().unwrap();
        let table = InventoryTable::load(&sample_csv(dir.path())).unwrap();

        assert_eq!(table.len(), 2);
        let records = table.records();
        assert_eq!(records[0].make.as_deref(), Some("Toyota"));
        assert_eq!(records[0].identity_key().as_deref(), Some("2021AB123"));
        // Blank year: no identity key.
        assert_eq!(records[1].identity_key(), None);
    }

    #[test]
    fn apply_and_save_appends_result_columns_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_csv(dir.path());
        let mut table = InventoryTable::load(&path).unwrap();

        table.apply_results(&sample_results());

        let out = dir.path().join("out.csv");
        table.save(&out).unwrap();

        let saved = InventoryTable::load(&out).unwrap();
        assert_eq!(saved.headers().len(), 7 + 6);
        // Input columns untouched.
        assert!(saved.headers().contains(&"Colour".to_string()));
        assert_eq!(saved.rows[0][6], "White");
        // Result columns populated.
        let status_col = saved.column("Autotrader").unwrap();
        let notes_col = saved.column("Carsguide Notes").unwrap();
        assert_eq!(saved.rows[0][status_col], "Found");
        assert_eq!(saved.rows[0][notes_col], "Price: CSV=20500, API=21500");
        assert_eq!(saved.rows[1][status_col], "Not Searched");
    }

    #[test]
    fn reprocessing_augmented_output_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_csv(dir.path());
        let mut table = InventoryTable::load(&path).unwrap();
        table.apply_results(&sample_results());
        let first_pass = dir.path().join("pass1.csv");
        table.save(&first_pass).unwrap();

        // Feed the augmented file back through with identical results.
        let mut again = InventoryTable::load(&first_pass).unwrap();
        again.apply_results(&sample_results());
        let second_pass = dir.path().join("pass2.csv");
        again.save(&second_pass).unwrap();

        let a = std::fs::read_to_string(&first_pass).unwrap();
        let b = std::fs::read_to_string(&second_pass).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = InventoryTable::load(Path::new("/nonexistent/inventory.csv")).unwrap_err();
        assert!(matches!(err, InventoryError::Io(_)));
    }
}
