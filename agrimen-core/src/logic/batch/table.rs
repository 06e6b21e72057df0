//! In-memory CSV table
//!
//! Cells stay strings; the aligner parses them per column kind.

use std::collections::HashMap;
use std::io::Read;

use crate::logic::features::{FieldLookup, FieldValue};

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build from headers and rows; short rows are padded with empty cells
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        let index = Self::build_index(&headers);
        Self { headers, index, rows }
    }

    fn build_index(headers: &[String]) -> HashMap<String, usize> {
        let mut index = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            // first occurrence wins on duplicate headers
            index.entry(header.clone()).or_insert(i);
        }
        index
    }

    /// Parse CSV with a header row
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches(BOM) } else { h };
                h.trim().to_string()
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        log::debug!("Parsed table: {} columns, {} rows", headers.len(), rows.len());
        Ok(Self::new(headers, rows))
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, csv::Error> {
        Self::from_csv_reader(bytes)
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let c = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(c)).map(String::as_str)
    }

    /// Overwrite `name` if present, otherwise append it
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        let column = match self.column_index(name) {
            Some(c) => c,
            None => {
                self.headers.push(name.to_string());
                self.index.insert(name.to_string(), self.headers.len() - 1);
                self.headers.len() - 1
            }
        };

        let mut values = values.into_iter();
        for row in &mut self.rows {
            if row.len() <= column {
                row.resize(column + 1, String::new());
            }
            row[column] = values.next().unwrap_or_default();
        }
    }

    /// Borrowed per-row lookups
    pub fn row_views(&self) -> Vec<TableRow<'_>> {
        self.rows.iter().map(|cells| TableRow { table: self, cells }).collect()
    }
}

/// One table row, looked up by header name
#[derive(Debug, Clone, Copy)]
pub struct TableRow<'a> {
    table: &'a Table,
    cells: &'a [String],
}

impl FieldLookup for TableRow<'_> {
    fn lookup(&self, column: &str) -> Option<FieldValue<'_>> {
        let c = self.table.column_index(column)?;
        self.cells.get(c).map(|s| FieldValue::Text(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_bom_and_padding() {
        let csv = "\u{feff}N, P ,K\n90,42,43\n1,2,3\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.headers(), &["N", "P", "K"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "P"), Some("42"));
        assert_eq!(table.cell(1, "K"), Some("3"));
        assert_eq!(table.cell(2, "K"), None);
    }

    #[test]
    fn test_ragged_row_is_error() {
        assert!(Table::from_csv_bytes(b"a,b\n1,2,3\n").is_err());
    }

    #[test]
    fn test_set_column_append_and_overwrite() {
        let mut table = Table::new(
            vec!["Crop".to_string(), "Area".to_string()],
            vec![vec!["Rice".to_string(), "10".to_string()], vec!["Wheat".to_string()]],
        );
        table.set_column("Predicted_Yield", vec!["1.00".to_string(), "2.00".to_string()]);
        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.cell(1, "Area"), Some(""));
        assert_eq!(table.cell(1, "Predicted_Yield"), Some("2.00"));

        table.set_column("Predicted_Yield", vec!["3.00".to_string(), "4.00".to_string()]);
        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.cell(0, "Predicted_Yield"), Some("3.00"));
    }

    #[test]
    fn test_csv_output_quotes_commas() {
        let table = Table::new(
            vec!["Market".to_string()],
            vec![vec!["Cuttack, Chhatra Bazar".to_string()]],
        );
        let out = String::from_utf8(table.to_csv_bytes().unwrap()).unwrap();
        assert_eq!(out, "Market\n\"Cuttack, Chhatra Bazar\"\n");
    }

    #[test]
    fn test_row_lookup() {
        let table = Table::from_csv_bytes(b"Crop,Area\nRice,10\n").unwrap();
        let rows = table.row_views();
        assert_eq!(rows[0].lookup("Crop"), Some(FieldValue::Text("Rice")));
        assert_eq!(rows[0].lookup("State"), None);
    }
}
