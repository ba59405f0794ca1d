//! Flattening of search hits into rows and the tabular result they form.
//!
//! A [`Table`] keeps rows in insertion order and tracks the union of their
//! keys as columns, in the order each key was first seen. Rows lacking a
//! column render as an empty cell.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use log::debug;
use serde_json::{Map, Value};

use crate::clients::{Hit, errors::Result};

/// A flattened hit: column name to JSON value.
pub type Row = Map<String, Value>;

/// Nested sub-records hoisted by [`flatten`], with the prefix their keys get.
pub const PROMOTED_FIELDS: [(&str, &str); 2] =
    [("stats", "stat_"), ("primary_artist", "primary_artist_")];

/// Copy every key of the object at `row[field]` into `row` as `prefix + key`.
///
/// The nested field itself stays in place. A missing or non-object field
/// leaves the row untouched.
pub fn promote(row: &mut Row, field: &str, prefix: &str) {
    let Some(Value::Object(nested)) = row.get(field) else {
        return;
    };
    let promoted: Vec<(String, Value)> = nested
        .iter()
        .map(|(key, value)| (format!("{prefix}{key}"), value.clone()))
        .collect();
    row.extend(promoted);
}

/// Turn one page of hits into a table, hoisting `stats` and `primary_artist`.
pub fn flatten(hits: impl IntoIterator<Item = Hit>) -> Table {
    hits.into_iter()
        .map(|mut row| {
            for (field, prefix) in PROMOTED_FIELDS {
                promote(&mut row, field, prefix);
            }
            row
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    seen: HashSet<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            if self.seen.insert(key.clone()) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Append `other`'s rows below this table's, extending the column union.
    pub fn append(&mut self, other: Table) {
        for column in other.columns {
            if self.seen.insert(column.clone()) {
                self.columns.push(column);
            }
        }
        self.rows.extend(other.rows);
    }

    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        tables.into_iter().fold(Table::new(), |mut acc, table| {
            acc.append(table);
            acc
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        if !self.columns.is_empty() {
            csv.write_record(&self.columns)?;
            for row in &self.rows {
                csv.write_record(self.columns.iter().map(|c| render_cell(row.get(c))))?;
            }
        }
        csv.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_csv(&mut out)?;
        Ok(out)
    }

    pub async fn save_csv(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_csv_bytes()?).await?;
        debug!(
            "Wrote {} rows x {} columns to {path:?}",
            self.len(),
            self.columns.len()
        );
        Ok(())
    }

    /// Read a CSV written by [`Table::write_csv`]. Every cell comes back as a
    /// JSON string, empty cells included.
    pub fn read_csv<R: io::Read>(reader: R) -> Result<Table> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();

        let mut table = Table::new();
        for column in &headers {
            if table.seen.insert(column.clone()) {
                table.columns.push(column.clone());
            }
        }
        for record in csv.records() {
            let record = record?;
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(column, cell)| (column.clone(), Value::String(cell.to_string())))
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }

    pub async fn load_csv(path: &Path) -> Result<Table> {
        let raw = tokio::fs::read(path).await?;
        Self::read_csv(raw.as_slice())
    }
}

impl FromIterator<Row> for Table {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        let mut table = Table::new();
        for row in iter {
            table.push_row(row);
        }
        table
    }
}

// Scalars print plainly, nested values as compact JSON
fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
