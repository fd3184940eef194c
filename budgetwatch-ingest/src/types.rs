use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported export formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

/// One untyped cell, as read from the export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Native spreadsheet date cell
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Row-oriented table with a header row, fully materialized in memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Index of the first header matching `name`, trimmed and
    /// case-insensitive
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Cell at (`row`, `col`); short rows read as empty
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup_ignores_case_and_padding() {
        let table = Table::new(vec!["Reference".into(), " date ".into(), "AMOUNT".into()]);
        assert_eq!(table.column_index("Date"), Some(1));
        assert_eq!(table.column_index("Amount"), Some(2));
        assert_eq!(table.column_index("Description"), None);
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let mut table = Table::new(vec!["Date".into(), "Description".into()]);
        table.rows.push(vec![Cell::Text("2024-01-01".into())]);
        assert_eq!(table.cell(0, 1), &Cell::Empty);
        assert!(table.cell(0, 1).is_empty());
        assert!(Cell::Text("  ".into()).is_empty());
    }
}
