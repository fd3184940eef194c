//! Excel workbooks. Only the first worksheet is read; its first row is the
//! header.

use calamine::{Data, DataType, Reader, Xlsx, open_workbook};
use std::path::Path;

use budgetwatch_core::ValidationError;

use crate::error::IngestResult;
use crate::types::{Cell, Table};

/// Read the first worksheet of an `.xlsx` file into a [`Table`].
pub fn read_xlsx_table(path: impl AsRef<Path>) -> IngestResult<Table> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ValidationError::EmptyWorkbook(path.display().to_string()))??;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => Vec::new(),
    };

    let mut table = Table::new(headers);
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(to_cell).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        table.rows.push(cells);
    }

    log::debug!("read {} xlsx rows from {}", table.len(), path.display());
    Ok(table)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.trim().to_string()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(_) => match data.as_datetime() {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::Text(data.to_string()),
        },
        other => Cell::Text(other.to_string()),
    }
}
