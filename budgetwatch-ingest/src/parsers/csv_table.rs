//! Comma-separated exports.
//!
//! The first record is the header row; fields are trimmed, empty fields
//! become [`Cell::Empty`], and rows with no content at all are dropped.

use std::io::Read;
use std::path::Path;

use crate::error::{IngestError, IngestResult};
use crate::types::{Cell, Table};

/// Read a CSV file into a [`Table`].
pub fn read_csv_table(path: impl AsRef<Path>) -> IngestResult<Table> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| IngestError::io(path, e))?;
    read_csv_from(file)
}

/// Read CSV content from any reader into a [`Table`].
pub fn read_csv_from<R: Read>(reader: R) -> IngestResult<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let mut table = Table::new(headers);

    for result in rdr.records() {
        let record = result?;
        let cells: Vec<Cell> = record
            .iter()
            .map(|field| {
                let field = field.trim();
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();

        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        table.rows.push(cells);
    }

    log::debug!(
        "read {} csv rows with {} columns",
        table.len(),
        table.headers.len()
    );
    Ok(table)
}
