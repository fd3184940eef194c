//! budgetwatch-ingest: read transaction exports (CSV/XLSX) into untyped tables.

pub mod error;
pub mod parsers;
pub mod types;
pub mod upload;

use std::path::Path;

pub use error::{IngestError, IngestResult};
pub use types::{Cell, Table, TableFormat};
pub use upload::StagedUpload;

/// Read an export, choosing the parser from its extension.
pub fn read_table(path: impl AsRef<Path>) -> IngestResult<Table> {
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;
    read_table_as(path, format)
}

pub fn read_table_as(path: &Path, format: TableFormat) -> IngestResult<Table> {
    match format {
        TableFormat::Csv => parsers::csv_table::read_csv_table(path),
        TableFormat::Xlsx => parsers::xlsx_table::read_xlsx_table(path),
    }
}
