use budgetwatch_core::ValidationError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::XlsxError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl IngestError {
    pub(crate) fn io(path: &std::path::Path, source: io::Error) -> Self {
        IngestError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
