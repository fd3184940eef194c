//! Transient staging of an uploaded export.
//!
//! The export is copied into an uploads directory for processing and the
//! copy is removed when the [`StagedUpload`] guard drops, whichever way the
//! processing ended.

use std::fs;
use std::path::{Path, PathBuf};

use budgetwatch_core::ValidationError;

use crate::error::{IngestError, IngestResult};
use crate::types::{Table, TableFormat};

/// Guard owning a staged copy of an upload
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    format: TableFormat,
}

impl StagedUpload {
    /// Validate `source` and copy it into `uploads_dir` under a fresh
    /// name, so neither the source nor another staged upload is clobbered.
    pub fn stage(source: impl AsRef<Path>, uploads_dir: impl AsRef<Path>) -> IngestResult<Self> {
        let source = source.as_ref();
        let format = TableFormat::from_path(source)?;

        let uploads_dir = uploads_dir.as_ref();
        fs::create_dir_all(uploads_dir).map_err(|e| IngestError::io(uploads_dir, e))?;

        let path = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(format.extension())
            .tempfile_in(uploads_dir)
            .map_err(|e| IngestError::io(uploads_dir, e))?
            .into_temp_path()
            .keep()
            .map_err(|e| IngestError::io(uploads_dir, e.error))?;

        // From here on the guard owns the reserved file.
        let staged = Self { path, format };
        fs::copy(source, &staged.path).map_err(|e| IngestError::io(source, e))?;
        log::debug!("staged {} at {}", source.display(), staged.path.display());
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    /// Parse the staged file
    pub fn read_table(&self) -> IngestResult<Table> {
        crate::read_table_as(&self.path, self.format)
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("could not remove staged upload {}: {e}", self.path.display());
            }
        }
    }
}

impl TableFormat {
    /// Extension, dot included, used for staged copies
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => ".csv",
            TableFormat::Xlsx => ".xlsx",
        }
    }

    /// Pick the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<TableFormat, ValidationError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.trim().is_empty() {
            return Err(ValidationError::NoFileSelected);
        }

        let lower = name.to_lowercase();
        if lower.ends_with(".csv") {
            Ok(TableFormat::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(TableFormat::Xlsx)
        } else {
            Err(ValidationError::InvalidFileType { name })
        }
    }
}
