use thiserror::Error;

/// Input rejected before any processing happens
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file type. Please upload a CSV or Excel file.")]
    InvalidFileType { name: String },

    #[error("File must contain Date, Description, and Amount columns (missing: {})", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("Budget limit for {category} must be a non-negative number, got {value}")]
    InvalidLimit { category: String, value: f64 },

    #[error("Workbook '{0}' has no worksheets")]
    EmptyWorkbook(String),
}

/// A cell that could not be converted to its column's type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {row}: invalid {column} '{value}': {reason}")]
pub struct ParseError {
    /// 1-based data row, header excluded
    pub row: usize,
    pub column: &'static str,
    pub value: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(
        row: usize,
        column: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            row,
            column,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
