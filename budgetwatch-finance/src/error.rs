use budgetwatch_core::{ParseError, ValidationError};
use budgetwatch_ingest::IngestError;
use thiserror::Error;

use crate::anomaly::ModelError;

/// Any failure of a pipeline invocation
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Error in fraud detection: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Ingest(IngestError),

    #[error("invalid amount pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<IngestError> for PipelineError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Validation(v) => PipelineError::Validation(v),
            other => PipelineError::Ingest(other),
        }
    }
}

impl PipelineError {
    /// Short message for the caller. Validation problems are reported as-is,
    /// everything else is prefixed as a processing failure.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation(v) => v.to_string(),
            other => format!("Error processing file: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let e = PipelineError::from(ValidationError::NoFileSelected);
        assert_eq!(e.user_message(), "No file selected");

        let e = PipelineError::from(ModelError::EmptyTrainingSet);
        assert_eq!(
            e.user_message(),
            "Error processing file: Error in fraud detection: cannot train on an empty dataset"
        );
    }

    #[test]
    fn test_ingest_validation_is_lifted() {
        let e = PipelineError::from(IngestError::Validation(ValidationError::NoFileSelected));
        assert!(matches!(e, PipelineError::Validation(_)));
    }
}
