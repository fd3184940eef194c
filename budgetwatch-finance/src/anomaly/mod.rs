//! Unsupervised fraud flagging.
//!
//! Rows are scored by an isolation forest over five numeric features. The
//! model comes from a [`ModelCache`]; when no usable artifact exists it is
//! trained on the batch being scored and persisted for later runs. That
//! coupling makes the flag best-effort: its quality depends on the first
//! batch being representative.

pub mod cache;
pub mod forest;

use budgetwatch_core::{FEATURE_NAMES, PreparedTransaction};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

pub use cache::{LoadOutcome, ModelCache};
pub use forest::{ForestParams, IsolationForest};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model artifact I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("model serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot train on an empty dataset")]
    EmptyTrainingSet,

    #[error("expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("row {row} has a non-finite feature value")]
    NonFiniteFeature { row: usize },

    #[error("malformed forest: {0}")]
    MalformedForest(String),

    #[error("model cache lock poisoned")]
    LockPoisoned,
}

/// The persisted model: the feature schema it was trained on plus the forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudModel {
    pub features: Vec<String>,
    pub forest: IsolationForest,
}

impl FraudModel {
    /// Train on the prepared rows using the current feature schema.
    pub fn train(rows: &[PreparedTransaction], params: ForestParams) -> Result<Self, ModelError> {
        let forest = IsolationForest::fit(&feature_matrix(rows), params)?;
        Ok(Self {
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            forest,
        })
    }

    /// Whether this artifact was trained on the current feature schema
    pub fn matches_schema(&self) -> bool {
        self.features.iter().map(String::as_str).eq(FEATURE_NAMES)
            && self.forest.n_features() == FEATURE_NAMES.len()
    }

    /// Outlier flag per row, in row order
    pub fn predict(&self, rows: &[PreparedTransaction]) -> Result<Vec<bool>, ModelError> {
        self.forest.predict(&feature_matrix(rows))
    }
}

pub fn feature_matrix(rows: &[PreparedTransaction]) -> Vec<Vec<f64>> {
    rows.iter().map(|r| r.feature_vector().to_vec()).collect()
}

/// Label every row as fraud / not fraud, training a model first when the
/// cache has none. Either every row gets a label or an error is returned.
pub fn detect_fraud(cache: &ModelCache, rows: &[PreparedTransaction]) -> Result<Vec<bool>, ModelError> {
    let model = cache.load_or_train(rows)?;
    let flags = model.predict(rows)?;
    log::debug!(
        "scored {} rows, {} flagged",
        flags.len(),
        flags.iter().filter(|f| **f).count()
    );
    Ok(flags)
}
