//! Model cache service: one slot for the fraud model, backed by a single
//! JSON artifact on disk.
//!
//! All access goes through a mutex, so callers racing on first use
//! serialize around training and only one model is fitted. Writes go to a
//! temp file that is then renamed over the artifact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use budgetwatch_core::PreparedTransaction;

use super::{ForestParams, FraudModel, ModelError};

/// File name of the artifact inside the data directory
pub const DEFAULT_MODEL_FILE: &str = "budget_model.json";

/// Result of reading the artifact
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(Arc<FraudModel>),
    /// No artifact on disk yet
    Absent,
    /// The artifact exists but cannot be used; carries the reason
    Corrupt(String),
}

type Slot = Option<Arc<FraudModel>>;

#[derive(Debug)]
pub struct ModelCache {
    path: PathBuf,
    params: ForestParams,
    slot: Mutex<Slot>,
}

impl ModelCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            params: ForestParams::default(),
            slot: Mutex::new(None),
        }
    }

    /// Override the training parameters used on a cache miss
    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached model, reading the artifact on first use.
    /// Only a missing file maps to `Absent`; other I/O errors propagate.
    pub fn load(&self) -> Result<LoadOutcome, ModelError> {
        let mut slot = self.lock()?;
        if let Some(model) = slot.as_ref() {
            return Ok(LoadOutcome::Loaded(Arc::clone(model)));
        }
        let outcome = self.read_artifact()?;
        if let LoadOutcome::Loaded(model) = &outcome {
            *slot = Some(Arc::clone(model));
        }
        Ok(outcome)
    }

    /// Fit a fresh model on `rows`, persist it and make it the cached one.
    pub fn train_and_store(&self, rows: &[PreparedTransaction]) -> Result<Arc<FraudModel>, ModelError> {
        let mut slot = self.lock()?;
        self.train_locked(&mut slot, rows)
    }

    /// Cached or stored model if usable, otherwise train on `rows`.
    pub fn load_or_train(&self, rows: &[PreparedTransaction]) -> Result<Arc<FraudModel>, ModelError> {
        let mut slot = self.lock()?;
        if let Some(model) = slot.as_ref() {
            log::debug!("fraud model cache hit");
            return Ok(Arc::clone(model));
        }

        match self.read_artifact()? {
            LoadOutcome::Loaded(model) => {
                *slot = Some(Arc::clone(&model));
                Ok(model)
            }
            LoadOutcome::Absent => {
                log::info!("no fraud model at {}, training on {} rows", self.path.display(), rows.len());
                self.train_locked(&mut slot, rows)
            }
            LoadOutcome::Corrupt(reason) => {
                log::warn!("discarding fraud model at {}: {reason}", self.path.display());
                self.train_locked(&mut slot, rows)
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slot>, ModelError> {
        self.slot.lock().map_err(|_| ModelError::LockPoisoned)
    }

    fn train_locked(&self, slot: &mut Slot, rows: &[PreparedTransaction]) -> Result<Arc<FraudModel>, ModelError> {
        let model = Arc::new(FraudModel::train(rows, self.params)?);
        self.persist(&model)?;
        log::info!("trained fraud model, saved to {}", self.path.display());
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    fn read_artifact(&self) -> Result<LoadOutcome, ModelError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LoadOutcome::Absent),
            Err(e) => return Err(self.io_error(e)),
        };

        let model: FraudModel = match serde_json::from_slice(&bytes) {
            Ok(model) => model,
            Err(e) => return Ok(LoadOutcome::Corrupt(e.to_string())),
        };
        if !model.matches_schema() {
            return Ok(LoadOutcome::Corrupt(format!(
                "trained on features {:?}",
                model.features
            )));
        }
        if let Err(e) = model.forest.validate() {
            return Ok(LoadOutcome::Corrupt(e.to_string()));
        }

        log::debug!("loaded fraud model from {}", self.path.display());
        Ok(LoadOutcome::Loaded(Arc::new(model)))
    }

    fn persist(&self, model: &FraudModel) -> Result<(), ModelError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_vec(model)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> ModelError {
        ModelError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
