use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use budgetwatch_finance::anomaly::cache::DEFAULT_MODEL_FILE;

pub fn budgetwatch_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".budgetwatch"))
}

pub fn ensure_budgetwatch_home() -> Result<PathBuf> {
    let dir = budgetwatch_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Where uploads are staged while they are processed
pub fn uploads_dir() -> Result<PathBuf> {
    Ok(ensure_budgetwatch_home()?.join("uploads"))
}

pub fn default_model_path() -> Result<PathBuf> {
    Ok(ensure_budgetwatch_home()?.join(DEFAULT_MODEL_FILE))
}
