//! budgetwatch-finance: preprocessing, keyword categorization, isolation-forest
//! fraud flagging and budget analysis over transaction exports

pub mod anomaly;
pub mod budget;
pub mod category_rules;
pub mod error;
pub mod pipeline;
pub mod preprocess;

pub use anomaly::{FraudModel, LoadOutcome, ModelCache, ModelError, detect_fraud};
pub use budget::{BudgetAlert, BudgetReport, analyze_budget};
pub use category_rules::{CATEGORY_RULES, categorize};
pub use error::PipelineError;
pub use pipeline::{Analysis, UploadOutcome, analyze, enrich, run_upload};
pub use preprocess::preprocess;
