//! budgetwatch-core: Core types for the transaction enrichment pipeline

pub mod budget;
pub mod error;
pub mod finance;

pub use budget::{BudgetLimits, default_limit};
pub use error::{ParseError, ValidationError};
pub use finance::{
    Category, EnrichedTransaction, FEATURE_COUNT, FEATURE_NAMES, PreparedTransaction,
    TemporalFeatures, Transaction,
};
