//! Transaction record types for each stage of the enrichment pipeline

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spending categories assigned by keyword rules.
///
/// Variants are declared alphabetically so ordered maps keyed by
/// `Category` iterate in name order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Entertainment,
    Food,
    Health,
    Housing,
    Other,
    Shopping,
    Transport,
    Utilities,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Entertainment,
        Category::Food,
        Category::Health,
        Category::Housing,
        Category::Other,
        Category::Shopping,
        Category::Transport,
        Category::Utilities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Entertainment => "entertainment",
            Category::Food => "food",
            Category::Health => "health",
            Category::Housing => "housing",
            Category::Other => "other",
            Category::Shopping => "shopping",
            Category::Transport => "transport",
            Category::Utilities => "utilities",
        }
    }

    /// Look up a category by its lowercase name
    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated input row: the three required columns, parsed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub date: NaiveDateTime,
    /// Free text; may be empty
    pub description: String,
    /// Sign convention preserved from the export
    pub amount: f64,
}

impl Transaction {
    pub fn new(date: NaiveDateTime, description: impl Into<String>, amount: f64) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
        }
    }
}

/// Temporal and statistical features derived after sorting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TemporalFeatures {
    /// Whole days since the previous row; 0 for the first row
    pub days_since_last: i64,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    /// 1..=31
    pub day_of_month: u32,
    pub rolling_amount_mean: f64,
    pub rolling_amount_std: f64,
}

/// A transaction that has been through the preprocessor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreparedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(flatten)]
    pub features: TemporalFeatures,
}

impl PreparedTransaction {
    /// Feature vector consumed by the anomaly model, in
    /// [`FEATURE_NAMES`] order
    pub fn feature_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.transaction.amount,
            self.features.days_since_last as f64,
            self.features.day_of_week as f64,
            self.features.rolling_amount_mean,
            self.features.rolling_amount_std,
        ]
    }

    /// Attach the categorizer and anomaly scorer outputs
    pub fn enrich(self, category: Category, is_fraud: bool) -> EnrichedTransaction {
        EnrichedTransaction {
            date: self.transaction.date,
            description: self.transaction.description,
            amount: self.transaction.amount,
            days_since_last: self.features.days_since_last,
            day_of_week: self.features.day_of_week,
            day_of_month: self.features.day_of_month,
            rolling_amount_mean: self.features.rolling_amount_mean,
            rolling_amount_std: self.features.rolling_amount_std,
            category,
            is_fraud,
        }
    }
}

pub const FEATURE_COUNT: usize = 5;

/// Model feature schema. Persisted alongside the model.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "amount",
    "days_since_last",
    "day_of_week",
    "rolling_amount_mean",
    "rolling_amount_std",
];

/// A fully enriched transaction, as handed to reporting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedTransaction {
    pub date: NaiveDateTime,
    pub description: String,
    pub amount: f64,
    pub days_since_last: i64,
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub rolling_amount_mean: f64,
    pub rolling_amount_std: f64,
    pub category: Category,
    pub is_fraud: bool,
}
