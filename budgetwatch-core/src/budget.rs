//! Per-category spending ceilings

use crate::error::ValidationError;
use crate::finance::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spending ceilings keyed by category.
///
/// Categories without an entry fall back to the `other` limit, and to
/// `0.0` when `other` is absent as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimits {
    limits: BTreeMap<Category, f64>,
}

impl BudgetLimits {
    /// An empty mapping; every lookup yields `0.0`
    pub fn empty() -> Self {
        Self {
            limits: BTreeMap::new(),
        }
    }

    /// Set one ceiling, rejecting negative or non-finite values
    pub fn set(&mut self, category: Category, limit: f64) -> Result<(), ValidationError> {
        if !limit.is_finite() || limit < 0.0 {
            return Err(ValidationError::InvalidLimit {
                category: category.to_string(),
                value: limit,
            });
        }
        self.limits.insert(category, limit);
        Ok(())
    }

    pub fn with_limit(mut self, category: Category, limit: f64) -> Result<Self, ValidationError> {
        self.set(category, limit)?;
        Ok(self)
    }

    pub fn remove(&mut self, category: Category) -> Option<f64> {
        self.limits.remove(&category)
    }

    /// The explicit entry for `category`, if any
    pub fn get(&self, category: Category) -> Option<f64> {
        self.limits.get(&category).copied()
    }

    /// Effective ceiling for `category`, applying the `other` fallback
    pub fn limit_for(&self, category: Category) -> f64 {
        self.get(category)
            .or_else(|| self.get(Category::Other))
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.limits.iter().map(|(c, l)| (*c, *l))
    }
}

impl Default for BudgetLimits {
    fn default() -> Self {
        let limits = Category::ALL
            .into_iter()
            .map(|c| (c, default_limit(c)))
            .collect();
        Self { limits }
    }
}

/// Documented default ceiling for each category
pub fn default_limit(category: Category) -> f64 {
    match category {
        Category::Food => 500.0,
        Category::Transport => 200.0,
        Category::Shopping => 300.0,
        Category::Housing => 1500.0,
        Category::Entertainment => 100.0,
        Category::Health => 300.0,
        Category::Utilities => 200.0,
        Category::Other => 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_category() {
        let limits = BudgetLimits::default();
        assert_eq!(limits.iter().count(), Category::ALL.len());
        assert_eq!(limits.limit_for(Category::Housing), 1500.0);
        assert_eq!(limits.limit_for(Category::Entertainment), 100.0);
        assert_eq!(limits.limit_for(Category::Other), 100.0);
    }

    #[test]
    fn test_missing_category_falls_back_to_other() {
        let mut limits = BudgetLimits::default();
        limits.remove(Category::Shopping);
        assert_eq!(limits.limit_for(Category::Shopping), 100.0);

        limits.remove(Category::Other);
        assert_eq!(limits.limit_for(Category::Shopping), 0.0);
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        let mut limits = BudgetLimits::empty();
        assert!(limits.set(Category::Food, -1.0).is_err());
        assert!(limits.set(Category::Food, f64::NAN).is_err());
        assert!(limits.set(Category::Food, 0.0).is_ok());
        assert_eq!(limits.get(Category::Food), Some(0.0));
    }
}
