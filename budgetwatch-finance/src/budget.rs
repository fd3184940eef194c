//! Budget analyzer: per-category totals compared against limits.

use budgetwatch_core::{BudgetLimits, Category, EnrichedTransaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A category whose total went over its limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub category: Category,
    pub spent: f64,
    pub limit: f64,
}

impl BudgetAlert {
    pub fn overage(&self) -> f64 {
        self.spent - self.limit
    }
}

impl fmt::Display for BudgetAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Budget exceeded for {}: ${:.2} (Limit: ${:.2})",
            self.category, self.spent, self.limit
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    /// Summed amount per category present in the data, in category-name order
    pub spending: BTreeMap<Category, f64>,
    /// Alerts in the same order as `spending`
    pub alerts: Vec<BudgetAlert>,
}

/// Total spending per category present in `rows`.
pub fn spending_by_category(
    rows: impl IntoIterator<Item = (Category, f64)>,
) -> BTreeMap<Category, f64> {
    let mut spending = BTreeMap::new();
    for (category, amount) in rows {
        *spending.entry(category).or_insert(0.0) += amount;
    }
    spending
}

/// Compare category totals against `limits`. A total strictly above its
/// limit produces an alert; equality does not.
pub fn analyze_budget(rows: &[EnrichedTransaction], limits: &BudgetLimits) -> BudgetReport {
    let spending = spending_by_category(rows.iter().map(|r| (r.category, r.amount)));
    let alerts = check_limits(&spending, limits);
    BudgetReport { spending, alerts }
}

/// Alerts for every category in `spending` that exceeds its limit.
pub fn check_limits(spending: &BTreeMap<Category, f64>, limits: &BudgetLimits) -> Vec<BudgetAlert> {
    spending
        .iter()
        .filter_map(|(&category, &spent)| {
            let limit = limits.limit_for(category);
            (spent > limit).then_some(BudgetAlert {
                category,
                spent,
                limit,
            })
        })
        .collect()
}
