//! Keyword rules mapping transaction descriptions to a [`Category`].
//!
//! Rules are evaluated in table order and the last rule with a matching
//! keyword wins, so a description naming both a landlord and a streaming
//! service lands in `entertainment`. Descriptions matching nothing stay
//! `other`.

use budgetwatch_core::{Category, PreparedTransaction};

/// One category and the lowercase keywords that select it
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
}

impl CategoryRule {
    /// `lowered` must already be lowercase
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// Ordered rule list. Later entries override earlier ones.
pub const CATEGORY_RULES: [CategoryRule; 7] = [
    CategoryRule {
        category: Category::Food,
        keywords: &["grocery", "market", "restaurant", "starbucks", "whole foods", "coffee"],
    },
    CategoryRule {
        category: Category::Health,
        keywords: &["pharmacy", "dentist", "doctor", "cvs", "clinic", "hospital"],
    },
    CategoryRule {
        category: Category::Utilities,
        keywords: &["at&t", "verizon", "bill", "electric", "water", "internet"],
    },
    CategoryRule {
        category: Category::Transport,
        keywords: &["gas", "petrol", "uber", "lyft", "shell", "taxi"],
    },
    CategoryRule {
        category: Category::Shopping,
        keywords: &["amazon", "best buy", "target", "walmart", "store"],
    },
    CategoryRule {
        category: Category::Housing,
        keywords: &["rent", "apartment", "mortgage", "lease"],
    },
    CategoryRule {
        category: Category::Entertainment,
        keywords: &["netflix", "spotify", "hulu", "movie", "concert"],
    },
];

/// Categorize one description (case-insensitive substring match).
pub fn categorize(description: &str) -> Category {
    let desc = description.to_lowercase();
    CATEGORY_RULES
        .iter()
        .filter(|rule| rule.matches(&desc))
        .last()
        .map(|rule| rule.category)
        .unwrap_or(Category::Other)
}

/// Categorize every row, preserving order.
pub fn categorize_all(rows: &[PreparedTransaction]) -> Vec<Category> {
    rows.iter()
        .map(|r| categorize(&r.transaction.description))
        .collect()
}
