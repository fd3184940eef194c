//! Text and JSON rendering of an [`Analysis`].

use budgetwatch_core::{BudgetLimits, Category, EnrichedTransaction};
use budgetwatch_finance::{Analysis, BudgetAlert};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub transaction_count: usize,
    pub spending: &'a BTreeMap<Category, f64>,
    pub budget: &'a BudgetLimits,
    pub alerts: Vec<String>,
    pub fraud_count: usize,
    pub flagged: Vec<&'a EnrichedTransaction>,
    pub recent: &'a [EnrichedTransaction],
}

pub fn to_json(analysis: &Analysis, limits: &BudgetLimits) -> serde_json::Result<String> {
    let report = JsonReport {
        transaction_count: analysis.transactions.len(),
        spending: &analysis.spending,
        budget: limits,
        alerts: analysis.alerts.iter().map(BudgetAlert::to_string).collect(),
        fraud_count: analysis.fraud_count,
        flagged: analysis.flagged().collect(),
        recent: &analysis.recent,
    };
    serde_json::to_string_pretty(&report)
}

pub fn render_text(analysis: &Analysis, limits: &BudgetLimits) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Analyzed {} transactions\n", analysis.transactions.len());

    let _ = writeln!(out, "## Spending by category\n");
    for (category, spent) in &analysis.spending {
        let limit = limits.limit_for(*category);
        let marker = if *spent > limit { "  OVER" } else { "" };
        let _ = writeln!(
            out,
            "  {:<14} ${:>10.2} / ${:>10.2}{}",
            category.as_str(),
            spent,
            limit,
            marker
        );
    }

    let _ = writeln!(out, "\n## Alerts\n");
    if analysis.alerts.is_empty() {
        let _ = writeln!(out, "  (all categories within budget)");
    }
    for alert in &analysis.alerts {
        let _ = writeln!(out, "- {alert}");
    }

    let _ = writeln!(out, "\n## Potential fraud ({})\n", analysis.fraud_count);
    for t in analysis.flagged() {
        let _ = writeln!(out, "- {}", line(t));
    }

    let _ = writeln!(out, "\n## Recent transactions\n");
    for t in &analysis.recent {
        let _ = writeln!(out, "- {}", line(t));
    }
    out
}

fn line(t: &EnrichedTransaction) -> String {
    format!(
        "{} | {} | {} | ${:.2}{}",
        t.date.format("%Y-%m-%d"),
        t.description,
        t.category,
        t.amount,
        if t.is_fraud { " | FLAGGED" } else { "" }
    )
}

/// Limits table shown alongside a failure message
pub fn render_budget(limits: &BudgetLimits) -> String {
    let mut out = String::from("Budget:\n");
    for (category, limit) in limits.iter() {
        let _ = writeln!(out, "  {:<14} ${:.2}", category.as_str(), limit);
    }
    out
}
