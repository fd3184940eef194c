//! End-to-end enrichment: table → preprocess → {categorize, flag fraud} →
//! budget comparison.

use budgetwatch_core::{BudgetLimits, Category, EnrichedTransaction};
use budgetwatch_ingest::{StagedUpload, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::anomaly::{ModelCache, detect_fraud};
use crate::budget::{BudgetAlert, analyze_budget};
use crate::category_rules::categorize_all;
use crate::error::PipelineError;
use crate::preprocess::preprocess;

/// How many of the latest transactions an [`Analysis`] keeps for display
pub const RECENT_LIMIT: usize = 10;

/// Everything the presentation layer needs from one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Date-ordered, categorized and fraud-flagged rows
    pub transactions: Vec<EnrichedTransaction>,
    pub spending: BTreeMap<Category, f64>,
    pub alerts: Vec<BudgetAlert>,
    pub fraud_count: usize,
    /// Latest rows, newest first; [`RECENT_LIMIT`] unless overridden with
    /// [`Analysis::with_recent_limit`]
    pub recent: Vec<EnrichedTransaction>,
}

impl Analysis {
    pub fn from_enriched(transactions: Vec<EnrichedTransaction>, limits: &BudgetLimits) -> Self {
        let report = analyze_budget(&transactions, limits);
        let fraud_count = transactions.iter().filter(|t| t.is_fraud).count();
        let recent = most_recent(&transactions, RECENT_LIMIT);
        Self {
            transactions,
            spending: report.spending,
            alerts: report.alerts,
            fraud_count,
            recent,
        }
    }

    pub fn flagged(&self) -> impl Iterator<Item = &EnrichedTransaction> {
        self.transactions.iter().filter(|t| t.is_fraud)
    }

    /// Recompute `recent` to hold the latest `n` rows.
    pub fn with_recent_limit(mut self, n: usize) -> Self {
        self.recent = most_recent(&self.transactions, n);
        self
    }
}

/// Up to `n` rows, newest first; rows on the same date keep input order.
pub fn most_recent(rows: &[EnrichedTransaction], n: usize) -> Vec<EnrichedTransaction> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.truncate(n);
    sorted
}

/// Preprocess, categorize and flag every row of `table`.
pub fn enrich(table: &Table, cache: &ModelCache) -> Result<Vec<EnrichedTransaction>, PipelineError> {
    let prepared = preprocess(table)?;
    let categories = categorize_all(&prepared);
    let flags = detect_fraud(cache, &prepared)?;

    Ok(prepared
        .into_iter()
        .zip(categories)
        .zip(flags)
        .map(|((row, category), is_fraud)| row.enrich(category, is_fraud))
        .collect())
}

/// Run the whole pipeline over an in-memory table.
pub fn analyze(table: &Table, limits: &BudgetLimits, cache: &ModelCache) -> Result<Analysis, PipelineError> {
    let enriched = enrich(table, cache)?;
    let analysis = Analysis::from_enriched(enriched, limits);
    log::info!(
        "analyzed {} transactions: {} categories, {} alerts, {} flagged",
        analysis.transactions.len(),
        analysis.spending.len(),
        analysis.alerts.len(),
        analysis.fraud_count
    );
    Ok(analysis)
}

/// Result of processing one uploaded export
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Report(Analysis),
    /// Carries the default budget so the caller can redisplay its form
    Failed { message: String, budget: BudgetLimits },
}

/// Stage `source` into `uploads_dir`, analyze it, and remove the staged
/// copy on every path out.
pub fn run_upload(
    source: &Path,
    uploads_dir: &Path,
    limits: &BudgetLimits,
    cache: &ModelCache,
) -> UploadOutcome {
    match process_upload(source, uploads_dir, limits, cache) {
        Ok(analysis) => UploadOutcome::Report(analysis),
        Err(e) => {
            log::warn!("processing {} failed: {e}", source.display());
            UploadOutcome::Failed {
                message: e.user_message(),
                budget: BudgetLimits::default(),
            }
        }
    }
}

fn process_upload(
    source: &Path,
    uploads_dir: &Path,
    limits: &BudgetLimits,
    cache: &ModelCache,
) -> Result<Analysis, PipelineError> {
    let staged = StagedUpload::stage(source, uploads_dir)?;
    let table = staged.read_table()?;
    analyze(&table, limits, cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetwatch_ingest::Cell;
    use chrono::NaiveDate;

    fn row(y: i32, m: u32, d: u32, desc: &str, amount: f64, is_fraud: bool) -> EnrichedTransaction {
        EnrichedTransaction {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            description: desc.to_string(),
            amount,
            days_since_last: 0,
            day_of_week: 0,
            day_of_month: d,
            rolling_amount_mean: amount,
            rolling_amount_std: 0.0,
            category: Category::Other,
            is_fraud,
        }
    }

    #[test]
    fn test_most_recent_newest_first() {
        let rows: Vec<_> = (1..=12).map(|d| row(2024, 1, d, &format!("d{d}"), 1.0, false)).collect();
        let recent = most_recent(&rows, RECENT_LIMIT);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].description, "d12");
        assert_eq!(recent[9].description, "d3");
    }

    #[test]
    fn test_recent_limit_override() {
        let rows: Vec<_> = (1..=12).map(|d| row(2024, 1, d, &format!("d{d}"), 1.0, false)).collect();
        let analysis = Analysis::from_enriched(rows, &BudgetLimits::default());
        assert_eq!(analysis.recent.len(), RECENT_LIMIT);

        let wider = analysis.clone().with_recent_limit(12);
        assert_eq!(wider.recent.len(), 12);
        assert_eq!(wider.recent[11].description, "d1");

        let narrow = analysis.with_recent_limit(2);
        let names: Vec<_> = narrow.recent.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(names, vec!["d12", "d11"]);
    }

    #[test]
    fn test_most_recent_ties_keep_order() {
        let rows = vec![
            row(2024, 1, 1, "a", 1.0, false),
            row(2024, 1, 2, "b", 1.0, false),
            row(2024, 1, 2, "c", 1.0, false),
        ];
        let names: Vec<_> = most_recent(&rows, 5).into_iter().map(|r| r.description).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_fraud_count() {
        let rows = vec![
            row(2024, 1, 1, "a", 1.0, true),
            row(2024, 1, 2, "b", 1.0, false),
            row(2024, 1, 3, "c", 9.0, true),
        ];
        let analysis = Analysis::from_enriched(rows, &BudgetLimits::default());
        assert_eq!(analysis.fraud_count, 2);
        assert_eq!(analysis.flagged().count(), 2);
        assert_eq!(analysis.spending[&Category::Other], 11.0);
    }

    #[test]
    fn test_enrich_rejects_missing_columns_before_model() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(dir.path().join("model.json"));
        let mut table = Table::new(vec!["Date".into(), "Amount".into()]);
        table.rows.push(vec![Cell::Text("2024-01-01".into()), Cell::Text("1".into())]);

        assert!(matches!(enrich(&table, &cache), Err(PipelineError::Validation(_))));
        assert!(!cache.path().exists());
    }
}
