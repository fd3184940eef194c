use anyhow::{Context, Result};
use budgetwatch_core::{BudgetLimits, Category, default_limit};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_budgetwatch_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub budget: BudgetSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub report: ReportSection,
}

/// The eight category limits. Missing keys take their documented default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSection {
    #[serde(default = "default_food")]
    pub food: f64,
    #[serde(default = "default_transport")]
    pub transport: f64,
    #[serde(default = "default_shopping")]
    pub shopping: f64,
    #[serde(default = "default_housing")]
    pub housing: f64,
    #[serde(default = "default_entertainment")]
    pub entertainment: f64,
    #[serde(default = "default_health")]
    pub health: f64,
    #[serde(default = "default_utilities")]
    pub utilities: f64,
    #[serde(default = "default_other")]
    pub other: f64,
}

fn default_food() -> f64 {
    default_limit(Category::Food)
}
fn default_transport() -> f64 {
    default_limit(Category::Transport)
}
fn default_shopping() -> f64 {
    default_limit(Category::Shopping)
}
fn default_housing() -> f64 {
    default_limit(Category::Housing)
}
fn default_entertainment() -> f64 {
    default_limit(Category::Entertainment)
}
fn default_health() -> f64 {
    default_limit(Category::Health)
}
fn default_utilities() -> f64 {
    default_limit(Category::Utilities)
}
fn default_other() -> f64 {
    default_limit(Category::Other)
}

impl Default for BudgetSection {
    fn default() -> Self {
        Self {
            food: default_food(),
            transport: default_transport(),
            shopping: default_shopping(),
            housing: default_housing(),
            entertainment: default_entertainment(),
            health: default_health(),
            utilities: default_utilities(),
            other: default_other(),
        }
    }
}

impl BudgetSection {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Food => self.food,
            Category::Transport => self.transport,
            Category::Shopping => self.shopping,
            Category::Housing => self.housing,
            Category::Entertainment => self.entertainment,
            Category::Health => self.health,
            Category::Utilities => self.utilities,
            Category::Other => self.other,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut f64 {
        match category {
            Category::Food => &mut self.food,
            Category::Transport => &mut self.transport,
            Category::Shopping => &mut self.shopping,
            Category::Housing => &mut self.housing,
            Category::Entertainment => &mut self.entertainment,
            Category::Health => &mut self.health,
            Category::Utilities => &mut self.utilities,
            Category::Other => &mut self.other,
        }
    }

    /// Validated limits for the pipeline
    pub fn to_limits(&self) -> Result<BudgetLimits> {
        let mut limits = BudgetLimits::empty();
        for category in Category::ALL {
            limits.set(category, self.get(category))?;
        }
        Ok(limits)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSection {
    /// Model artifact path (default: ~/.budgetwatch/budget_model.json)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub recent_limit: usize,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self { recent_limit: 10 }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_budgetwatch_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_budget_keeps_defaults() {
        let cfg = parse_config("[budget]\nfood = 650\nother = 0\n").unwrap();
        assert_eq!(cfg.budget.food, 650.0);
        assert_eq!(cfg.budget.other, 0.0);
        assert_eq!(cfg.budget.housing, 1500.0);
        assert_eq!(cfg.report.recent_limit, 10);
        assert!(cfg.model.path.is_none());
    }

    #[test]
    fn test_non_numeric_limit_rejected() {
        assert!(parse_config("[budget]\nfood = \"lots\"\n").is_err());
    }

    #[test]
    fn test_negative_limit_rejected() {
        let mut section = BudgetSection::default();
        section.transport = -5.0;
        assert!(section.to_limits().is_err());
    }

    #[test]
    fn test_default_section_matches_core_defaults() {
        assert_eq!(BudgetSection::default().to_limits().unwrap(), BudgetLimits::default());
    }

    #[test]
    fn test_round_trip() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let cfg = parse_config(&s).unwrap();
        assert_eq!(cfg.budget, BudgetSection::default());
    }
}
