use anyhow::{Context, Result};
use budgetwatch_core::Category;
use budgetwatch_finance::{ModelCache, UploadOutcome, preprocess, run_upload};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod report;
mod state;

use config::BudgetSection;

#[derive(Parser, Debug)]
#[command(
    name = "budgetwatch",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUDGETWATCH_BUILD_SHA"), ")"),
    about = "Categorize a transaction export, flag anomalies, and check it against a budget"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a CSV or XLSX export with Date, Description and Amount columns
    Analyze {
        /// Export to analyze (.csv or .xlsx)
        file: PathBuf,

        #[command(flatten)]
        budget: BudgetArgs,

        /// Fraud model artifact (default: ~/.budgetwatch/budget_model.json)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Number of recent transactions to list (default from config: 10)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Train the fraud model on an export and store it, replacing any existing model
    Train {
        file: PathBuf,

        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Write ~/.budgetwatch/config.toml with the default budget
    InitConfig,
}

/// Per-category limit overrides; unset flags keep the config value
#[derive(Args, Debug, Default)]
struct BudgetArgs {
    #[arg(long)]
    food: Option<f64>,
    #[arg(long)]
    transport: Option<f64>,
    #[arg(long)]
    shopping: Option<f64>,
    #[arg(long)]
    housing: Option<f64>,
    #[arg(long)]
    entertainment: Option<f64>,
    #[arg(long)]
    health: Option<f64>,
    #[arg(long)]
    utilities: Option<f64>,
    #[arg(long)]
    other: Option<f64>,
}

impl BudgetArgs {
    fn value(&self, category: Category) -> Option<f64> {
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

    fn apply(&self, section: &mut BudgetSection) {
        for category in Category::ALL {
            if let Some(v) = self.value(category) {
                *section.get_mut(category) = v;
            }
        }
    }
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            file,
            budget,
            model,
            json,
            limit,
        } => analyze(file, budget, model, json, limit),

        Command::Train { file, model } => {
            train(file, model)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::InitConfig => {
            config::init_config()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn model_cache(model: Option<PathBuf>, cfg: &config::Config) -> Result<ModelCache> {
    let path = match model.or_else(|| cfg.model.path.clone()) {
        Some(p) => p,
        None => state::default_model_path()?,
    };
    log::debug!("fraud model artifact: {}", path.display());
    Ok(ModelCache::new(path))
}

fn analyze(
    file: PathBuf,
    budget: BudgetArgs,
    model: Option<PathBuf>,
    json: bool,
    limit: Option<usize>,
) -> Result<ExitCode> {
    let cfg = config::load_config()?;
    let mut section = cfg.budget.clone();
    budget.apply(&mut section);
    let limits = section.to_limits()?;

    let cache = model_cache(model, &cfg)?;
    let uploads = state::uploads_dir()?;
    let recent_limit = limit.unwrap_or(cfg.report.recent_limit);

    match run_upload(&file, &uploads, &limits, &cache) {
        UploadOutcome::Report(analysis) => {
            let analysis = analysis.with_recent_limit(recent_limit);
            if json {
                println!("{}", report::to_json(&analysis, &limits)?);
            } else {
                print!("{}", report::render_text(&analysis, &limits));
            }
            Ok(ExitCode::SUCCESS)
        }
        UploadOutcome::Failed { message, budget } => {
            eprintln!("{message}\n");
            eprint!("{}", report::render_budget(&budget));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn train(file: PathBuf, model: Option<PathBuf>) -> Result<()> {
    let cfg = config::load_config()?;
    let cache = model_cache(model, &cfg)?;

    let table = budgetwatch_ingest::read_table(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    let prepared = preprocess(&table).with_context(|| format!("preprocessing {}", file.display()))?;
    let trained = cache
        .train_and_store(&prepared)
        .context("training fraud model")?;

    println!(
        "Trained fraud model on {} transactions ({} trees) -> {}",
        prepared.len(),
        trained.forest.params().n_estimators,
        cache.path().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_budget_flags() {
        let cli = Cli::try_parse_from([
            "budgetwatch", "analyze", "march.csv", "--food", "650", "--other", "0", "--json",
        ])
        .unwrap();
        let Command::Analyze { file, budget, json, .. } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(file, PathBuf::from("march.csv"));
        assert!(json);

        let mut section = BudgetSection::default();
        budget.apply(&mut section);
        assert_eq!(section.food, 650.0);
        assert_eq!(section.other, 0.0);
        assert_eq!(section.housing, 1500.0);
    }

    #[test]
    fn test_cli_rejects_non_numeric_limit() {
        assert!(Cli::try_parse_from(["budgetwatch", "analyze", "a.csv", "--food", "lots"]).is_err());
    }
}
