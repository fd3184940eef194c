//! Turn a raw export table into date-ordered transactions with derived
//! temporal and rolling-amount features.
//!
//! Every row is validated and parsed before anything is derived, so a bad
//! date or amount anywhere fails the whole batch.

use budgetwatch_core::{
    ParseError, PreparedTransaction, TemporalFeatures, Transaction, ValidationError,
};
use budgetwatch_ingest::{Cell, Table};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::PipelineError;

/// Trailing window for the rolling amount statistics, current row included
pub const ROLLING_WINDOW: usize = 5;

pub const DATE_COLUMN: &str = "Date";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const AMOUNT_COLUMN: &str = "Amount";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d %b %Y", "%b %d, %Y"];

/// Validate, parse, sort and enrich every row of `table`.
pub fn preprocess(table: &Table) -> Result<Vec<PreparedTransaction>, PipelineError> {
    let txns = extract_transactions(table)?;
    Ok(derive_features(txns))
}

struct Columns {
    date: usize,
    description: usize,
    amount: usize,
}

fn resolve_columns(table: &Table) -> Result<Columns, ValidationError> {
    let lookup = |name: &str| table.column_index(name);
    match (
        lookup(DATE_COLUMN),
        lookup(DESCRIPTION_COLUMN),
        lookup(AMOUNT_COLUMN),
    ) {
        (Some(date), Some(description), Some(amount)) => Ok(Columns {
            date,
            description,
            amount,
        }),
        _ => {
            let missing = [DATE_COLUMN, DESCRIPTION_COLUMN, AMOUNT_COLUMN]
                .into_iter()
                .filter(|c| lookup(c).is_none())
                .map(str::to_string)
                .collect();
            Err(ValidationError::MissingColumns { missing })
        }
    }
}

/// Parse the three required columns of every row, in input order.
pub fn extract_transactions(table: &Table) -> Result<Vec<Transaction>, PipelineError> {
    let columns = resolve_columns(table)?;
    let amounts = AmountParser::new()?;

    let mut txns = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let date_cell = table.cell(row, columns.date);
        let date = parse_date(date_cell)
            .map_err(|reason| ParseError::new(row + 1, DATE_COLUMN, date_cell.to_string(), reason))?;

        let amount_cell = table.cell(row, columns.amount);
        let amount = amounts.parse(amount_cell).map_err(|reason| {
            ParseError::new(row + 1, AMOUNT_COLUMN, amount_cell.to_string(), reason)
        })?;

        let description = match table.cell(row, columns.description) {
            Cell::Empty => String::new(),
            other => other.to_string(),
        };

        txns.push(Transaction::new(date, description, amount));
    }
    Ok(txns)
}

/// Sort chronologically (stable) and compute the derived features.
pub fn derive_features(mut txns: Vec<Transaction>) -> Vec<PreparedTransaction> {
    txns.sort_by_key(|t| t.date);

    let amounts: Vec<f64> = txns.iter().map(|t| t.amount).collect();
    let global_mean = mean(&amounts).unwrap_or(0.0);
    // A single-row batch has no sample std at all; fall back to zero spread.
    let global_std = sample_std(&amounts).unwrap_or(0.0);

    let mut prepared = Vec::with_capacity(txns.len());
    let mut previous: Option<NaiveDateTime> = None;

    for (i, txn) in txns.into_iter().enumerate() {
        let days_since_last = previous
            .map(|prev| (txn.date - prev).num_days())
            .unwrap_or(0);
        previous = Some(txn.date);

        let window = &amounts[(i + 1).saturating_sub(ROLLING_WINDOW)..=i];
        let features = TemporalFeatures {
            days_since_last,
            day_of_week: txn.date.weekday().num_days_from_monday(),
            day_of_month: txn.date.day(),
            rolling_amount_mean: mean(window).unwrap_or(global_mean),
            rolling_amount_std: sample_std(window).unwrap_or(global_std),
        };

        prepared.push(PreparedTransaction {
            transaction: txn,
            features,
        });
    }
    prepared
}

pub fn parse_date(cell: &Cell) -> Result<NaiveDateTime, String> {
    match cell {
        Cell::DateTime(dt) => Ok(*dt),
        Cell::Text(s) => parse_date_str(s.trim()),
        Cell::Empty => Err("missing date".to_string()),
        Cell::Number(_) | Cell::Bool(_) => Err("expected a date".to_string()),
    }
}

fn parse_date_str(s: &str) -> Result<NaiveDateTime, String> {
    // Offsets are dropped; the calendar day is the one written in the file.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Ok(dt);
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
        .ok_or_else(|| "unrecognized date format".to_string())
}

/// Parses amount cells, accepting `$`, thousands separators and
/// accounting-style parentheses for negatives.
pub struct AmountParser {
    pattern: Regex,
}

impl AmountParser {
    pub fn new() -> Result<Self, regex::Error> {
        let pattern = Regex::new(concat!(
            r"^(?P<open>\()?",
            r"(?P<sign>[-+])?\$?(?P<inner_sign>-)?",
            r"(?P<num>(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d*)?|\.\d+)",
            r"(?P<close>\))?$"
        ))?;
        Ok(Self { pattern })
    }

    pub fn parse(&self, cell: &Cell) -> Result<f64, String> {
        match cell {
            Cell::Number(n) if n.is_finite() => Ok(*n),
            Cell::Number(_) => Err("amount is not finite".to_string()),
            Cell::Text(s) => self.parse_str(s),
            Cell::Empty => Err("missing amount".to_string()),
            Cell::Bool(_) | Cell::DateTime(_) => Err("expected a number".to_string()),
        }
    }

    pub fn parse_str(&self, raw: &str) -> Result<f64, String> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if let Ok(n) = compact.parse::<f64>() {
            return if n.is_finite() {
                Ok(n)
            } else {
                Err("amount is not finite".to_string())
            };
        }

        let caps = self
            .pattern
            .captures(&compact)
            .ok_or_else(|| "not a number".to_string())?;
        if caps.name("open").is_some() != caps.name("close").is_some() {
            return Err("unbalanced parentheses".to_string());
        }

        let magnitude: f64 = caps["num"]
            .replace(',', "")
            .parse()
            .map_err(|e| format!("{e}"))?;
        let negative = caps.name("open").is_some()
            || caps.name("inner_sign").is_some()
            || caps.name("sign").map(|m| m.as_str()) == Some("-");
        Ok(if negative { -magnitude } else { magnitude })
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator)
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str, &str)]) -> Table {
        let mut t = Table::new(vec!["Date".into(), "Description".into(), "Amount".into()]);
        for (d, desc, a) in rows {
            t.rows.push(vec![
                Cell::Text(d.to_string()),
                Cell::Text(desc.to_string()),
                Cell::Text(a.to_string()),
            ]);
        }
        t
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_missing_columns_rejected() {
        let t = Table::new(vec!["Date".into(), "Memo".into()]);
        let err = preprocess(&t).unwrap_err();
        match err {
            PipelineError::Validation(ValidationError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["Description", "Amount"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_date_fails_batch() {
        let t = table(&[("2024-01-01", "Coffee", "4.50"), ("someday", "Rent", "1500")]);
        let err = preprocess(&t).unwrap_err();
        match err {
            PipelineError::Parse(e) => {
                assert_eq!(e.row, 2);
                assert_eq!(e.column, "Date");
                assert_eq!(e.value, "someday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_amount_fails_batch() {
        let t = table(&[("2024-01-01", "Coffee", "")]);
        assert!(matches!(preprocess(&t), Err(PipelineError::Parse(_))));
    }

    #[test]
    fn test_sorted_and_gaps() {
        let t = table(&[
            ("2024-01-10", "c", "3"),
            ("2024-01-01", "a", "1"),
            ("2024-01-03", "b", "2"),
            ("2024-01-03", "b2", "5"),
        ]);
        let rows = preprocess(&t).unwrap();
        let descs: Vec<_> = rows.iter().map(|r| r.transaction.description.as_str()).collect();
        assert_eq!(descs, vec!["a", "b", "b2", "c"]);

        let gaps: Vec<_> = rows.iter().map(|r| r.features.days_since_last).collect();
        assert_eq!(gaps, vec![0, 2, 0, 7]);
        for w in rows.windows(2) {
            assert!(w[0].transaction.date <= w[1].transaction.date);
        }
    }

    #[test]
    fn test_calendar_features() {
        // 2024-01-01 was a Monday
        let rows = preprocess(&table(&[("2024-01-01", "x", "1"), ("01/07/2024", "y", "1")])).unwrap();
        assert_eq!(rows[0].features.day_of_week, 0);
        assert_eq!(rows[0].features.day_of_month, 1);
        assert_eq!(rows[1].features.day_of_week, 6);
        assert_eq!(rows[1].features.day_of_month, 7);
    }

    #[test]
    fn test_rolling_window_and_fill() {
        let t = table(&[
            ("2024-01-01", "a", "10"),
            ("2024-01-02", "b", "20"),
            ("2024-01-03", "c", "30"),
            ("2024-01-04", "d", "40"),
            ("2024-01-05", "e", "50"),
            ("2024-01-06", "f", "60"),
        ]);
        let rows = preprocess(&t).unwrap();

        // first row: single-element window, std falls back to global sample std
        let global_std = sample_std(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]).unwrap();
        assert!(close(rows[0].features.rolling_amount_mean, 10.0));
        assert!(close(rows[0].features.rolling_amount_std, global_std));

        assert!(close(rows[1].features.rolling_amount_mean, 15.0));
        assert!(close(rows[1].features.rolling_amount_std, 50f64.sqrt()));

        // last row sees only the five most recent amounts
        assert!(close(rows[5].features.rolling_amount_mean, 40.0));
        assert!(close(rows[5].features.rolling_amount_std, 250f64.sqrt()));

        for r in &rows {
            assert!(r.features.rolling_amount_mean.is_finite());
            assert!(r.features.rolling_amount_std.is_finite());
        }
    }

    #[test]
    fn test_single_row_has_no_gaps() {
        let rows = preprocess(&table(&[("2024-05-05", "Rent", "1500")])).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].features.days_since_last, 0);
        assert!(close(rows[0].features.rolling_amount_mean, 1500.0));
        assert_eq!(rows[0].features.rolling_amount_std, 0.0);
    }

    #[test]
    fn test_date_formats() {
        for s in [
            "2024-03-05",
            "03/05/2024",
            "2024/03/05",
            "2024-03-05 14:30:00",
            "2024-03-05T14:30:00",
            "2024-03-05T14:30:00Z",
        ] {
            let dt = parse_date(&Cell::Text(s.into())).unwrap();
            assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), "{s}");
        }
        assert!(parse_date(&Cell::Number(45000.0)).is_err());
    }

    #[test]
    fn test_offset_dates_keep_wall_clock_day() {
        let t = table(&[
            ("2024-03-04T23:30:00-05:00", "Late dinner", "40"),
            ("2024-03-05T00:15:00+09:00", "Early taxi", "12"),
        ]);
        let rows = preprocess(&t).unwrap();

        assert_eq!(rows[0].transaction.description, "Late dinner");
        assert_eq!(rows[0].features.day_of_month, 4);
        assert_eq!(rows[0].features.day_of_week, 0);
        assert_eq!(rows[1].features.day_of_month, 5);
        assert_eq!(rows[1].features.days_since_last, 0);
    }

    #[test]
    fn test_amount_formats() {
        let p = AmountParser::new().unwrap();
        assert_eq!(p.parse_str("45.00"), Ok(45.0));
        assert_eq!(p.parse_str("-15.99"), Ok(-15.99));
        assert_eq!(p.parse_str("$1,500.00"), Ok(1500.0));
        assert_eq!(p.parse_str("-$12.50"), Ok(-12.5));
        assert_eq!(p.parse_str("$-12.50"), Ok(-12.5));
        assert_eq!(p.parse_str("(45.00)"), Ok(-45.0));
        assert_eq!(p.parse_str("1 234"), Ok(1234.0));
        assert!(p.parse_str("12,34").is_err());
        assert!(p.parse_str("(45.00").is_err());
        assert!(p.parse_str("abc").is_err());
        assert!(p.parse_str("NaN").is_err());
    }
}
