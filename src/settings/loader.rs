//! CSV-based settings loader
//!
//! Reads system settings from a data directory:
//! - `settings.csv` (`key,value`)
//! - `tax_brackets.csv` (`year,income_from,income_to,rate`)
//! - `cofinancing_brackets.csv` (`income_from,income_to,numerator,denominator`)
//! - `payout_yields.csv` (`term_from,term_to,amount_from,amount_to,yield_pct`)
//!
//! Only `settings.csv` is required; a missing table keeps the built-in one.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{info, warn};
use serde::Deserialize;

use super::{keys, StaticSettings};
use crate::catalog::YieldLine;
use crate::error::LoadError;
use crate::tax::{CofinancingBracket, TaxBracket};

/// Default path to the data directory
pub const DEFAULT_DATA_PATH: &str = "data";

#[derive(Debug, Deserialize)]
struct SettingRow {
    key: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct PayoutYieldRow {
    term_from: u32,
    term_to: Option<u32>,
    amount_from: f64,
    amount_to: Option<f64>,
    yield_pct: f64,
}

/// Load `key,value` rows; unknown keys are kept but logged
pub fn load_values_from_reader<R: Read>(reader: R) -> Result<Vec<(String, f64)>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut values = Vec::new();
    for result in csv_reader.deserialize() {
        let row: SettingRow = result?;
        if !keys::ALL.contains(&row.key.as_str()) {
            warn!("Unknown setting '{}' ignored by the planner", row.key);
        }
        values.push((row.key, row.value));
    }
    Ok(values)
}

pub fn load_tax_brackets_from_reader<R: Read>(reader: R) -> Result<Vec<TaxBracket>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut brackets = Vec::new();
    for result in csv_reader.deserialize() {
        let bracket: TaxBracket = result?;
        brackets.push(bracket);
    }
    Ok(brackets)
}

pub fn load_cofinancing_brackets_from_reader<R: Read>(reader: R) -> Result<Vec<CofinancingBracket>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut brackets = Vec::new();
    for result in csv_reader.deserialize() {
        let bracket: CofinancingBracket = result?;
        if bracket.denominator <= 0.0 {
            return Err(LoadError::InvalidValue {
                field: "denominator",
                value: bracket.denominator.to_string(),
            });
        }
        brackets.push(bracket);
    }
    Ok(brackets)
}

pub fn load_payout_yields_from_reader<R: Read>(reader: R) -> Result<Vec<YieldLine>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut lines = Vec::new();
    for result in csv_reader.deserialize() {
        let row: PayoutYieldRow = result?;
        lines.push(YieldLine::new((row.term_from, row.term_to), (row.amount_from, row.amount_to), row.yield_pct));
    }
    Ok(lines)
}

/// Load settings and bracket tables from the data directory at `path`
pub fn load_settings(path: &Path) -> Result<StaticSettings, LoadError> {
    let mut settings = StaticSettings::defaults();

    for (key, value) in load_values_from_reader(File::open(path.join("settings.csv"))?)? {
        settings = settings.with_value(&key, value);
    }

    let tax_path = path.join("tax_brackets.csv");
    if tax_path.exists() {
        settings = settings.with_tax_brackets(load_tax_brackets_from_reader(File::open(tax_path)?)?);
    }

    let cofinancing_path = path.join("cofinancing_brackets.csv");
    if cofinancing_path.exists() {
        settings =
            settings.with_cofinancing_brackets(load_cofinancing_brackets_from_reader(File::open(cofinancing_path)?)?);
    }

    let payout_path = path.join("payout_yields.csv");
    if payout_path.exists() {
        settings = settings.with_payout_yields(load_payout_yields_from_reader(File::open(payout_path)?)?);
    }

    info!("Loaded settings from {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{CofinancingBracketProvider, SettingsProvider, TaxBracketProvider};

    #[test]
    fn test_load_values() {
        let csv = "key,value\ninflation_rate,0.05\nsomething_else,1\n";
        let values = load_values_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], ("inflation_rate".to_string(), 0.05));
    }

    #[test]
    fn test_load_tax_brackets_with_open_upper_bound() {
        let csv = "year,income_from,income_to,rate\n2025,0,2400000,0.13\n2025,2400000,,0.15\n";
        let brackets = load_tax_brackets_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(brackets.len(), 2);
        assert_eq!(brackets[1].income_to, None);
        assert_eq!(brackets[1].rate, 0.15);
    }

    #[test]
    fn test_zero_denominator_rejected() {
        let csv = "income_from,income_to,numerator,denominator\n0,,1,0\n";
        let result = load_cofinancing_brackets_from_reader(csv.as_bytes());
        assert!(matches!(result, Err(LoadError::InvalidValue { field: "denominator", .. })));
    }

    #[test]
    fn test_load_payout_yields() {
        let csv = "term_from,term_to,amount_from,amount_to,yield_pct\n0,120,0,,6\n121,,0,,7\n";
        let lines = load_payout_yields_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(500, 1.0));
    }

    #[test]
    fn test_load_bundled_settings() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_DATA_PATH);
        let settings = load_settings(&path).expect("bundled settings should load");

        assert_eq!(settings.get(keys::INFLATION_RATE), Some(0.04));
        assert_eq!(settings.cofinancing_brackets().len(), 3);
        assert!(!settings.tax_brackets().is_empty());
        assert_eq!(settings.payout_yields().len(), 3);
    }
}
