mod cli;
mod json;

pub use cli::{print_record_table, print_results_table, print_stats_table};
pub use json::print_json;

use anyhow::Result;
use std::collections::BTreeMap;

use crate::model::Entry;
use crate::search::PackageOrOption;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_results(results: &[PackageOrOption], total: usize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_results_table(results, total),
        OutputFormat::Json => print_json(results),
    }
}

pub fn print_record(key: &str, entry: Entry<'_>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_record_table(key, entry),
        OutputFormat::Json => print_json(&entry),
    }
}

pub fn print_stats(info: &BTreeMap<String, String>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_stats_table(info),
        OutputFormat::Json => print_json(info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }
}
