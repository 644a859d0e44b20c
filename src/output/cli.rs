use anyhow::Result;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

use crate::model::{
    length_key, CanonicalOption, CanonicalPackage, Collection, Entry, INFO_LAST_UPDATED, INFO_VERSION,
};
use crate::search::PackageOrOption;

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Collection")]
    collection: String,
    #[tabled(rename = "Records")]
    records: String,
}

pub fn print_results_table(results: &[PackageOrOption], total: usize) -> Result<()> {
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let rows: Vec<ResultRow> = results
        .iter()
        .map(|r| ResultRow {
            source: r.source.display_name().to_string(),
            kind: r.kind.to_string(),
            key: truncate(&r.key, 50),
            description: truncate(&single_line(&r.description), 60),
            flags: format_flags(r.broken, r.insecure),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
    if total > results.len() {
        println!("Showing {} of {} results.", results.len(), total);
    } else {
        println!("{} results.", total);
    }
    Ok(())
}

pub fn print_record_table(key: &str, entry: Entry<'_>) -> Result<()> {
    let rows = match entry {
        Entry::Option(option) => option_fields(key, option),
        Entry::Package(package) => package_fields(key, package),
    };
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
    Ok(())
}

pub fn print_stats_table(info: &BTreeMap<String, String>) -> Result<()> {
    let rows: Vec<StatRow> = Collection::ALL
        .iter()
        .map(|c| StatRow {
            collection: c.display_name().to_string(),
            records: info.get(&length_key(*c)).cloned().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
    if let Some(version) = info.get(INFO_VERSION) {
        println!("Version: {}", version);
    }
    if let Some(updated) = info.get(INFO_LAST_UPDATED) {
        println!("Last updated: {}", updated);
    }
    Ok(())
}

fn option_fields(key: &str, option: &CanonicalOption) -> Vec<FieldRow> {
    vec![
        field("Option", key.to_string()),
        field("Source", Collection::from(option.source).display_name().to_string()),
        field("Type", or_dash(&option.option_type)),
        field("Default", or_dash(&option.default)),
        field("Example", or_dash(&option.example)),
        field("Declared in", or_dash(&option.declarations.join("\n"))),
        field("Description", or_dash(&option.description)),
    ]
}

fn package_fields(key: &str, package: &CanonicalPackage) -> Vec<FieldRow> {
    let licenses: Vec<&str> = package
        .licenses
        .iter()
        .map(|l| {
            if l.spdx_id.is_empty() {
                l.full_name.as_str()
            } else {
                l.spdx_id.as_str()
            }
        })
        .collect();
    let maintainers: Vec<&str> = package
        .maintainers
        .iter()
        .map(|m| if m.github.is_empty() { m.name.as_str() } else { m.github.as_str() })
        .collect();
    let platforms: Vec<&str> = package.platforms_simplified.iter().map(|p| p.as_str()).collect();

    vec![
        field("Package", key.to_string()),
        field("Name", or_dash(&package.name)),
        field("Version", or_dash(&package.version)),
        field("Description", or_dash(&package.description)),
        field("Main program", or_dash(&package.main_program)),
        field("Homepage", or_dash(&package.homepages.join("\n"))),
        field("License", or_dash(&licenses.join(", "))),
        field("Maintainers", or_dash(&maintainers.join(", "))),
        field("Platforms", or_dash(&platforms.join(", "))),
        field("Position", or_dash(&package.position_url)),
        field("Flags", format_flags(package.broken, package.insecure)),
        field(
            "Vulnerabilities",
            or_dash(&package.known_vulnerabilities.join("\n")),
        ),
    ]
}

fn field(field: &'static str, value: String) -> FieldRow {
    FieldRow { field, value }
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn format_flags(broken: bool, insecure: bool) -> String {
    match (broken, insecure) {
        (true, true) => "broken, insecure".to_string(),
        (true, false) => "broken".to_string(),
        (false, true) => "insecure".to_string(),
        (false, false) => String::new(),
    }
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{License, Maintainer, PackageSource};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long description", 10), "a very ...");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("Fast\n  grep\ttool "), "Fast grep tool");
    }

    #[test]
    fn test_format_flags() {
        assert_eq!(format_flags(false, false), "");
        assert_eq!(format_flags(true, true), "broken, insecure");
        assert_eq!(format_flags(false, true), "insecure");
    }

    #[test]
    fn test_package_fields_prefer_handles_and_spdx() {
        let mut package = CanonicalPackage::new(PackageSource::Nixpkgs, "ripgrep-14.1.1", "14.1.1")
            .with_maintainers(vec![
                Maintainer::named("Jane Doe"),
                Maintainer {
                    name: "Someone".to_string(),
                    email: None,
                    github: "someone".to_string(),
                    github_id: 7,
                },
            ]);
        package.licenses = vec![
            License {
                free: true,
                full_name: "MIT License".to_string(),
                spdx_id: "MIT".to_string(),
            },
            License::named("Unlicense"),
        ];

        let rows = package_fields("ripgrep", &package);
        let value = |name: &str| rows.iter().find(|r| r.field == name).unwrap().value.clone();
        assert_eq!(value("Maintainers"), "Jane Doe, someone");
        assert_eq!(value("License"), "MIT, Unlicense");
        assert_eq!(value("Homepage"), "-");
        assert_eq!(value("Flags"), "");
    }
}
