use anyhow::{Context, Result};
use certcraft_core::filter::{parse_date, parse_score};
use certcraft_core::reader::{self, Field, Record};
use chrono::Datelike;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "certstats")]
#[command(about = "Success-rate statistics for training-completion spreadsheets")]
#[command(version)]
struct Cli {
    /// Path to the training-completion spreadsheet
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Passing threshold for the success rate
    #[arg(short = 's', long, default_value_t = 70.0)]
    threshold: f64,

    /// Restrict to trainings of one year
    #[arg(short, long)]
    year: Option<i32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// CSV export
    Csv,
}

/// Business unit to region mapping used across the training reports.
const UNIT_REGIONS: &[(&str, &str)] = &[
    ("SAM", "ERCIS"),
    ("AFD", "ERCIS"),
    ("AGS", "ERCIS"),
    ("AMR", "ERCIS"),
    ("BIO", "ERCIS"),
    ("CME", "ERCIS"),
    ("PLS", "ERCIS"),
    ("GLI", "ERCIS"),
    ("PSL", "ERCIS"),
    ("SAB", "ERCIS"),
    ("GWO7", "ERCIS"),
    ("GWV3", "ERCIS"),
    ("JSU1", "ERCIS"),
    ("GMM", "NAM"),
    ("PAM_NAM", "NAM"),
    ("SABAP", "MENAT"),
    ("ABS", "LAM"),
    ("ACS", "LAM"),
    ("AMS", "LAM"),
    ("PAM_LAM", "LAM"),
    ("QAR", "MENAT"),
    ("SAU", "MENAT"),
    ("UAE", "MENAT"),
    ("LFO", "MENAT"),
    ("ATT", "MENAT"),
    ("ATS", "MENAT"),
    ("MSC", "MENAT"),
    ("ETS", "MENAT"),
    ("TFO", "MENAT"),
    ("PAM_NAFT", "MENAT"),
    ("PAM_SABAP", "MENAT"),
    ("PAM__GULF", "MENAT"),
    ("ASG", "CEAP"),
    ("ITS", "CEAP"),
    ("TPA", "CEAP"),
    ("SCN", "CEAP"),
    ("PAM_CEAP", "CEAP"),
    ("PCP", "IND"),
    ("PAM_PCP", "IND"),
];

fn region_for(unit: &str) -> &'static str {
    UNIT_REGIONS
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, r)| *r)
        .unwrap_or("Unknown")
}

#[derive(Serialize, Clone)]
struct GroupStats {
    name: String,
    attempts: usize,
    passed: usize,
    rate: f64,
}

#[derive(Serialize)]
struct SuccessStats {
    threshold: f64,
    year: Option<i32>,
    total_records: usize,
    skipped_rows: usize,
    units: Vec<GroupStats>,
    regions: Vec<GroupStats>,
}

fn unit_of(record: &Record) -> String {
    match &record.org_id {
        Field::Text(s) => s.clone(),
        Field::Number(v) if v.fract() == 0.0 => format!("{}", *v as i64),
        Field::Number(v) => v.to_string(),
        _ => String::new(),
    }
}

fn compute_stats(records: &[Record], threshold: f64, year: Option<i32>) -> SuccessStats {
    let mut units: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut regions: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut skipped = 0usize;
    let mut total = 0usize;

    for record in records {
        let Some(score) = parse_score(&record.score) else {
            skipped += 1;
            continue;
        };
        let Some(date) = parse_date(&record.date) else {
            skipped += 1;
            continue;
        };
        if let Some(y) = year {
            if date.year() != y {
                continue;
            }
        }

        total += 1;
        let passed = score >= threshold;
        let unit = unit_of(record);
        let region = region_for(&unit).to_string();

        let unit_entry = units.entry(unit).or_insert((0, 0));
        unit_entry.0 += 1;
        if passed {
            unit_entry.1 += 1;
        }
        let region_entry = regions.entry(region).or_insert((0, 0));
        region_entry.0 += 1;
        if passed {
            region_entry.1 += 1;
        }
    }

    let collect = |map: BTreeMap<String, (usize, usize)>| {
        map.into_iter()
            .map(|(name, (attempts, passed))| GroupStats {
                name,
                attempts,
                passed,
                rate: if attempts > 0 {
                    passed as f64 * 100.0 / attempts as f64
                } else {
                    0.0
                },
            })
            .collect::<Vec<_>>()
    };

    SuccessStats {
        threshold,
        year,
        total_records: total,
        skipped_rows: skipped,
        units: collect(units),
        regions: collect(regions),
    }
}

fn print_human(stats: &SuccessStats) {
    println!("Success rates (threshold: {}%)", stats.threshold);
    if let Some(year) = stats.year {
        println!("Year: {year}");
    }
    println!(
        "Records: {} ({} skipped as unparseable)",
        stats.total_records, stats.skipped_rows
    );
    println!();

    println!("By region:");
    for group in &stats.regions {
        println!(
            "  {:<12} {:>4}/{:<4} {:>6.1}%",
            group.name, group.passed, group.attempts, group.rate
        );
    }
    println!();
    println!("By business unit:");
    for group in &stats.units {
        println!(
            "  {:<12} {:>4}/{:<4} {:>6.1}%",
            group.name, group.passed, group.attempts, group.rate
        );
    }
}

fn print_csv(stats: &SuccessStats) {
    println!("scope,name,attempts,passed,rate");
    for group in &stats.regions {
        println!(
            "region,{},{},{},{:.1}",
            group.name, group.attempts, group.passed, group.rate
        );
    }
    for group in &stats.units {
        println!(
            "unit,{},{},{},{:.1}",
            group.name, group.attempts, group.passed, group.rate
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let records = reader::read_records(&cli.file)
        .with_context(|| format!("Failed to read file: {}", cli.file.display()))?;

    let stats = compute_stats(&records, cli.threshold, cli.year);

    match cli.format {
        OutputFormat::Human => print_human(&stats),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Csv => print_csv(&stats),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, unit: &str, score: f64) -> Record {
        Record {
            row: 2,
            date: Field::Text(date.to_string()),
            name: Field::Text("Someone".to_string()),
            score: Field::Number(score),
            org_id: Field::Text(unit.to_string()),
            email: Field::Empty,
        }
    }

    #[test]
    fn unit_region_mapping() {
        assert_eq!(region_for("SAM"), "ERCIS");
        assert_eq!(region_for("PAM_PCP"), "IND");
        assert_eq!(region_for("UAE"), "MENAT");
        assert_eq!(region_for("XYZ"), "Unknown");
    }

    #[test]
    fn rates_group_by_unit_and_region() {
        let records = vec![
            record("2025-03-10", "SAM", 90.0),
            record("2025-03-11", "SAM", 40.0),
            record("2025-03-12", "AFD", 80.0),
            record("2025-03-13", "UAE", 10.0),
        ];
        let stats = compute_stats(&records, 70.0, None);

        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.skipped_rows, 0);

        let sam = stats.units.iter().find(|g| g.name == "SAM").unwrap();
        assert_eq!(sam.attempts, 2);
        assert_eq!(sam.passed, 1);
        assert_eq!(sam.rate, 50.0);

        // SAM and AFD both roll up into ERCIS.
        let ercis = stats.regions.iter().find(|g| g.name == "ERCIS").unwrap();
        assert_eq!(ercis.attempts, 3);
        assert_eq!(ercis.passed, 2);

        let menat = stats.regions.iter().find(|g| g.name == "MENAT").unwrap();
        assert_eq!(menat.passed, 0);
    }

    #[test]
    fn unparseable_rows_are_skipped() {
        let records = vec![
            record("not a date", "SAM", 90.0),
            Record {
                score: Field::Text("n/a".to_string()),
                ..record("2025-03-10", "SAM", 0.0)
            },
            record("2025-03-10", "SAM", 75.0),
        ];
        let stats = compute_stats(&records, 70.0, None);
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.skipped_rows, 2);
    }

    #[test]
    fn year_filter_excludes_other_years() {
        let records = vec![
            record("2024-06-01", "SAM", 90.0),
            record("2025-03-10", "SAM", 90.0),
        ];
        let stats = compute_stats(&records, 70.0, Some(2025));
        assert_eq!(stats.total_records, 1);
        let sam = stats.units.iter().find(|g| g.name == "SAM").unwrap();
        assert_eq!(sam.attempts, 1);
    }
}
