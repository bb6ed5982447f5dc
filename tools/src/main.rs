//! fraud-runner: headless fraud screening over a transaction CSV.
//!
//! Usage:
//!   fraud-runner --input transacoes.csv
//!   fraud-runner --input transacoes.csv --output suspeitas.csv --seed 7 --contamination 0.05
//!   fraud-runner --input transacoes.csv --config detector.json --json

use anyhow::Result;
use fraud_detector_core::{
    export::{self, DEFAULT_EXPORT_FILENAME},
    report::{RuleHitCount, RunWarning, SegmentCount},
    rules::{OverlayRule, RuleThresholds},
    AnalysisMetrics, AnalysisReport, DetectorConfig, DetectorError, FraudDetector,
    TransactionTable,
};
use std::env;

const PREVIEW_ROWS: usize = 5;
const SUSPICIOUS_PREVIEW_ROWS: usize = 20;

#[derive(serde::Serialize)]
struct RunSummary<'a> {
    run_id: &'a str,
    scorer: &'a str,
    metrics: AnalysisMetrics,
    thresholds: RuleThresholds,
    rule_hits: &'a [RuleHitCount],
    segment_counts: &'a [SegmentCount],
    warnings: &'a [RunWarning],
    export_path: &'a str,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(input) = arg_value(&args, "--input") else {
        eprintln!("usage: fraud-runner --input <file.csv> [--output <file.csv>] [--config <file.json>] [--seed N] [--contamination F] [--json]");
        std::process::exit(2);
    };
    let output = arg_value(&args, "--output").unwrap_or(DEFAULT_EXPORT_FILENAME);
    let json_mode = args.iter().any(|a| a == "--json");

    let mut config = match arg_value(&args, "--config") {
        Some(path) => DetectorConfig::load(path)?,
        None => DetectorConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.contamination = parse_arg(&args, "--contamination", config.contamination);

    if !json_mode {
        println!("Fraud Detector — fraud-runner");
        println!("  input:          {input}");
        println!("  output:         {output}");
        println!("  seed:           {}", config.seed);
        println!("  contamination:  {}", config.contamination);
        println!();
    }

    let table = TransactionTable::from_path(input)?;
    if !json_mode {
        print_preview(&table);
    }

    let run_id = format!("run-{}-{}", config.seed, unix_seconds());
    log::info!("{run_id}: loaded {} row(s) from {input}", table.len());
    let detector = FraudDetector::new(run_id, config)?;

    let report = match detector.analyze(&table) {
        Ok(r) => r,
        Err(e @ DetectorError::Schema { .. }) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    for w in &report.warnings {
        log::warn!("{}: {w}", report.run_id);
    }

    export::export_to_path(&report.suspicious, output)?;

    if json_mode {
        let summary = RunSummary {
            run_id: &report.run_id,
            scorer: report.scorer,
            metrics: report.metrics,
            thresholds: report.thresholds,
            rule_hits: &report.rule_hits,
            segment_counts: &report.segment_counts,
            warnings: &report.warnings,
            export_path: output,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&report, detector.config(), output);
    }
    Ok(())
}

fn print_preview(table: &TransactionTable) {
    println!("=== SAMPLE OF LOADED DATA ===");
    println!("  {}", table.headers().join(" | "));
    for row in table.head(PREVIEW_ROWS).rows() {
        println!("  {}", row.join(" | "));
    }
    if table.is_empty() {
        println!("  (no rows)");
    }
    println!();
}

fn print_summary(report: &AnalysisReport, config: &DetectorConfig, output: &str) {
    println!("=== ADDITIONAL SUSPICION CRITERIA ===");
    for rule in OverlayRule::ALL {
        println!("  {}: {}", rule.id(), rule.description(&config.rules));
    }
    println!();

    let m = &report.metrics;
    println!("=== ANALYSIS METRICS ===");
    println!("  run_id:             {}", report.run_id);
    println!("  total transactions: {}", m.total);
    println!("  suspicious:         {}", m.suspicious);
    println!("  suspicious %:       {:.2}%", m.suspicious_pct);
    for hit in &report.rule_hits {
        println!("  {} rows:            {}", hit.id, hit.rows);
    }
    for w in &report.warnings {
        println!("  warning: {w}");
    }
    println!();

    println!("=== SUSPICIOUS TRANSACTIONS BY SEGMENT ===");
    if report.segment_counts.is_empty() {
        println!("  (no suspicious transactions to show by segment)");
    } else {
        let widest = report.segment_counts.iter().map(|s| s.count).max().unwrap_or(1);
        for s in &report.segment_counts {
            let bar = "#".repeat((s.count * 40).div_ceil(widest));
            println!("  {:<24} {:>6}  {bar}", s.segmento, s.count);
        }
    }
    println!();

    println!("=== SUSPICIOUS TRANSACTIONS ===");
    let table = report.suspicious.table();
    if table.is_empty() {
        println!("  (none)");
    } else {
        println!("  {}", table.headers().join(" | "));
        for row in table.head(SUSPICIOUS_PREVIEW_ROWS).rows() {
            println!("  {}", row.join(" | "));
        }
        if table.len() > SUSPICIOUS_PREVIEW_ROWS {
            println!("  ... {} more", table.len() - SUSPICIOUS_PREVIEW_ROWS);
        }
    }
    println!();
    println!("  exported {} row(s) to {output}", table.len());
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

/// Parse a flag's value, keeping `default` when the flag is absent or malformed.
fn parse_arg<T: std::str::FromStr + Copy + std::fmt::Display>(args: &[String], flag: &str, default: T) -> T {
    let Some(raw) = arg_value(args, flag) else {
        return default;
    };
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            log::warn!("ignoring {flag} {raw:?}: not a valid value, using {default}");
            default
        }
    }
}

fn unix_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_arg_reads_valid_values() {
        let a = args(&["fraud-runner", "--seed", "7", "--contamination", "0.05"]);
        assert_eq!(parse_arg(&a, "--seed", 42u64), 7);
        assert_eq!(parse_arg(&a, "--contamination", 0.1f64), 0.05);
    }

    #[test]
    fn parse_arg_falls_back_on_missing_or_malformed() {
        let a = args(&["fraud-runner", "--seed", "seven"]);
        assert_eq!(parse_arg(&a, "--seed", 42u64), 42);
        assert_eq!(parse_arg(&a, "--contamination", 0.1f64), 0.1);
    }
}
