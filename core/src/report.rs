//! Result assembly — labels joined back onto the original table,
//! aggregate metrics, and the suspicious subset.
//!
//! This is the whole surface the presentation layer consumes.

use crate::{
    error::DetectorResult,
    rules::{OverlayOutcome, OverlayRule, RuleThresholds},
    table::TransactionTable,
    types::{Label, RowIndex, RunId, COL_ANOMALY, COL_HORA, COL_SEGMENTO, LABEL_SUSPICIOUS},
};
use serde::Serialize;
use std::fmt;

/// Non-fatal conditions absorbed during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// data_hora values that did not parse; R3 skipped for those rows.
    UnparsedTimestamps { count: usize },
    /// A feature column with zero variance; scaled to 0.0.
    DegenerateColumn { column: String },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnparsedTimestamps { count } => {
                write!(f, "{count} data_hora value(s) could not be parsed and were ignored by the nighttime rule")
            }
            Self::DegenerateColumn { column } => {
                write!(f, "feature '{column}' is constant in this file and carries no signal")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisMetrics {
    pub total: usize,
    pub suspicious: usize,
    /// 100 * suspicious / total, or 0.0 for an empty table.
    pub suspicious_pct: f64,
}

impl AnalysisMetrics {
    pub fn from_labels(labels: &[Label]) -> Self {
        let total = labels.len();
        let suspicious = labels.iter().filter(|&&l| l == LABEL_SUSPICIOUS).count();
        let suspicious_pct = if total > 0 {
            suspicious as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self { total, suspicious, suspicious_pct }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentCount {
    pub segmento: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleHitCount {
    pub rule: OverlayRule,
    pub id: &'static str,
    pub rows: usize,
}

/// Original columns plus `anomaly` (and `hora` when data_hora exists),
/// with per-row provenance kept alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    table: TransactionTable,
    source_rows: Vec<RowIndex>,
    labels: Vec<Label>,
    model_labels: Vec<Label>,
    rule_hits: Vec<Vec<OverlayRule>>,
}

impl LabeledTable {
    pub fn table(&self) -> &TransactionTable {
        &self.table
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Labels as the scorer emitted them, before any rule fired.
    pub fn model_labels(&self) -> &[Label] {
        &self.model_labels
    }

    pub fn rule_hits(&self) -> &[Vec<OverlayRule>] {
        &self.rule_hits
    }

    /// Position of each row in the input table.
    pub fn source_rows(&self) -> &[RowIndex] {
        &self.source_rows
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Order-preserving view of the rows labeled suspicious.
    pub fn suspicious_only(&self) -> LabeledTable {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.labels[i] == LABEL_SUSPICIOUS)
            .collect();

        LabeledTable {
            table: self.table.select_rows(&keep),
            source_rows: keep.iter().map(|&i| self.source_rows[i]).collect(),
            labels: keep.iter().map(|&i| self.labels[i]).collect(),
            model_labels: keep.iter().map(|&i| self.model_labels[i]).collect(),
            rule_hits: keep.iter().map(|&i| self.rule_hits[i].clone()).collect(),
        }
    }
}

/// Everything a single run produces.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub run_id: RunId,
    pub scorer: &'static str,
    pub labeled: LabeledTable,
    pub suspicious: LabeledTable,
    pub metrics: AnalysisMetrics,
    /// Descending by count. Empty means "no data" for charting.
    pub segment_counts: Vec<SegmentCount>,
    pub thresholds: RuleThresholds,
    pub rule_hits: Vec<RuleHitCount>,
    pub warnings: Vec<RunWarning>,
}

/// Join final labels onto the original table and derive the outputs.
pub fn assemble(
    run_id: RunId,
    scorer: &'static str,
    table: &TransactionTable,
    model_labels: Vec<Label>,
    outcome: OverlayOutcome,
    mut warnings: Vec<RunWarning>,
) -> DetectorResult<AnalysisReport> {
    let mut headers = table.headers().to_vec();
    headers.push(COL_ANOMALY.to_string());
    if outcome.hours.is_some() {
        headers.push(COL_HORA.to_string());
    }

    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut out = row.clone();
            out.push(outcome.labels[i].to_string());
            if let Some(hours) = &outcome.hours {
                out.push(hours[i].map(|h| h.to_string()).unwrap_or_default());
            }
            out
        })
        .collect();

    let labeled = LabeledTable {
        table: TransactionTable::new(headers, rows)?,
        source_rows: (0..table.len()).collect(),
        labels: outcome.labels.clone(),
        model_labels,
        rule_hits: outcome.hits.clone(),
    };
    let suspicious = labeled.suspicious_only();
    let metrics = AnalysisMetrics::from_labels(labeled.labels());
    let segment_counts = segment_counts(&suspicious);

    let rule_hits = OverlayRule::ALL
        .into_iter()
        .map(|rule| RuleHitCount {
            rule,
            id: rule.id(),
            rows: outcome.hit_count(rule),
        })
        .collect();

    if outcome.unparsed_timestamps > 0 {
        warnings.push(RunWarning::UnparsedTimestamps {
            count: outcome.unparsed_timestamps,
        });
    }

    Ok(AnalysisReport {
        run_id,
        scorer,
        labeled,
        suspicious,
        metrics,
        segment_counts,
        thresholds: outcome.thresholds,
        rule_hits,
        warnings,
    })
}

/// Suspicious rows per segment, most frequent first; ties keep first-seen order.
pub fn segment_counts(suspicious: &LabeledTable) -> Vec<SegmentCount> {
    let Some(segments) = suspicious.table().column(COL_SEGMENTO) else {
        return Vec::new();
    };

    let mut counts: Vec<SegmentCount> = Vec::new();
    for seg in segments {
        match counts.iter_mut().find(|c| c.segmento == seg) {
            Some(c) => c.count += 1,
            None => counts.push(SegmentCount {
                segmento: seg.to_string(),
                count: 1,
            }),
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}
