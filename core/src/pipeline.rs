//! The analysis pipeline — one call per uploaded file.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Schema validation      (fatal on failure; nothing else runs)
//!   2. Feature encoding       (borrowed table -> numeric matrix)
//!   3. Feature scaling        (per-column z-score)
//!   4. Anomaly scoring        (isolation forest, fit fresh on this run)
//!   5. Rule overlay           (original values, escalate-only)
//!   6. Result assembly        (labeled table, metrics, suspicious subset)
//!
//! RULES:
//!   - Stages exchange values only; there is no shared state between runs.
//!   - All randomness flows through the RngBank.
//!   - Non-fatal conditions become RunWarnings, never errors.

use crate::{
    config::DetectorConfig,
    encoder,
    error::DetectorResult,
    isolation_forest::IsolationForest,
    report::{self, AnalysisReport, RunWarning},
    rng::{RngBank, StageSlot},
    rules::RuleOverlay,
    scaler::StandardScaler,
    schema,
    scorer::AnomalyScorer,
    table::TransactionTable,
    types::{RunId, LABEL_SUSPICIOUS},
};

pub struct FraudDetector {
    pub run_id: RunId,
    pub rng_bank: RngBank,
    config: DetectorConfig,
}

impl FraudDetector {
    pub fn new(run_id: RunId, config: DetectorConfig) -> DetectorResult<Self> {
        config.validate()?;
        Ok(Self {
            run_id,
            rng_bank: RngBank::new(config.seed),
            config,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn build_scorer(&self) -> IsolationForest {
        IsolationForest::new()
            .with_n_estimators(self.config.n_estimators)
            .with_max_samples(self.config.max_samples)
            .with_contamination(self.config.contamination)
    }

    /// Run every stage over `table`. The table itself is never modified.
    pub fn analyze(&self, table: &TransactionTable) -> DetectorResult<AnalysisReport> {
        schema::validate(table)?;
        log::debug!("run={} schema ok: {} rows", self.run_id, table.len());

        let features = encoder::encode(table)?;

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&features.matrix)?;
        let mut warnings = Vec::new();
        if !table.is_empty() {
            for j in scaler.degenerate_columns() {
                warnings.push(RunWarning::DegenerateColumn {
                    column: features.columns[j].clone(),
                });
            }
        }

        let mut scorer = self.build_scorer();
        let mut rng = self.rng_bank.for_stage(StageSlot::Scorer);
        let model_labels = scorer.fit_predict(&scaled, &mut rng)?;
        log::debug!(
            "run={} {} flagged {} of {} rows",
            self.run_id,
            scorer.name(),
            model_labels.iter().filter(|&&l| l == LABEL_SUSPICIOUS).count(),
            model_labels.len()
        );

        let overlay = RuleOverlay::new(self.config.rules.clone());
        let outcome = overlay.apply(table, &model_labels)?;

        let report = report::assemble(
            self.run_id.clone(),
            scorer.name(),
            table,
            model_labels,
            outcome,
            warnings,
        )?;

        log::info!(
            "run={} total={} suspicious={} ({:.2}%)",
            self.run_id,
            report.metrics.total,
            report.metrics.suspicious,
            report.metrics.suspicious_pct
        );
        Ok(report)
    }
}
