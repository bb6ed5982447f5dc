//! Rule overlay — deterministic business rules on top of the model.
//!
//! RULES:
//!   - A rule may only escalate a row to suspicious, never clear it.
//!   - Each rule is a pure predicate over one row's original values and
//!     the run-wide thresholds. Results are OR-ed into the model label,
//!     so evaluation order cannot change the outcome.
//!   - Percentiles are computed once per run over the full `valor` column.
//!
//! Rules:
//!   R1  valor > p99(valor)
//!   R2  tempo_empresa_anos < 2  AND  valor > p90(valor)
//!   R3  0 <= hour(data_hora) < 6  AND  valor > 500   (only with data_hora)

use crate::{
    config::RuleConfig,
    error::DetectorResult,
    stats::percentile,
    table::TransactionTable,
    timestamp::parse_hour,
    types::{Label, COL_DATA_HORA, COL_TEMPO_EMPRESA, COL_VALOR, LABEL_SUSPICIOUS},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayRule {
    ExtremeValue,
    NewBusinessHighValue,
    NighttimeHighValue,
}

impl OverlayRule {
    pub const ALL: [OverlayRule; 3] = [
        OverlayRule::ExtremeValue,
        OverlayRule::NewBusinessHighValue,
        OverlayRule::NighttimeHighValue,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::ExtremeValue => "R1",
            Self::NewBusinessHighValue => "R2",
            Self::NighttimeHighValue => "R3",
        }
    }

    /// Human-readable criterion, shown to analysts next to the results.
    pub fn description(&self, config: &RuleConfig) -> String {
        match self {
            Self::ExtremeValue => format!(
                "High value: amount above the {} percentile of all amounts in the file",
                config.extreme_value_percentile
            ),
            Self::NewBusinessHighValue => format!(
                "New business and high value: business younger than {} years with amount above the {} percentile",
                config.new_business_max_years, config.high_value_percentile
            ),
            Self::NighttimeHighValue => format!(
                "Nighttime transaction: between {:02}:00 and {:02}:00 with amount above {:.2} (requires data_hora)",
                config.night_start_hour, config.night_end_hour, config.night_min_amount
            ),
        }
    }
}

/// Run-wide amount cut-offs. `None` when the table is empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuleThresholds {
    pub extreme_value: Option<f64>,
    pub high_value: Option<f64>,
}

/// The values of one row that the rules read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowFacts {
    pub valor: f64,
    pub tempo_empresa_anos: f64,
    /// `None` when data_hora is absent or did not parse.
    pub hour: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct OverlayOutcome {
    /// Final labels: model label OR any rule.
    pub labels: Vec<Label>,
    /// Rules that fired, per row.
    pub hits: Vec<Vec<OverlayRule>>,
    pub thresholds: RuleThresholds,
    /// Parsed hour per row; `None` when the table has no data_hora column.
    pub hours: Option<Vec<Option<u32>>>,
    /// Non-empty data_hora values that failed to parse.
    pub unparsed_timestamps: usize,
}

impl OverlayOutcome {
    pub fn hit_count(&self, rule: OverlayRule) -> usize {
        self.hits.iter().filter(|h| h.contains(&rule)).count()
    }
}

pub struct RuleOverlay {
    config: RuleConfig,
}

impl RuleOverlay {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    pub fn thresholds(&self, valores: &[f64]) -> RuleThresholds {
        RuleThresholds {
            extreme_value: percentile(valores, self.config.extreme_value_percentile),
            high_value: percentile(valores, self.config.high_value_percentile),
        }
    }

    /// Pure predicate: does `rule` fire for this row?
    pub fn fires(&self, rule: OverlayRule, row: &RowFacts, thresholds: &RuleThresholds) -> bool {
        let cfg = &self.config;
        match rule {
            OverlayRule::ExtremeValue => thresholds.extreme_value.is_some_and(|p| row.valor > p),
            OverlayRule::NewBusinessHighValue => {
                row.tempo_empresa_anos < cfg.new_business_max_years
                    && thresholds.high_value.is_some_and(|p| row.valor > p)
            }
            OverlayRule::NighttimeHighValue => {
                row.hour
                    .is_some_and(|h| h >= cfg.night_start_hour && h < cfg.night_end_hour)
                    && row.valor > cfg.night_min_amount
            }
        }
    }

    /// Escalate `base` labels using the original (unencoded) table.
    pub fn apply(&self, table: &TransactionTable, base: &[Label]) -> DetectorResult<OverlayOutcome> {
        if base.len() != table.len() {
            return Err(anyhow::anyhow!(
                "label count {} does not match row count {}",
                base.len(),
                table.len()
            )
            .into());
        }

        let valores = table.numeric_column(COL_VALOR)?;
        let tempos = table.numeric_column(COL_TEMPO_EMPRESA)?;
        let thresholds = self.thresholds(&valores);

        let raw_timestamps = table.column(COL_DATA_HORA);
        let hours: Option<Vec<Option<u32>>> = raw_timestamps
            .as_ref()
            .map(|raw| raw.iter().map(|v| parse_hour(v)).collect());

        let unparsed_timestamps = match (&raw_timestamps, &hours) {
            (Some(raw), Some(parsed)) => raw
                .iter()
                .zip(parsed)
                .filter(|(r, h)| !r.trim().is_empty() && h.is_none())
                .count(),
            _ => 0,
        };
        if unparsed_timestamps > 0 {
            log::warn!(
                "{unparsed_timestamps} data_hora value(s) did not parse; nighttime rule skipped for those rows"
            );
        }

        let mut labels = Vec::with_capacity(base.len());
        let mut hits = Vec::with_capacity(base.len());

        for (i, &model_label) in base.iter().enumerate() {
            let facts = RowFacts {
                valor: valores[i],
                tempo_empresa_anos: tempos[i],
                hour: hours.as_ref().and_then(|h| h[i]),
            };
            let fired: Vec<OverlayRule> = OverlayRule::ALL
                .into_iter()
                .filter(|&rule| self.fires(rule, &facts, &thresholds))
                .collect();

            let label = if fired.is_empty() { model_label } else { LABEL_SUSPICIOUS };
            labels.push(label);
            hits.push(fired);
        }

        let outcome = OverlayOutcome {
            labels,
            hits,
            thresholds,
            hours,
            unparsed_timestamps,
        };

        log::debug!(
            "rules: p{}={:?} p{}={:?} hits R1={} R2={} R3={}",
            self.config.extreme_value_percentile,
            thresholds.extreme_value,
            self.config.high_value_percentile,
            thresholds.high_value,
            outcome.hit_count(OverlayRule::ExtremeValue),
            outcome.hit_count(OverlayRule::NewBusinessHighValue),
            outcome.hit_count(OverlayRule::NighttimeHighValue),
        );

        Ok(outcome)
    }
}
