use crate::error::{DetectorError, DetectorResult};
use serde::{Deserialize, Serialize};

/// Thresholds for the deterministic rule overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// R1: rows above this percentile of `valor` are suspicious.
    pub extreme_value_percentile: f64,
    /// R2: percentile of `valor` a new business must exceed.
    pub high_value_percentile: f64,
    /// R2: a business younger than this (strictly) counts as new.
    pub new_business_max_years: f64,
    /// R3: nighttime window, start inclusive.
    pub night_start_hour: u32,
    /// R3: nighttime window, end exclusive.
    pub night_end_hour: u32,
    /// R3: fixed amount a nighttime transaction must exceed.
    pub night_min_amount: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            extreme_value_percentile: 99.0,
            high_value_percentile: 90.0,
            new_business_max_years: 2.0,
            night_start_hour: 0,
            night_end_hour: 6,
            night_min_amount: 500.0,
        }
    }
}

/// Every tunable of a single analysis run.
/// The model is fit fresh per run; nothing here is learned state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Expected fraction of anomalous rows. Must lie in (0, 0.5].
    pub contamination: f64,
    /// Master seed for every RNG stream in the run.
    pub seed: u64,
    /// Number of isolation trees.
    pub n_estimators: usize,
    /// Subsample size per tree, capped at the row count.
    pub max_samples: usize,
    pub rules: RuleConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            contamination: 0.1,
            seed: 42,
            n_estimators: 100,
            max_samples: 256,
            rules: RuleConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DetectorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with a small forest for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            n_estimators: 25,
            max_samples: 64,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn validate(&self) -> DetectorResult<()> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(DetectorError::InvalidConfig(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.n_estimators == 0 {
            return Err(DetectorError::InvalidConfig("n_estimators must be > 0".into()));
        }
        if self.max_samples == 0 {
            return Err(DetectorError::InvalidConfig("max_samples must be > 0".into()));
        }

        let r = &self.rules;
        for (name, p) in [
            ("extreme_value_percentile", r.extreme_value_percentile),
            ("high_value_percentile", r.high_value_percentile),
        ] {
            if !(0.0..=100.0).contains(&p) {
                return Err(DetectorError::InvalidConfig(format!(
                    "{name} must be in [0, 100], got {p}"
                )));
            }
        }
        if r.night_end_hour > 24 || r.night_start_hour >= r.night_end_hour {
            return Err(DetectorError::InvalidConfig(format!(
                "night window [{}, {}) is not a valid hour range",
                r.night_start_hour, r.night_end_hour
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DetectorConfig::default().validate().unwrap();
        DetectorConfig::default_test().validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: DetectorConfig =
            serde_json::from_str(r#"{ "seed": 7, "rules": { "night_min_amount": 1000.0 } }"#).unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.contamination, 0.1);
        assert_eq!(cfg.rules.night_min_amount, 1000.0);
        assert_eq!(cfg.rules.extreme_value_percentile, 99.0);
    }

    #[test]
    fn rejects_out_of_range_contamination() {
        for c in [0.0, -0.1, 0.51, f64::NAN] {
            let cfg = DetectorConfig::default().with_contamination(c);
            assert!(cfg.validate().is_err(), "contamination {c} should be rejected");
        }
    }

    #[test]
    fn rejects_inverted_night_window() {
        let mut cfg = DetectorConfig::default();
        cfg.rules.night_start_hour = 6;
        cfg.rules.night_end_hour = 6;
        assert!(cfg.validate().is_err());
    }
}
