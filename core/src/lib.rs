//! Transaction fraud screening: an isolation-forest outlier model with a
//! deterministic, escalate-only business-rule overlay.

pub mod config;
pub mod encoder;
pub mod error;
pub mod export;
pub mod isolation_forest;
pub mod pipeline;
pub mod report;
pub mod rng;
pub mod rules;
pub mod scaler;
pub mod schema;
pub mod scorer;
pub mod stats;
pub mod table;
pub mod timestamp;
pub mod types;

pub use config::{DetectorConfig, RuleConfig};
pub use error::{DetectorError, DetectorResult};
pub use pipeline::FraudDetector;
pub use report::{AnalysisMetrics, AnalysisReport, LabeledTable};
pub use table::TransactionTable;
