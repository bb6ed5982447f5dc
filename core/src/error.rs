use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error(
        "Input is missing required columns [{}]. The file must contain the columns: {}",
        missing.join(", "),
        required.join(", ")
    )]
    Schema {
        missing: Vec<String>,
        required: Vec<String>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Column '{column}' row {row}: '{value}' is not a finite number")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Row {row} has {actual} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DetectorError {
    /// True for the one error the presentation layer shows as a
    /// "fix your file" message rather than a crash.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}

pub type DetectorResult<T> = Result<T, DetectorError>;
