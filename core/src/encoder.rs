//! Categorical encoding and feature-matrix assembly.
//!
//! The encoder only borrows the table. The caller's rows keep their
//! human-readable categories; the numeric matrix is a separate value.

use crate::{
    error::DetectorResult,
    schema::{CATEGORICAL_COLUMNS, REQUIRED_COLUMNS},
    table::TransactionTable,
};
use ndarray::Array2;
use std::collections::HashMap;

/// Distinct value -> integer code for one categorical column.
/// Codes are assigned in first-seen order, starting at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMapping {
    pub column: String,
    categories: Vec<String>,
    codes: HashMap<String, usize>,
}

impl CategoryMapping {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            categories: Vec::new(),
            codes: HashMap::new(),
        }
    }

    /// Code for `value`, assigning the next free code on first sight.
    pub fn encode(&mut self, value: &str) -> usize {
        if let Some(&code) = self.codes.get(value) {
            return code;
        }
        let code = self.categories.len();
        self.categories.push(value.to_string());
        self.codes.insert(value.to_string(), code);
        code
    }

    pub fn code_of(&self, value: &str) -> Option<usize> {
        self.codes.get(value).copied()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.categories.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// The numeric view of a validated table.
#[derive(Debug, Clone)]
pub struct EncodedFeatures {
    /// One row per transaction, one column per entry of `columns`.
    pub matrix: Array2<f64>,
    pub columns: Vec<String>,
    pub mappings: Vec<CategoryMapping>,
}

impl EncodedFeatures {
    pub fn mapping(&self, column: &str) -> Option<&CategoryMapping> {
        self.mappings.iter().find(|m| m.column == column)
    }
}

/// Assemble the six-column feature matrix. The table must already
/// have passed schema validation.
pub fn encode(table: &TransactionTable) -> DetectorResult<EncodedFeatures> {
    let n_rows = table.len();
    let mut matrix = Array2::<f64>::zeros((n_rows, REQUIRED_COLUMNS.len()));
    let mut mappings = Vec::with_capacity(CATEGORICAL_COLUMNS.len());

    for (j, &name) in REQUIRED_COLUMNS.iter().enumerate() {
        let values: Vec<f64> = if CATEGORICAL_COLUMNS.contains(&name) {
            let mut mapping = CategoryMapping::new(name);
            let raw = table.column(name).unwrap_or_default();
            let codes = raw.iter().map(|v| mapping.encode(v) as f64).collect();
            log::debug!("encoded '{name}': {} distinct categories", mapping.len());
            mappings.push(mapping);
            codes
        } else {
            table.numeric_column(name)?
        };

        for (i, v) in values.into_iter().enumerate() {
            matrix[[i, j]] = v;
        }
    }

    Ok(EncodedFeatures {
        matrix,
        columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        mappings,
    })
}
