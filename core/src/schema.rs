//! Schema validation — the pipeline's gate.
//!
//! A table missing any required column halts the run before any
//! encoding, fitting, or rule evaluation happens.

use crate::{
    error::{DetectorError, DetectorResult},
    table::TransactionTable,
    types::{
        COL_PICO_HORARIO, COL_PORTE_EMPRESA, COL_SEGMENTO, COL_TEMPO_EMPRESA,
        COL_TIPO_TRANSACAO, COL_VALOR,
    },
};

/// The feature columns, in feature-matrix order.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_VALOR,
    COL_TEMPO_EMPRESA,
    COL_TIPO_TRANSACAO,
    COL_SEGMENTO,
    COL_PICO_HORARIO,
    COL_PORTE_EMPRESA,
];

pub const NUMERIC_COLUMNS: [&str; 2] = [COL_VALOR, COL_TEMPO_EMPRESA];

pub const CATEGORICAL_COLUMNS: [&str; 4] = [
    COL_TIPO_TRANSACAO,
    COL_SEGMENTO,
    COL_PICO_HORARIO,
    COL_PORTE_EMPRESA,
];

pub fn required_columns() -> Vec<String> {
    REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Columns from REQUIRED_COLUMNS absent from the table, in required order.
pub fn missing_columns(table: &TransactionTable) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect()
}

/// Pass, or a Schema error naming both the missing and the full required set.
pub fn validate(table: &TransactionTable) -> DetectorResult<()> {
    let missing = missing_columns(table);
    if missing.is_empty() {
        return Ok(());
    }
    log::warn!("schema check failed: missing {:?}", missing);
    Err(DetectorError::Schema {
        missing,
        required: required_columns(),
    })
}
