//! Shared primitive types used across the entire pipeline.

/// Zero-based position of a row in the input table.
pub type RowIndex = usize;

/// The canonical analysis-run identifier.
pub type RunId = String;

/// Per-row binary label. 0 = normal, 1 = suspicious.
/// Stored as a raw bit so it serializes exactly as the export expects.
pub type Label = u8;

pub const LABEL_NORMAL: Label = 0;
pub const LABEL_SUSPICIOUS: Label = 1;

// ── Column names ─────────────────────────────────────────────────────────────

pub const COL_VALOR: &str = "valor";
pub const COL_TEMPO_EMPRESA: &str = "tempo_empresa_anos";
pub const COL_TIPO_TRANSACAO: &str = "tipo_transacao";
pub const COL_SEGMENTO: &str = "segmento";
pub const COL_PICO_HORARIO: &str = "pico_horario_transacoes";
pub const COL_PORTE_EMPRESA: &str = "porte_empresa";

/// Optional timestamp column. Enables the nighttime rule.
pub const COL_DATA_HORA: &str = "data_hora";

/// Derived columns appended to the labeled table.
pub const COL_ANOMALY: &str = "anomaly";
pub const COL_HORA: &str = "hora";
