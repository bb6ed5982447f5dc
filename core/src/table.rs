//! The in-memory transaction table.
//!
//! Values are kept exactly as read so the labeled output and the
//! export show the human-readable originals. Numeric views are
//! parsed on demand and never written back.

use crate::{
    error::{DetectorError, DetectorResult},
    types::RowIndex,
};
use std::{io, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TransactionTable {
    /// Build a table, rejecting rows whose width differs from the header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> DetectorResult<Self> {
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != headers.len()) {
            return Err(DetectorError::RaggedRow {
                row,
                expected: headers.len(),
                actual: r.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Read a headered CSV from any reader.
    ///
    /// Short records are padded with empty cells up to the header width,
    /// so a row that omits trailing optional fields is kept. Records wider
    /// than the header are rejected.
    pub fn from_reader<R: io::Read>(reader: R) -> DetectorResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.len() < headers.len() {
                row.resize(headers.len(), String::new());
            }
            rows.push(row);
        }
        Self::new(headers, rows)
    }

    pub fn from_path(path: impl AsRef<Path>) -> DetectorResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(io::BufReader::new(file))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: RowIndex) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Raw string values of a column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Parse a column as finite f64 values. Any unparseable cell is fatal.
    pub fn numeric_column(&self, name: &str) -> DetectorResult<Vec<f64>> {
        let idx = self.column_index(name).ok_or_else(|| DetectorError::Schema {
            missing: vec![name.to_string()],
            required: vec![name.to_string()],
        })?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                let raw = r[idx].trim();
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| DetectorError::InvalidNumber {
                        column: name.to_string(),
                        row,
                        value: r[idx].clone(),
                    })
            })
            .collect()
    }

    /// The given rows, in the given order. Indices must be in range.
    pub fn select_rows(&self, indices: &[RowIndex]) -> TransactionTable {
        Self {
            headers: self.headers.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> TransactionTable {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_rows() {
        let csv = "a,b\n1,x\n2,y\n";
        let t = TransactionTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(t.headers(), &["a".to_string(), "b".to_string()]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.column("b").unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn header_only_is_empty_table() {
        let t = TransactionTable::from_reader("a,b\n".as_bytes()).unwrap();
        assert!(t.is_empty());
        assert!(t.has_column("a"));
    }

    #[test]
    fn ragged_row_is_rejected() {
        let err = TransactionTable::from_reader("a,b\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DetectorError::RaggedRow { row: 0, expected: 2, actual: 3 }));
    }

    #[test]
    fn short_row_is_padded_with_empty_cells() {
        let csv = "valor,tempo_empresa_anos,tipo_transacao,segmento,pico_horario_transacoes,porte_empresa,data_hora\n\
                   100,3,pix,varejo,manha,pequena,2024-01-01 10:00:00\n\
                   200,4,ted,agro,tarde,media\n";
        let t = TransactionTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.row(1).unwrap().len(), 7);
        assert_eq!(t.column("data_hora").unwrap(), vec!["2024-01-01 10:00:00", ""]);
        assert_eq!(t.numeric_column("valor").unwrap(), vec![100.0, 200.0]);
    }

    #[test]
    fn short_row_missing_numeric_cell_is_invalid_number() {
        let t = TransactionTable::from_reader("a,b\n1,2\n3\n".as_bytes()).unwrap();
        assert!(matches!(
            t.numeric_column("b").unwrap_err(),
            DetectorError::InvalidNumber { row: 1, .. }
        ));
    }

    #[test]
    fn numeric_column_reports_bad_cell() {
        let t = TransactionTable::from_reader("v\n1.5\nabc\n".as_bytes()).unwrap();
        match t.numeric_column("v").unwrap_err() {
            DetectorError::InvalidNumber { row, value, .. } => {
                assert_eq!(row, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn head_truncates() {
        let t = TransactionTable::from_reader("v\n1\n2\n3\n".as_bytes()).unwrap();
        assert_eq!(t.head(2).len(), 2);
        assert_eq!(t.head(10).len(), 3);
    }
}
