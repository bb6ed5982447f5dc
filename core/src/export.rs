//! CSV export of a labeled table. Pure serialization: header row,
//! one record per row, values written exactly as held.

use crate::{error::DetectorResult, report::LabeledTable};
use std::{io, path::Path};

pub const DEFAULT_EXPORT_FILENAME: &str = "transacoes_suspeitas.csv";

pub fn write_csv<W: io::Write>(labeled: &LabeledTable, writer: W) -> DetectorResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let table = labeled.table();
    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// UTF-8 CSV bytes, as offered for download.
pub fn to_csv_bytes(labeled: &LabeledTable) -> DetectorResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(labeled, &mut buf)?;
    Ok(buf)
}

pub fn export_to_path(labeled: &LabeledTable, path: impl AsRef<Path>) -> DetectorResult<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_csv(labeled, io::BufWriter::new(file))?;
    log::info!("exported {} row(s) to {}", labeled.len(), path.as_ref().display());
    Ok(())
}
