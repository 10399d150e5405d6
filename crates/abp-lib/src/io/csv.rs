use crate::signal::MISSING;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use std::path::Path;

/// Read one named column from a headed CSV file. Empty cells become gaps.
pub fn read_csv_column(path: &Path, column: &str) -> Result<Vec<f64>> {
    let reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    read_column(reader, column).with_context(|| format!("reading {}", path.display()))
}

fn read_column<R: std::io::Read>(mut reader: csv::Reader<R>, column: &str) -> Result<Vec<f64>> {
    let headers = reader.headers().context("reading CSV header")?.clone();
    let col = headers
        .iter()
        .position(|h| h == column)
        .with_context(|| format!("column {column:?} not found in header"))?;
    let mut out = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("parsing row {}", idx + 1))?;
        let cell = record.get(col).unwrap_or("");
        if cell.is_empty() {
            out.push(MISSING);
            continue;
        }
        let val: f64 = cell
            .parse()
            .with_context(|| format!("row {} column {column:?} is not f64: {cell}", idx + 1))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("column {column:?} has no rows");
    }
    Ok(out)
}
