use crate::error::AppError;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    debug!(rows = rows.len(), "wrote {}", path.display());
    Ok(())
}

/// Write a header plus pre-rendered records; used where the column set is
/// only known at runtime.
pub fn write_records(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(header)?;
    for r in rows {
        wtr.write_record(r)?;
    }
    wtr.flush()?;
    debug!(rows = rows.len(), "wrote {}", path.display());
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Markdown table of the first `max_rows` rows, or `(no rows)`.
pub fn render_preview<T: Tabled>(rows: &[T], max_rows: usize) -> String {
    if rows.is_empty() || max_rows == 0 {
        return "(no rows)".to_string();
    }
    Table::new(rows.iter().take(max_rows))
        .with(Style::markdown())
        .to_string()
}
