//! File output: report text and CSV rows.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Write `text` to `path`, creating parent directories.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

/// Write serializable rows as CSV with a header derived from the field names.
///
/// With no rows, `header` is written on its own.
pub fn write_csv_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!rows.is_empty())
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    if rows.is_empty() {
        wtr.write_record(header)?;
    }
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}
