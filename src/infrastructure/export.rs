//! Product table export
//!
//! Serializes the accumulated product records to a CSV file, overwriting any
//! prior file at the path. The column order is the field declaration order
//! of [`ProductRecord`].

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::ProductRecord;

/// Write all records to `path`.
pub fn write_records(path: &Path, records: &[ProductRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .context("failed to serialize product record")?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush output file {}", path.display()))?;
    info!("Saved {} rows -> {}", records.len(), path.display());
    Ok(())
}
