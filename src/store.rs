//! Catalog persistence.
//!
//! The catalog is read once at startup and rewritten whole after a
//! successful run; there are no partial updates. A missing file means an
//! empty catalog, an unreadable one is fatal.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::AggregatorError;
use crate::model::VersionCatalog;

pub fn load(path: &Path) -> Result<VersionCatalog> {
    if !path.exists() {
        return Ok(VersionCatalog::default());
    }
    let file =
        File::open(path).with_context(|| format!("failed to open catalog: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        AggregatorError::CorruptCatalog {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

pub fn save(path: &Path, catalog: &VersionCatalog) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to write catalog: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, catalog)
        .with_context(|| format!("failed to serialize catalog: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush catalog: {}", path.display()))?;
    Ok(())
}
