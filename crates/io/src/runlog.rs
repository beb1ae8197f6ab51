use std::fs::OpenOptions;
use std::path::Path;

use feedsync_recon::model::ReconSummary;
use serde::{Deserialize, Serialize};

use crate::error::IoError;

/// One line of the append-only run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub timestamp: String,
    pub incoming_rows: usize,
    pub master_rows: usize,
    pub adds: usize,
    pub removes: usize,
    pub updates: usize,
    pub product_rows: usize,
    pub metafield_rows: usize,
    pub status: String,
}

impl RunLogEntry {
    pub fn new(
        incoming_rows: usize,
        master_rows: usize,
        summary: &ReconSummary,
        product_rows: usize,
        metafield_rows: usize,
        status: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            incoming_rows,
            master_rows,
            adds: summary.adds,
            removes: summary.removes,
            updates: summary.updates,
            product_rows,
            metafield_rows,
            status: status.into(),
        }
    }
}

/// Append `entry` to the CSV log at `path`. The header row is written only
/// when the file is created.
pub fn append(path: &Path, entry: &RunLogEntry) -> Result<(), IoError> {
    let is_new = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| IoError::io(path, e))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(entry).map_err(|e| IoError::csv(path, e))?;
    writer.flush().map_err(|e| IoError::io(path, e))?;
    Ok(())
}

/// All entries of a run log.
pub fn read(path: &Path) -> Result<Vec<RunLogEntry>, IoError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| IoError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<RunLogEntry>, _>>()
        .map_err(|e| IoError::csv(path, e))
}
