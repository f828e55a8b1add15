use crate::core::models::result::AffinityResult;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Name of the per-output-directory score report.
pub const SCORES_FILE_NAME: &str = "scores.csv";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Appends scored candidates to a CSV report, writing the header only for a new file.
pub fn append_results(path: &Path, results: &[AffinityResult]) -> Result<(), ReportError> {
    if results.is_empty() {
        return Ok(());
    }

    let write_header = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => return Err(e.into()),
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}
