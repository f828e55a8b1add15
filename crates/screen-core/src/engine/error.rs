use super::config::ConfigError;
use super::ledger::LedgerError;
use crate::core::io::archive::ArchiveError;
use crate::core::models::candidate::CandidateError;
use crate::engine::tasks::convert::ConvertError;
use crate::engine::tasks::dock::DockError;
use crate::engine::tasks::triage::TriageError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that end a screening job. Per-candidate problems never surface here; they
/// are tallied as failed candidates instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to read archive '{path}': {source}", path = .path.display())]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("Checkpoint ledger unavailable: {0}")]
    LedgerUnavailable(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to prepare '{path}': {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

/// Reasons a single candidate ends in the `Failed` state. None of them stop the batch.
///
/// Only `Triage` happens after the ledger entry was written; every other failure leaves
/// the candidate unrecorded, so it is retried on the next run.
#[derive(Debug, Error)]
pub enum CandidateFailure {
    #[error(transparent)]
    Unidentified(#[from] CandidateError),

    #[error(transparent)]
    Conversion(#[from] ConvertError),

    #[error(transparent)]
    Docking(#[from] DockError),

    #[error("Scored {affinity} but its artifacts could not be triaged: {source}")]
    Triage {
        affinity: f64,
        #[source]
        source: TriageError,
    },
}

impl CandidateFailure {
    /// Whether the candidate's affinity reached the ledger before it failed.
    pub fn is_recorded(&self) -> bool {
        matches!(self, CandidateFailure::Triage { .. })
    }
}
