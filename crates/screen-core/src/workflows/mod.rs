//! # Workflows Module
//!
//! Top-level entry points of the library. A workflow wires the engine's collaborators
//! together for one unit of work and reports progress while it runs.
//!
//! - **Screening Workflow** ([`screen`]) - Screens every candidate of one archive:
//!   ledger check, conversion, docking, ledger record, triage and delivery, under a
//!   bounded worker pool.
//! - **Conversion Workflow** ([`convert`]) - Converts every candidate of one archive into
//!   dock-ready files and stops there.

pub mod convert;
pub mod screen;

use crate::engine::error::EngineError;
use std::fs;
use std::path::Path;

/// Dedicated pool so a job never runs more than `parallelism` candidates at once.
fn worker_pool(parallelism: usize, name: &'static str) -> Result<rayon::ThreadPool, EngineError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.max(1))
        .thread_name(move |i| format!("{}-worker-{}", name, i))
        .build()
        .map_err(|e| EngineError::Internal(format!("failed to start worker pool: {}", e)))
}

/// Creates a job directory; concurrent creators of the same path all succeed.
fn create_dir(path: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })
}
