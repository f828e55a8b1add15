//! # Core Module
//!
//! The fundamental building blocks of the screening pipeline: candidate models, archive
//! and report I/O, and the process-invocation contract for external tools.
//!
//! - **Models** ([`models`]) - Candidates, converted artifacts and scored results
//! - **File I/O** ([`io`]) - Splitting multi-record archives and writing score reports
//! - **Processes** ([`process`]) - The `ProcessRunner` seam between the pipeline and the
//!   conversion/docking executables

pub mod io;
pub mod models;
pub mod process;
