//! # Engine Module
//!
//! Building blocks of the screening pipeline: job configuration, error taxonomy,
//! progress events, the checkpoint ledger, delivery providers, and the per-candidate
//! stages that the workflow layer strings together.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Screening job, tool, ledger and delivery settings
//! - **Error Handling** ([`error`]) - Job-fatal errors and per-candidate failures
//! - **Progress Monitoring** ([`progress`]) - Events emitted while a job runs
//! - **State Tracking** ([`state`]) - Candidate lifecycle, tallies, stop signal, summaries
//! - **Checkpoint Ledger** ([`ledger`]) - Durable record of candidates already docked
//! - **Delivery** ([`delivery`]) - Optional hand-off of promoted binders
//! - **Stages** ([`tasks`]) - Conversion, docking and triage of a single candidate
//!
//! Every shared collaborator (ledger, stages, delivery) is constructed once per run and
//! passed to workers by reference; nothing here lives in global state.

pub mod config;
pub mod delivery;
pub mod error;
pub mod ledger;
pub mod progress;
pub mod state;
pub mod tasks;
