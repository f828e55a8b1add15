//! # DockScreen Core Library
//!
//! A checkpointed, parallel virtual screening pipeline. Candidate ligands are streamed
//! out of (compressed) multi-record archives, converted into a dock-ready format by an
//! external conversion tool, docked against a fixed receptor by an external docking
//! engine, and triaged by predicted affinity: weak binders are deleted, strong binders
//! are promoted into a durable `binders/` directory.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Candidate`, `AffinityResult`),
//!   archive splitting, score reports, and the narrow process-invocation contract used
//!   to talk to external tools.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the checkpoint ledger, delivery
//!   providers, progress reporting, and the per-candidate stages (`convert`, `dock`,
//!   `triage`).
//!
//! - **[`workflows`]: The Public API.** The screening orchestrator that runs the stages
//!   for every candidate of an archive under a bounded worker pool.

pub mod core;
pub mod engine;
pub mod workflows;
