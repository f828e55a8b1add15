//! Per-candidate pipeline stages.
//!
//! Each stage wraps one step of the screening state machine: [`convert`] drives the
//! external format converter, [`dock`] drives the docking engine and reads its score,
//! and [`triage`] decides which artifacts survive. Stages are synchronous and hold no
//! state of their own beyond their configuration, so one instance is shared by every
//! worker of a job.

pub mod convert;
pub mod dock;
pub mod triage;

/// Maximum number of characters of tool output kept in a failure diagnostic.
pub const DIAGNOSTIC_EXCERPT_CHARS: usize = 240;
