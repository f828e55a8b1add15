use super::error::CandidateFailure;
use super::tasks::convert::ConvertedPaths;
use super::tasks::dock::DockReport;
use crate::core::models::result::{AffinityResult, OutcomeKind};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Lifecycle of one candidate inside a worker.
///
/// `Pending → (SkippedAlreadyDone | Converting → Converted → Docking → Scored → Triaged) | Failed`
#[derive(Debug)]
pub enum CandidateState {
    Pending,
    SkippedAlreadyDone,
    Converting,
    Converted(ConvertedPaths),
    Docking(ConvertedPaths),
    Scored(DockReport),
    Triaged(AffinityResult),
    Failed(CandidateFailure),
}

impl CandidateState {
    pub fn name(&self) -> &'static str {
        match self {
            CandidateState::Pending => "pending",
            CandidateState::SkippedAlreadyDone => "skipped-already-done",
            CandidateState::Converting => "converting",
            CandidateState::Converted(_) => "converted",
            CandidateState::Docking(_) => "docking",
            CandidateState::Scored(_) => "scored",
            CandidateState::Triaged(_) => "triaged",
            CandidateState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CandidateState::SkippedAlreadyDone
                | CandidateState::Triaged(_)
                | CandidateState::Failed(_)
        )
    }

    /// Tally bucket of a terminal state.
    pub fn outcome(&self) -> Option<OutcomeKind> {
        match self {
            CandidateState::SkippedAlreadyDone => Some(OutcomeKind::Skipped),
            CandidateState::Triaged(result) => Some(result.outcome.into()),
            CandidateState::Failed(_) => Some(OutcomeKind::Failed),
            _ => None,
        }
    }
}

/// Running per-job counts, updated concurrently by every worker.
#[derive(Debug, Default)]
pub struct Tally {
    skipped: AtomicUsize,
    discarded: AtomicUsize,
    promoted: AtomicUsize,
    failed: AtomicUsize,
}

impl Tally {
    pub fn record(&self, outcome: OutcomeKind) -> TallySnapshot {
        let counter = match outcome {
            OutcomeKind::Skipped => &self.skipped,
            OutcomeKind::Discarded => &self.discarded,
            OutcomeKind::Promoted => &self.promoted,
            OutcomeKind::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.snapshot()
    }

    pub fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            skipped: self.skipped.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            promoted: self.promoted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TallySnapshot {
    pub skipped: usize,
    pub discarded: usize,
    pub promoted: usize,
    pub failed: usize,
}

impl TallySnapshot {
    pub fn total(&self) -> usize {
        self.skipped + self.discarded + self.promoted + self.failed
    }
}

impl fmt::Display for TallySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} promoted, {} discarded, {} skipped, {} failed",
            self.promoted, self.discarded, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub candidate: String,
    pub reason: String,
}

/// Everything a finished job reports back to its caller.
#[derive(Debug, Clone)]
pub struct ScreeningSummary {
    pub archive: PathBuf,
    pub tally: TallySnapshot,
    /// Candidates docked during this job, in completion order.
    pub results: Vec<AffinityResult>,
    pub failures: Vec<FailureRecord>,
    /// Recorded candidates whose artifacts could not be triaged; also counted as failed.
    pub triage_errors: usize,
    pub delivery_failures: usize,
    /// Why `scores.csv` could not be appended, if it could not. The ledger is unaffected.
    pub report_error: Option<String>,
    /// A stop request left part of the archive unread.
    pub stopped_early: bool,
}

impl ScreeningSummary {
    pub fn promoted_ids(&self) -> BTreeSet<String> {
        self.results
            .iter()
            .filter(|r| OutcomeKind::from(r.outcome) == OutcomeKind::Promoted)
            .map(|r| r.id.clone())
            .collect()
    }
}

/// Outcome of a conversion-only job.
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub archive: PathBuf,
    pub output_dir: PathBuf,
    pub converted: usize,
    /// Records whose identifier repeats one already converted by this job.
    pub duplicates: usize,
    pub failures: Vec<FailureRecord>,
    pub stopped_early: bool,
}

/// Cooperative stop request shared between the caller and a running job.
///
/// Workers check it before taking a new candidate; a candidate already in flight always
/// runs to completion, ledger write included.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
