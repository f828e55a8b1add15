use super::state::TallySnapshot;
use crate::core::models::result::OutcomeKind;

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: String },
    PhaseFinish,

    /// A job is about to process `total` candidates.
    TaskStart { total: u64 },
    /// One candidate was handled by a job that keeps no running tally.
    TaskIncrement,
    /// One candidate reached a terminal state; `tally` holds the job's running counts.
    CandidateFinished {
        id: String,
        outcome: OutcomeKind,
        tally: TallySnapshot,
    },
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
