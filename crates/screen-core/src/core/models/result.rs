use serde::Serialize;
use std::fmt;

/// What happened to a docked candidate's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Discarded,
    Promoted,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Discarded => write!(f, "discarded"),
            Verdict::Promoted => write!(f, "promoted"),
        }
    }
}

/// A candidate that made it through docking.
///
/// Affinities follow the screening sign convention: larger positive values are
/// stronger predicted binders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffinityResult {
    pub id: String,
    pub affinity: f64,
    pub outcome: Verdict,
}

/// Terminal classification of a candidate, used for the job tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Skipped,
    Discarded,
    Promoted,
    Failed,
}

impl From<Verdict> for OutcomeKind {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Discarded => OutcomeKind::Discarded,
            Verdict::Promoted => OutcomeKind::Promoted,
        }
    }
}
