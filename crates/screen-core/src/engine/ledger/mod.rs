//! # Checkpoint Ledger
//!
//! The ledger records, per candidate identifier, that the candidate has been docked and
//! what affinity it scored. It is the single source of truth for "has this been
//! handled": an identifier present in the ledger is never processed again, by this run
//! or any later one against the same store.
//!
//! The pipeline depends only on the minimal [`LedgerStore`] contract (`exists`, `get`,
//! `set`). [`remote::RedisStore`] speaks it to an external Redis-compatible server;
//! [`memory::MemoryStore`] keeps everything in process.

pub mod memory;
pub mod remote;

use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("cannot reach ledger store at {address}: {reason}")]
    Unavailable { address: String, reason: String },

    #[error("ledger command for key '{key}' failed: {reason}")]
    Command { key: String, reason: String },

    #[error("ledger value for '{key}' is neither an affinity nor a known marker: '{value}'")]
    Corrupt { key: String, value: String },
}

/// Minimal key-value contract the ledger needs from its backing store.
///
/// Implementations must tolerate concurrent calls for distinct keys from many workers.
pub trait LedgerStore: Send + Sync {
    fn exists(&self, key: &str) -> Result<bool, LedgerError>;
    fn get(&self, key: &str) -> Result<Option<String>, LedgerError>;
    fn set(&self, key: &str, value: &str) -> Result<(), LedgerError>;

    /// Round-trips the store once; used to refuse starting a job without a ledger.
    fn ping(&self) -> Result<(), LedgerError>;

    /// Human-readable location of the store.
    fn describe(&self) -> String;
}

const DONE_MARKER: &str = "done";
const IN_PROGRESS_MARKER: &str = "in-progress";

/// Value stored for one candidate.
///
/// The pipeline only ever writes affinities. The sentinels are values other writers of a
/// shared store may leave behind; any of them counts as present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedgerEntry {
    Affinity(f64),
    Done,
    InProgress,
}

impl LedgerEntry {
    fn parse(key: &str, value: &str) -> Result<Self, LedgerError> {
        match value.trim() {
            DONE_MARKER => Ok(LedgerEntry::Done),
            IN_PROGRESS_MARKER => Ok(LedgerEntry::InProgress),
            other => other
                .parse::<f64>()
                .map(LedgerEntry::Affinity)
                .map_err(|_| LedgerError::Corrupt {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
        }
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEntry::Affinity(affinity) => write!(f, "{}", affinity),
            LedgerEntry::Done => write!(f, "{}", DONE_MARKER),
            LedgerEntry::InProgress => write!(f, "{}", IN_PROGRESS_MARKER),
        }
    }
}

pub struct Ledger {
    store: Box<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: impl LedgerStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn ensure_available(&self) -> Result<(), LedgerError> {
        self.store.ping()
    }

    /// Whether the candidate has an entry from this or any earlier run.
    pub fn has(&self, id: &str) -> Result<bool, LedgerError> {
        self.store.exists(id)
    }

    /// Stores the candidate's affinity. Called exactly once per docked candidate.
    pub fn record(&self, id: &str, affinity: f64) -> Result<(), LedgerError> {
        debug!(candidate = id, affinity, "Recording ledger entry.");
        self.store
            .set(id, &LedgerEntry::Affinity(affinity).to_string())
    }

    pub fn entry(&self, id: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        self.store
            .get(id)?
            .map(|value| LedgerEntry::parse(id, &value))
            .transpose()
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn recorded_affinities_are_visible_to_has_and_entry() {
        let store = MemoryStore::new();
        let ledger = Ledger::new(store.clone());

        assert!(!ledger.has("ZINC01").unwrap());
        ledger.record("ZINC01", 9.2).unwrap();

        assert!(ledger.has("ZINC01").unwrap());
        assert_eq!(
            ledger.entry("ZINC01").unwrap(),
            Some(LedgerEntry::Affinity(9.2))
        );
        assert_eq!(store.get("ZINC01").unwrap().as_deref(), Some("9.2"));
    }

    #[test]
    fn entries_written_by_an_earlier_ledger_are_seen_by_a_new_one() {
        let store = MemoryStore::new();
        Ledger::new(store.clone()).record("A", 3.0).unwrap();

        let reopened = Ledger::new(store);

        assert!(reopened.has("A").unwrap());
        assert_eq!(reopened.entry("A").unwrap(), Some(LedgerEntry::Affinity(3.0)));
    }

    #[test]
    fn sentinel_values_are_parsed() {
        let store = MemoryStore::new();
        store.set("A", "done").unwrap();
        store.set("B", "in-progress").unwrap();
        store.set("C", "not a number").unwrap();
        let ledger = Ledger::new(store);

        assert_eq!(ledger.entry("A").unwrap(), Some(LedgerEntry::Done));
        assert_eq!(ledger.entry("B").unwrap(), Some(LedgerEntry::InProgress));
        assert!(matches!(
            ledger.entry("C"),
            Err(LedgerError::Corrupt { .. })
        ));
        assert_eq!(ledger.entry("D").unwrap(), None);
    }

    #[test]
    fn zero_affinity_is_stored_without_a_sign() {
        let store = MemoryStore::new();
        Ledger::new(store.clone()).record("Z", 0.0).unwrap();

        assert_eq!(store.get("Z").unwrap().as_deref(), Some("0"));
    }
}
