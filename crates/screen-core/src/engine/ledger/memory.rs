use super::{LedgerError, LedgerStore};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-process ledger store. Clones share the same entries.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl LedgerStore for MemoryStore {
    fn exists(&self, key: &str) -> Result<bool, LedgerError> {
        Ok(self.entries.contains_key(key))
    }

    fn get(&self, key: &str) -> Result<Option<String>, LedgerError> {
        Ok(self.entries.get(key).map(|value| value.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_distinct_key_writes_do_not_interfere() {
        let store = MemoryStore::new();

        thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..100 {
                        store
                            .set(&format!("w{worker}-{i}"), &format!("{i}"))
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(store.len(), 800);
        assert_eq!(store.get("w3-42").unwrap().as_deref(), Some("42"));
    }
}
