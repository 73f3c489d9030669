//! Process-local transaction cache.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{CheckerError, Result};
use crate::model::transaction::TransactionRecord;

use super::TransactionCache;

/// A [`TransactionCache`] backed by a `HashMap`; nothing outlives the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Option<TransactionRecord>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored outcomes, sentinels included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Option<TransactionRecord>>> {
        // Entries are replaced whole, so a panicked writer cannot leave one half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionCache for MemoryCache {
    fn has(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    fn get(&self, id: &str) -> Result<Option<TransactionRecord>> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| CheckerError::NotFound(id.to_string()))
    }

    fn save(&self, id: &str, outcome: Option<&TransactionRecord>) -> Result<()> {
        self.lock().insert(id.to_string(), outcome.cloned());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CheckerError::NotFound(id.to_string()))
    }
}
