//! Cache-aside storage for parse outcomes, keyed by message id.
//!
//! An outcome is either a [`TransactionRecord`] or `None`, meaning "already
//! processed, no transaction". `None` is a real cached value: `has` returns
//! `true` for it and the message is never fetched again.

pub mod file;
pub mod memory;

use crate::error::Result;
use crate::model::transaction::TransactionRecord;

/// Persistence contract for parse outcomes.
///
/// Values are deterministic functions of immutable messages, so overwriting
/// an entry is always safe and concurrent writers at worst duplicate work.
pub trait TransactionCache: Send + Sync {
    /// Whether an outcome is stored for `id`.
    fn has(&self, id: &str) -> bool;

    /// The stored outcome.
    ///
    /// Fails with [`CheckerError::NotFound`](crate::error::CheckerError::NotFound)
    /// when `has(id)` is false.
    fn get(&self, id: &str) -> Result<Option<TransactionRecord>>;

    /// Store the outcome for `id`, replacing any previous one.
    fn save(&self, id: &str, outcome: Option<&TransactionRecord>) -> Result<()>;

    /// Remove the entry for `id`; fails with `NotFound` if there is none.
    fn delete(&self, id: &str) -> Result<()>;

    /// Hint that `ids` are about to be read.
    ///
    /// Backends with bulk I/O may warm up here. Never changes what `has` or
    /// `get` return.
    fn preload(&self, _ids: &[String]) {}
}

impl<T: TransactionCache + ?Sized> TransactionCache for Box<T> {
    fn has(&self, id: &str) -> bool {
        (**self).has(id)
    }

    fn get(&self, id: &str) -> Result<Option<TransactionRecord>> {
        (**self).get(id)
    }

    fn save(&self, id: &str, outcome: Option<&TransactionRecord>) -> Result<()> {
        (**self).save(id, outcome)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }

    fn preload(&self, ids: &[String]) {
        (**self).preload(ids)
    }
}

impl<T: TransactionCache + ?Sized> TransactionCache for &T {
    fn has(&self, id: &str) -> bool {
        (**self).has(id)
    }

    fn get(&self, id: &str) -> Result<Option<TransactionRecord>> {
        (**self).get(id)
    }

    fn save(&self, id: &str, outcome: Option<&TransactionRecord>) -> Result<()> {
        (**self).save(id, outcome)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }

    fn preload(&self, ids: &[String]) {
        (**self).preload(ids)
    }
}
