//! Append-only result store for completed pipeline runs.

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Error raised by a result store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A record for this run id was already appended.
    #[error("run {0} already has a recorded result")]
    DuplicateRun(Uuid),

    /// The backing medium rejected the write.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A terminal pipeline artifact, keyed by the run that produced it and by
/// its own record identity.
pub trait TerminalRecord: Clone + Send + Sync + 'static {
    /// Identifier of the pipeline run that produced this record.
    fn run_id(&self) -> Uuid;

    /// The record's own identifier.
    fn record_id(&self) -> Uuid;
}

/// Durable, append-only registry of completed runs' output.
///
/// The store only ever gains entries; existing entries are never mutated
/// or removed.
pub trait ResultStore<T: TerminalRecord>: Send + Sync {
    /// Appends one record in completion order.
    ///
    /// At most one record per run id is admitted; appends are serialized
    /// internally so the order invariant holds under concurrency.
    fn append(&self, record: T) -> Result<(), StoreError>;

    /// All records in append order, as a consistent snapshot.
    fn list(&self) -> Vec<T>;

    /// Looks a record up by run id or by record id.
    fn get(&self, id: Uuid) -> Option<T>;
}

/// In-memory reference store. Append never fails beyond the duplicate-run
/// guard.
pub struct MemoryResultStore<T> {
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    records: Vec<T>,
    by_run: HashMap<Uuid, usize>,
    by_record: HashMap<Uuid, usize>,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            by_run: HashMap::new(),
            by_record: HashMap::new(),
        }
    }
}

impl<T> Default for MemoryResultStore<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl<T> MemoryResultStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }
}

impl<T> std::fmt::Debug for MemoryResultStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryResultStore")
            .field("len", &self.len())
            .finish()
    }
}

impl<T: TerminalRecord> ResultStore<T> for MemoryResultStore<T> {
    fn append(&self, record: T) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.by_run.contains_key(&record.run_id()) {
            return Err(StoreError::DuplicateRun(record.run_id()));
        }

        let index = inner.records.len();
        inner.by_run.insert(record.run_id(), index);
        inner.by_record.insert(record.record_id(), index);
        inner.records.push(record);
        Ok(())
    }

    fn list(&self) -> Vec<T> {
        self.inner.read().records.clone()
    }

    fn get(&self, id: Uuid) -> Option<T> {
        let inner = self.inner.read();
        inner
            .by_run
            .get(&id)
            .or_else(|| inner.by_record.get(&id))
            .map(|&index| inner.records[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Receipt {
        run: Uuid,
        id: Uuid,
    }

    impl Receipt {
        fn new() -> Self {
            Self {
                run: Uuid::new_v4(),
                id: Uuid::new_v4(),
            }
        }
    }

    impl TerminalRecord for Receipt {
        fn run_id(&self) -> Uuid {
            self.run
        }

        fn record_id(&self) -> Uuid {
            self.id
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let store = MemoryResultStore::new();
        let first = Receipt::new();
        let second = Receipt::new();

        store.append(first.clone()).expect("append");
        store.append(second.clone()).expect("append");

        assert_eq!(store.list(), vec![first, second]);
    }

    #[test]
    fn test_get_by_run_or_record_id() {
        let store = MemoryResultStore::new();
        let receipt = Receipt::new();
        store.append(receipt.clone()).expect("append");

        assert_eq!(store.get(receipt.run), Some(receipt.clone()));
        assert_eq!(store.get(receipt.id), Some(receipt));
        assert_eq!(store.get(Uuid::new_v4()), None);
    }

    #[test]
    fn test_duplicate_run_rejected() {
        let store = MemoryResultStore::new();
        let receipt = Receipt::new();
        store.append(receipt.clone()).expect("append");

        let duplicate = Receipt {
            run: receipt.run,
            id: Uuid::new_v4(),
        };
        let err = store.append(duplicate).expect_err("must reject");
        assert_eq!(err, StoreError::DuplicateRun(receipt.run));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_appends_all_land() {
        let store = std::sync::Arc::new(MemoryResultStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.append(Receipt::new()).expect("append"))
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }

        assert_eq!(store.len(), 16);
    }
}
