//! Per-section sequence counters.
//!
//! A counter holds how many registration numbers a section has issued. The
//! allocator's only mutation is [`CounterStore::increment_and_get`], which
//! performs the read, the increment, and the write inside one redb write
//! transaction. redb serializes write transactions, so two callers can never
//! observe the same post-increment value.

use std::sync::Arc;

use exam_registry_types::error::{InternalSnafu, RegistryError, StoreUnavailableSnafu};
use exam_registry_types::{Result, SectionKey};
use redb::{Database, ReadableTable};
use snafu::{OptionExt, ResultExt, Snafu};

use crate::tables::Tables;

/// Errors raised by the redb counter store.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CounterError {
    #[snafu(display("Transaction error: {source}"))]
    Transaction { source: redb::TransactionError },

    #[snafu(display("Table error: {source}"))]
    Table { source: redb::TableError },

    #[snafu(display("Storage error: {source}"))]
    Storage { source: redb::StorageError },

    #[snafu(display("Commit error: {source}"))]
    Commit { source: redb::CommitError },

    #[snafu(display("Counter for section {section} overflowed"))]
    Overflow { section: SectionKey },
}

impl From<CounterError> for RegistryError {
    #[track_caller]
    fn from(err: CounterError) -> Self {
        let message = err.to_string();
        match err {
            CounterError::Overflow { .. } => InternalSnafu { message }.build(),
            _ => StoreUnavailableSnafu { message }.build(),
        }
    }
}

/// Durable per-section counters.
///
/// Implementations must make `increment_and_get` a single atomic
/// read-modify-write against the persisted value, visible to every process
/// sharing the store.
pub trait CounterStore: Send + Sync {
    /// Atomically adds one to the section's counter and returns the new value.
    ///
    /// A missing counter is created at zero first, so the first call returns 1.
    fn increment_and_get(&self, section: &SectionKey) -> Result<u64>;

    /// Raises the counter to `candidate` if that is higher than the stored
    /// value (a missing counter counts as zero). Never lowers it.
    ///
    /// Returns `(prior, resulting)`: the stored value before the operation
    /// (`None` if the counter did not exist) and the value after it, both
    /// observed inside the same transaction.
    fn set_if_higher(&self, section: &SectionKey, candidate: u64) -> Result<(Option<u64>, u64)>;

    /// Current counter value, `None` if the section was never counted.
    fn read(&self, section: &SectionKey) -> Result<Option<u64>>;

    /// Every stored counter, ordered by section name.
    fn list(&self) -> Result<Vec<(SectionKey, u64)>>;
}

impl<C: CounterStore + ?Sized> CounterStore for Arc<C> {
    fn increment_and_get(&self, section: &SectionKey) -> Result<u64> {
        (**self).increment_and_get(section)
    }

    fn set_if_higher(&self, section: &SectionKey, candidate: u64) -> Result<(Option<u64>, u64)> {
        (**self).set_if_higher(section, candidate)
    }

    fn read(&self, section: &SectionKey) -> Result<Option<u64>> {
        (**self).read(section)
    }

    fn list(&self) -> Result<Vec<(SectionKey, u64)>> {
        (**self).list()
    }
}

/// Counter store backed by the `counters` redb table.
#[derive(Clone)]
pub struct RedbCounterStore {
    db: Arc<Database>,
}

impl RedbCounterStore {
    /// Wraps a database whose tables were created by the storage engine.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn increment(&self, section: &SectionKey) -> std::result::Result<u64, CounterError> {
        let txn = self.db.begin_write().context(TransactionSnafu)?;
        let next = {
            let mut table = txn.open_table(Tables::COUNTERS).context(TableSnafu)?;
            let current =
                table.get(section.as_str()).context(StorageSnafu)?.map(|v| v.value()).unwrap_or(0);
            let next =
                current.checked_add(1).context(OverflowSnafu { section: section.clone() })?;
            table.insert(section.as_str(), next).context(StorageSnafu)?;
            next
        };
        txn.commit().context(CommitSnafu)?;
        Ok(next)
    }

    fn raise(
        &self,
        section: &SectionKey,
        candidate: u64,
    ) -> std::result::Result<(Option<u64>, u64), CounterError> {
        let txn = self.db.begin_write().context(TransactionSnafu)?;
        let (prior, resulting) = {
            let mut table = txn.open_table(Tables::COUNTERS).context(TableSnafu)?;
            let prior = table.get(section.as_str()).context(StorageSnafu)?.map(|v| v.value());
            let resulting = prior.unwrap_or(0).max(candidate);
            if prior != Some(resulting) {
                table.insert(section.as_str(), resulting).context(StorageSnafu)?;
            }
            (prior, resulting)
        };
        txn.commit().context(CommitSnafu)?;

        if prior != Some(resulting) {
            tracing::debug!(section = %section, ?prior, resulting, "Counter raised");
        }
        Ok((prior, resulting))
    }

    fn get(&self, section: &SectionKey) -> std::result::Result<Option<u64>, CounterError> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::COUNTERS).context(TableSnafu)?;
        let value = table.get(section.as_str()).context(StorageSnafu)?.map(|v| v.value());
        Ok(value)
    }

    fn all(&self) -> std::result::Result<Vec<(SectionKey, u64)>, CounterError> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::COUNTERS).context(TableSnafu)?;

        let mut counters = Vec::new();
        for entry in table.iter().context(StorageSnafu)? {
            let (key, value) = entry.context(StorageSnafu)?;
            counters.push((SectionKey::new(key.value()), value.value()));
        }
        Ok(counters)
    }
}

impl CounterStore for RedbCounterStore {
    fn increment_and_get(&self, section: &SectionKey) -> Result<u64> {
        let value = self.increment(section)?;
        tracing::trace!(section = %section, value, "Counter incremented");
        Ok(value)
    }

    fn set_if_higher(&self, section: &SectionKey, candidate: u64) -> Result<(Option<u64>, u64)> {
        Ok(self.raise(section, candidate)?)
    }

    fn read(&self, section: &SectionKey) -> Result<Option<u64>> {
        Ok(self.get(section)?)
    }

    fn list(&self) -> Result<Vec<(SectionKey, u64)>> {
        Ok(self.all()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::engine::StorageEngine;

    fn store() -> RedbCounterStore {
        StorageEngine::open_in_memory().expect("open in-memory engine").counters()
    }

    #[test]
    fn test_first_increment_returns_one() {
        let counters = store();
        let section = SectionKey::new("primary");
        assert_eq!(counters.read(&section).unwrap(), None);
        assert_eq!(counters.increment_and_get(&section).unwrap(), 1);
        assert_eq!(counters.increment_and_get(&section).unwrap(), 2);
        assert_eq!(counters.read(&section).unwrap(), Some(2));
    }

    #[test]
    fn test_sections_are_independent() {
        let counters = store();
        let a = SectionKey::new("a");
        let b = SectionKey::new("b");
        counters.increment_and_get(&a).unwrap();
        counters.increment_and_get(&a).unwrap();
        counters.increment_and_get(&b).unwrap();
        assert_eq!(counters.read(&a).unwrap(), Some(2));
        assert_eq!(counters.read(&b).unwrap(), Some(1));
    }

    #[test]
    fn test_set_if_higher_never_lowers() {
        let counters = store();
        let section = SectionKey::new("advanced");
        assert_eq!(counters.set_if_higher(&section, 500).unwrap(), (None, 500));
        assert_eq!(counters.set_if_higher(&section, 10).unwrap(), (Some(500), 500));
        assert_eq!(counters.read(&section).unwrap(), Some(500));
    }

    #[test]
    fn test_set_if_higher_creates_missing_counter_at_zero() {
        let counters = store();
        let section = SectionKey::new("intermediate");
        assert_eq!(counters.set_if_higher(&section, 0).unwrap(), (None, 0));
        assert_eq!(counters.read(&section).unwrap(), Some(0));
        assert_eq!(counters.increment_and_get(&section).unwrap(), 1);
    }

    #[test]
    fn test_list_orders_by_section_name() {
        let counters = store();
        counters.set_if_higher(&SectionKey::new("b"), 3).unwrap();
        counters.set_if_higher(&SectionKey::new("a"), 7).unwrap();
        assert_eq!(
            counters.list().unwrap(),
            vec![(SectionKey::new("a"), 7), (SectionKey::new("b"), 3)]
        );
    }

    #[test]
    fn test_overflow_is_internal_error() {
        let counters = store();
        let section = SectionKey::new("full");
        counters.set_if_higher(&section, u64::MAX).unwrap();
        let err = counters.increment_and_get(&section).expect_err("overflow");
        assert!(matches!(err, RegistryError::Internal { .. }));
        assert_eq!(counters.read(&section).unwrap(), Some(u64::MAX));
    }

    #[test]
    fn test_concurrent_increments_are_distinct_and_contiguous() {
        let counters = Arc::new(store());
        let section = SectionKey::new("primary");
        let threads = 8;
        let per_thread = 50;

        let values: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let counters = Arc::clone(&counters);
                    let section = section.clone();
                    scope.spawn(move || {
                        (0..per_thread)
                            .map(|_| counters.increment_and_get(&section).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        let distinct: HashSet<u64> = values.iter().copied().collect();
        let total = (threads * per_thread) as u64;
        assert_eq!(distinct.len() as u64, total);
        assert_eq!(distinct, (1..=total).collect::<HashSet<_>>());
    }

    #[test]
    fn test_set_if_higher_reports_prior_from_same_transaction() {
        let counters = store();
        let section = SectionKey::new("primary");
        counters.increment_and_get(&section).unwrap();
        counters.increment_and_get(&section).unwrap();
        assert_eq!(counters.set_if_higher(&section, 7).unwrap(), (Some(2), 7));
        assert_eq!(counters.set_if_higher(&section, 7).unwrap(), (Some(7), 7));
    }

    #[test]
    fn test_concurrent_raise_and_increment_report_consistent_prior() {
        let counters = Arc::new(store());
        let section = SectionKey::new("primary");
        let increments = 200u64;

        let raises: Vec<(Option<u64>, u64)> = std::thread::scope(|scope| {
            let incrementer = {
                let counters = Arc::clone(&counters);
                let section = section.clone();
                scope.spawn(move || {
                    for _ in 0..increments {
                        counters.increment_and_get(&section).unwrap();
                    }
                })
            };
            let raiser = {
                let counters = Arc::clone(&counters);
                let section = section.clone();
                scope.spawn(move || {
                    (0..50)
                        .map(|_| counters.set_if_higher(&section, 100).unwrap())
                        .collect::<Vec<_>>()
                })
            };
            incrementer.join().unwrap();
            raiser.join().unwrap()
        });

        for (prior, resulting) in raises {
            assert_eq!(resulting, prior.unwrap_or(0).max(100));
        }
        let last = counters.read(&section).unwrap().unwrap();
        assert!(last >= increments);
    }

    proptest! {
        #[test]
        fn prop_set_if_higher_is_max(candidates in proptest::collection::vec(0u64..10_000, 1..20)) {
            let counters = store();
            let section = SectionKey::new("s");
            for &candidate in &candidates {
                counters.set_if_higher(&section, candidate).unwrap();
            }
            let expected = candidates.iter().copied().max().unwrap_or(0);
            prop_assert_eq!(counters.read(&section).unwrap(), Some(expected));
        }
    }
}
