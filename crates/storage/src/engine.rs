//! redb storage engine wrapper.
//!
//! Provides a thin wrapper around redb with:
//! - Database lifecycle management (file-backed or in-memory)
//! - Table creation on open, so read transactions never see a missing table
//! - Constructors for the counter and student stores sharing one handle

use std::sync::Arc;

use exam_registry_types::config::StorageConfig;
use exam_registry_types::error::{RegistryError, StoreUnavailableSnafu};
use redb::backends::InMemoryBackend;
use redb::Database;
use snafu::{ResultExt, Snafu};

use crate::counter::RedbCounterStore;
use crate::student::StudentStore;
use crate::tables::Tables;

/// Error context for engine lifecycle operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineError {
    #[snafu(display("Failed to open database at {path}: {source}"))]
    Open {
        path: String,
        source: redb::DatabaseError,
    },

    #[snafu(display("Transaction error: {source}"))]
    Transaction { source: redb::TransactionError },

    #[snafu(display("Table error: {source}"))]
    Table { source: redb::TableError },

    #[snafu(display("Commit error: {source}"))]
    Commit { source: redb::CommitError },
}

impl From<EngineError> for RegistryError {
    #[track_caller]
    fn from(err: EngineError) -> Self {
        StoreUnavailableSnafu { message: err.to_string() }.build()
    }
}

/// Storage engine backed by redb.
///
/// redb admits a single write transaction at a time and holds an exclusive
/// lock on the database file, so every read-modify-write done inside one
/// write transaction is atomic with respect to all other writers.
#[derive(Clone)]
pub struct StorageEngine {
    db: Arc<Database>,
}

impl StorageEngine {
    /// Open or create a database file.
    pub fn open(config: &StorageConfig) -> Result<Self, EngineError> {
        let path = &config.path;
        let mut builder = Database::builder();
        builder.set_cache_size(config.cache_size_bytes);
        let db = builder
            .create(path)
            .context(OpenSnafu { path: path.display().to_string() })?;

        tracing::debug!(path = %path.display(), "Opened registry database");
        Self::initialize(db)
    }

    /// Create a new in-memory database.
    pub fn open_in_memory() -> Result<Self, EngineError> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .context(OpenSnafu { path: ":memory:" })?;

        Self::initialize(db)
    }

    fn initialize(db: Database) -> Result<Self, EngineError> {
        let txn = db.begin_write().context(TransactionSnafu)?;
        {
            txn.open_table(Tables::COUNTERS).context(TableSnafu)?;
            txn.open_table(Tables::STUDENTS).context(TableSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a clone of the database handle.
    pub fn db(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }

    /// Counter store sharing this engine's database.
    pub fn counters(&self) -> RedbCounterStore {
        RedbCounterStore::new(self.db())
    }

    /// Student store sharing this engine's database.
    pub fn students(&self) -> StudentStore {
        StudentStore::new(self.db())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use exam_registry_test_utils::TestDir;
    use exam_registry_types::SectionKey;
    use redb::ReadableTable;

    use super::*;
    use crate::counter::CounterStore;

    #[test]
    fn test_open_in_memory_creates_tables() {
        let engine = StorageEngine::open_in_memory().expect("should open");
        let db = engine.db();
        let read = db.begin_read().expect("should begin read");
        let counters = read.open_table(Tables::COUNTERS).expect("counters table exists");
        assert!(counters.iter().expect("iter").next().is_none());
        read.open_table(Tables::STUDENTS).expect("students table exists");
    }

    #[test]
    fn test_counters_survive_reopen() {
        let dir = TestDir::new();
        let config = StorageConfig::builder().path(dir.join("registry.redb")).build().unwrap();
        let section = SectionKey::new("primary");

        {
            let engine = StorageEngine::open(&config).expect("should open");
            let counters = engine.counters();
            counters.increment_and_get(&section).unwrap();
            counters.increment_and_get(&section).unwrap();
        }

        let engine = StorageEngine::open(&config).expect("should reopen");
        assert_eq!(engine.counters().read(&section).unwrap(), Some(2));
    }

    #[test]
    fn test_second_open_of_same_file_is_store_unavailable() {
        let dir = TestDir::new();
        let config = StorageConfig::builder().path(dir.join("registry.redb")).build().unwrap();

        let _first = StorageEngine::open(&config).expect("should open");
        let err = StorageEngine::open(&config).err().expect("file is locked");
        let err: RegistryError = err.into();
        assert!(matches!(err, RegistryError::StoreUnavailable { .. }));
        assert!(err.is_retryable());
    }
}
