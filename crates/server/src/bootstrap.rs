//! Opens the registry: storage engine, sequence policy, and the services
//! built on them.

use std::sync::Arc;

use exam_registry_allocator::{Allocator, EnrollmentService, Initializer, Reconciler};
use exam_registry_storage::{RedbCounterStore, StorageEngine, StudentStore};
use exam_registry_types::config::SequenceConfig;
use exam_registry_types::{RegistryError, SequencePolicy};

use crate::config::Config;

/// Error type for bootstrap operations.
#[derive(Debug)]
pub enum BootstrapError {
    /// Failed to create the database directory or an in-memory database.
    Database(String),
    /// The database could not be opened, typically because another process
    /// holds it. Retryable.
    Store(RegistryError),
    /// The sequence policy is invalid.
    Policy(String),
}

impl std::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapError::Database(msg) => write!(f, "database error: {msg}"),
            BootstrapError::Store(e) => write!(f, "[{}] {e}", e.code()),
            BootstrapError::Policy(msg) => write!(f, "policy error: {msg}"),
        }
    }
}

impl std::error::Error for BootstrapError {}

/// An opened registry.
#[derive(Clone)]
pub struct Registry {
    engine: StorageEngine,
    policy: Arc<SequencePolicy>,
}

impl Registry {
    /// Opens (creating if needed) the database configured in `config`.
    pub fn open(config: &Config) -> Result<Self, BootstrapError> {
        let policy = build_policy(&config.sequence)?;

        let path = &config.storage.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BootstrapError::Database(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let engine = StorageEngine::open(&config.storage)
            .map_err(|e| BootstrapError::Store(RegistryError::from(e)))?;

        tracing::info!(
            path = %path.display(),
            sections = config.sequence.sections.len(),
            "Registry opened"
        );
        Ok(Self { engine, policy })
    }

    /// Opens a throwaway in-memory registry.
    pub fn open_in_memory(sequence: &SequenceConfig) -> Result<Self, BootstrapError> {
        let policy = build_policy(sequence)?;
        let engine =
            StorageEngine::open_in_memory().map_err(|e| BootstrapError::Database(e.to_string()))?;
        Ok(Self { engine, policy })
    }

    /// The sequence policy.
    pub fn policy(&self) -> &SequencePolicy {
        &self.policy
    }

    /// Counter store.
    pub fn counters(&self) -> RedbCounterStore {
        self.engine.counters()
    }

    /// Student store.
    pub fn students(&self) -> StudentStore {
        self.engine.students()
    }

    /// Allocator over the persistent counters.
    pub fn allocator(&self) -> Allocator<RedbCounterStore> {
        Allocator::new(Arc::clone(&self.policy), self.counters())
    }

    /// Reconciler checking counters against stored students.
    pub fn reconciler(&self) -> Reconciler<RedbCounterStore, StudentStore> {
        Reconciler::new(Arc::clone(&self.policy), self.counters(), self.students())
    }

    /// First-deployment initializer.
    pub fn initializer(&self) -> Initializer<RedbCounterStore, StudentStore> {
        Initializer::new(self.reconciler())
    }

    /// Enrollment service sharing this registry's allocator and student store.
    pub fn enrollment(&self) -> EnrollmentService<RedbCounterStore> {
        EnrollmentService::new(self.allocator(), self.students())
    }
}

fn build_policy(sequence: &SequenceConfig) -> Result<Arc<SequencePolicy>, BootstrapError> {
    SequencePolicy::from_config(sequence)
        .map(Arc::new)
        .map_err(|e| BootstrapError::Policy(e.to_string()))
}
