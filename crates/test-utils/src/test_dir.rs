//! Temporary directories for database files created by tests.

// Test utilities are expected to panic on failure - that's their purpose
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory removed when dropped.
///
/// # Example
///
/// ```
/// use exam_registry_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let db_path = dir.join("registry.redb");
/// assert!(db_path.starts_with(dir.path()));
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Create a new temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let inner = TempDir::new().expect("failed to create temp directory");
        Self { inner }
    }

    /// Returns the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Path of `name` inside the directory. Nothing is created on disk.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.inner.path().join(name)
    }

    /// Path of a fresh database file inside the directory.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.join("registry.redb")
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
