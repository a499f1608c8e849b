//! Student records keyed by registration number.
//!
//! The `students` table is keyed by the registration number text, so the key
//! itself enforces uniqueness. Inserts check for an existing key inside the
//! same write transaction and refuse to overwrite.

use std::sync::Arc;

use exam_registry_types::error::{
    DuplicateRegistrationNumberSnafu, RegistryError, SerializationSnafu, StoreUnavailableSnafu,
};
use exam_registry_types::{Result, SectionKey, StudentRecord};
use redb::{Database, ReadableTable, ReadableTableMetadata};
use snafu::{ResultExt, Snafu};

use crate::tables::Tables;

/// Errors raised by the redb student store.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StudentStoreError {
    #[snafu(display("Transaction error: {source}"))]
    Transaction { source: redb::TransactionError },

    #[snafu(display("Table error: {source}"))]
    Table { source: redb::TableError },

    #[snafu(display("Storage error: {source}"))]
    Storage { source: redb::StorageError },

    #[snafu(display("Commit error: {source}"))]
    Commit { source: redb::CommitError },

    #[snafu(display("Codec error: {source}"))]
    Codec { source: postcard::Error },

    #[snafu(display("Registration number {registration_number} is already assigned"))]
    Duplicate { registration_number: String },
}

impl From<StudentStoreError> for RegistryError {
    #[track_caller]
    fn from(err: StudentStoreError) -> Self {
        match err {
            StudentStoreError::Duplicate { registration_number } => {
                DuplicateRegistrationNumberSnafu { registration_number }.build()
            },
            StudentStoreError::Codec { source } => {
                SerializationSnafu { message: source.to_string() }.build()
            },
            other => StoreUnavailableSnafu { message: other.to_string() }.build(),
        }
    }
}

/// Source of the registration numbers already issued in a section.
///
/// The reconciler only needs the raw stored text; parsing (and skipping
/// malformed legacy values) is its job.
pub trait StudentRecordSource: Send + Sync {
    /// Registration numbers of every student enrolled in `section`.
    fn scan_section(&self, section: &SectionKey) -> Result<Vec<String>>;
}

impl<S: StudentRecordSource + ?Sized> StudentRecordSource for Arc<S> {
    fn scan_section(&self, section: &SectionKey) -> Result<Vec<String>> {
        (**self).scan_section(section)
    }
}

/// Student store backed by the `students` redb table.
#[derive(Clone)]
pub struct StudentStore {
    db: Arc<Database>,
}

impl StudentStore {
    /// Wraps a database whose tables were created by the storage engine.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persists a new student.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistrationNumber`] if the number is
    /// already taken; the stored record is left untouched.
    pub fn insert(&self, record: &StudentRecord) -> Result<()> {
        Ok(self.insert_batch(std::slice::from_ref(record))?)
    }

    /// Persists several students in one transaction.
    ///
    /// Either every record is stored or none is: a duplicate anywhere in the
    /// batch (against the store or within the batch) aborts the whole write.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistrationNumber`] naming the first
    /// colliding number.
    pub fn import(&self, records: &[StudentRecord]) -> Result<usize> {
        self.insert_batch(records)?;
        tracing::debug!(count = records.len(), "Inserted student records");
        Ok(records.len())
    }

    fn insert_batch(&self, records: &[StudentRecord]) -> std::result::Result<(), StudentStoreError> {
        let txn = self.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(Tables::STUDENTS).context(TableSnafu)?;
            for record in records {
                let key = record.registration_number.as_str();
                if table.get(key).context(StorageSnafu)?.is_some() {
                    return DuplicateSnafu { registration_number: key }.fail();
                }
                let bytes = postcard::to_allocvec(record).context(CodecSnafu)?;
                table.insert(key, bytes.as_slice()).context(StorageSnafu)?;
            }
        }
        txn.commit().context(CommitSnafu)?;
        Ok(())
    }

    /// Looks up a student by registration number.
    pub fn get(&self, registration_number: &str) -> Result<Option<StudentRecord>> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::STUDENTS).context(TableSnafu)?;
        let Some(bytes) = table.get(registration_number).context(StorageSnafu)? else {
            return Ok(None);
        };
        let record = postcard::from_bytes(bytes.value()).context(CodecSnafu)?;
        Ok(Some(record))
    }

    /// Every student in `section`, ordered by registration number text.
    pub fn list_section(&self, section: &SectionKey) -> Result<Vec<StudentRecord>> {
        let mut records = Vec::new();
        self.for_each(|record| {
            if &record.section == section {
                records.push(record);
            }
        })?;
        Ok(records)
    }

    /// Number of students in `section`.
    pub fn count_section(&self, section: &SectionKey) -> Result<u64> {
        let mut count = 0u64;
        self.for_each(|record| {
            if &record.section == section {
                count += 1;
            }
        })?;
        Ok(count)
    }

    /// Total number of stored students.
    pub fn count(&self) -> Result<u64> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::STUDENTS).context(TableSnafu)?;
        Ok(table.len().context(StorageSnafu)?)
    }

    fn for_each(&self, mut f: impl FnMut(StudentRecord)) -> std::result::Result<(), StudentStoreError> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::STUDENTS).context(TableSnafu)?;
        for entry in table.iter().context(StorageSnafu)? {
            let (_, value) = entry.context(StorageSnafu)?;
            let record: StudentRecord = postcard::from_bytes(value.value()).context(CodecSnafu)?;
            f(record);
        }
        Ok(())
    }
}

impl StudentRecordSource for StudentStore {
    fn scan_section(&self, section: &SectionKey) -> Result<Vec<String>> {
        let mut numbers = Vec::new();
        self.for_each(|record| {
            if &record.section == section {
                numbers.push(record.registration_number);
            }
        })?;
        Ok(numbers)
    }
}
