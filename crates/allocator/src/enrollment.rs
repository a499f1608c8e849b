//! Student enrollment: validate, allocate once, persist.

use chrono::Utc;
use exam_registry_storage::{CounterStore, StudentStore};
use exam_registry_types::error::InvalidArgumentSnafu;
use exam_registry_types::{InstitutionId, Result, SectionKey, StudentRecord};

use crate::allocator::Allocator;
use crate::metrics;

/// A request to enroll one student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRequest {
    /// Enrolling institution.
    pub institution_id: InstitutionId,
    /// Student name. Surrounding whitespace is trimmed.
    pub name: String,
    /// Student's home place. Surrounding whitespace is trimmed.
    pub place: String,
    /// Curriculum section.
    pub section: SectionKey,
}

/// Enrolls students, assigning each a registration number.
pub struct EnrollmentService<C> {
    allocator: Allocator<C>,
    students: StudentStore,
}

impl<C: CounterStore> EnrollmentService<C> {
    /// Creates the service.
    pub fn new(allocator: Allocator<C>, students: StudentStore) -> Self {
        Self { allocator, students }
    }

    /// The allocator numbers are drawn from.
    pub fn allocator(&self) -> &Allocator<C> {
        &self.allocator
    }

    /// Enrolls a student.
    ///
    /// The request is validated before any number is drawn. Once a number is
    /// allocated it is used for this record only; if the insert then fails the
    /// number is skipped, never reissued.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidArgument`](exam_registry_types::RegistryError)
    ///   for a blank name or place.
    /// - Any allocation error from [`Allocator::next`].
    /// - [`RegistryError::DuplicateRegistrationNumber`](exam_registry_types::RegistryError)
    ///   if the store already holds the allocated number.
    pub fn enroll(&self, request: EnrollmentRequest) -> Result<StudentRecord> {
        let result = self.enroll_inner(request);
        metrics::record_enrollment(result.is_ok());
        result
    }

    fn enroll_inner(&self, request: EnrollmentRequest) -> Result<StudentRecord> {
        let name = request.name.trim();
        if name.is_empty() {
            return InvalidArgumentSnafu { message: "name must not be blank" }.fail();
        }
        let place = request.place.trim();
        if place.is_empty() {
            return InvalidArgumentSnafu { message: "place must not be blank" }.fail();
        }

        let number = self.allocator.next(&request.section)?;
        let record = StudentRecord {
            registration_number: number.to_string(),
            section: request.section.clone(),
            name: name.to_string(),
            place: place.to_string(),
            institution_id: request.institution_id,
            created_at: Utc::now(),
        };

        if let Err(err) = self.students.insert(&record) {
            tracing::error!(
                registration_number = %number,
                section = %record.section,
                error = %err,
                "Enrollment failed after allocation; number is skipped"
            );
            return Err(err);
        }

        tracing::info!(
            registration_number = %number,
            section = %record.section,
            institution_id = %record.institution_id,
            "Student enrolled"
        );
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use exam_registry_storage::{RedbCounterStore, StorageEngine};
    use exam_registry_test_utils::fixtures::student;
    use exam_registry_types::config::PRIMARY_SECTION;
    use exam_registry_types::{RegistryError, SequencePolicy};

    use super::*;

    fn service() -> (EnrollmentService<RedbCounterStore>, StorageEngine) {
        let engine = StorageEngine::open_in_memory().unwrap();
        let allocator = Allocator::new(Arc::new(SequencePolicy::default()), engine.counters());
        (EnrollmentService::new(allocator, engine.students()), engine)
    }

    fn request(name: &str, place: &str, section: &str) -> EnrollmentRequest {
        EnrollmentRequest {
            institution_id: InstitutionId::new(3),
            name: name.to_string(),
            place: place.to_string(),
            section: SectionKey::new(section),
        }
    }

    #[test]
    fn test_enroll_assigns_and_persists() {
        let (service, engine) = service();
        let record = service.enroll(request("  Fathima ", "Malappuram", PRIMARY_SECTION)).unwrap();
        assert_eq!(record.registration_number, "I250001");
        assert_eq!(record.name, "Fathima");
        assert_eq!(engine.students().get("I250001").unwrap(), Some(record));
    }

    #[test]
    fn test_blank_name_allocates_nothing() {
        let (service, engine) = service();
        let err = service.enroll(request("   ", "Malappuram", PRIMARY_SECTION)).expect_err("blank");
        assert!(matches!(err, RegistryError::InvalidArgument { .. }));
        let err = service.enroll(request("Ali", "", PRIMARY_SECTION)).expect_err("blank");
        assert!(matches!(err, RegistryError::InvalidArgument { .. }));
        assert_eq!(engine.counters().read(&SectionKey::new(PRIMARY_SECTION)).unwrap(), None);
    }

    #[test]
    fn test_duplicate_is_reported_and_number_skipped() {
        let (service, engine) = service();
        engine.students().insert(&student("I250001", PRIMARY_SECTION)).unwrap();

        let err = service.enroll(request("Ali", "Tirur", PRIMARY_SECTION)).expect_err("taken");
        assert!(matches!(err, RegistryError::DuplicateRegistrationNumber { .. }));

        let record = service.enroll(request("Ali", "Tirur", PRIMARY_SECTION)).unwrap();
        assert_eq!(record.registration_number, "I250002");
    }
}
