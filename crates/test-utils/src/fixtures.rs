//! Fixture builders for registry tests.
//!
//! Centralizes the section names, timestamps, and small-capacity policies
//! that would otherwise be repeated across test modules.

// Fixtures panic on invalid input - tests should fail loudly
#![allow(clippy::expect_used)]

use chrono::{DateTime, Utc};
use exam_registry_types::config::{SectionConfig, SequenceConfig};
use exam_registry_types::{InstitutionId, SectionKey, SequencePolicy, StudentRecord};

/// Fixed enrollment timestamp so records compare equal after a round trip.
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(1_717_228_800, 0).unwrap_or_default()
}

/// Student record with placeholder personal data.
///
/// `section` is taken verbatim, so tests may use short names like
/// `"primary"` when the policy is not involved.
#[must_use]
pub fn student(registration_number: &str, section: &str) -> StudentRecord {
    TestStudent::builder().registration_number(registration_number).section(section).build()
}

/// Builder-style fixture for student records.
///
/// ```
/// use exam_registry_test_utils::fixtures::TestStudent;
///
/// let record = TestStudent::builder()
///     .registration_number("A250001")
///     .section("المرحلة العالية")
///     .name("Fathima")
///     .build();
/// assert_eq!(record.name, "Fathima");
/// ```
pub struct TestStudent;

#[bon::bon]
impl TestStudent {
    #[builder]
    pub fn new(
        #[builder(into)] registration_number: String,
        #[builder(into)] section: String,
        #[builder(into, default = "Test Student".to_string())] name: String,
        #[builder(into, default = "Test Place".to_string())] place: String,
        #[builder(default = 1)] institution_id: i64,
    ) -> StudentRecord {
        StudentRecord {
            registration_number,
            section: SectionKey::new(section),
            name,
            place,
            institution_id: InstitutionId::new(institution_id),
            created_at: fixed_timestamp(),
        }
    }
}

/// Policy with a single section of `capacity` slots starting at 250001.
///
/// # Panics
///
/// Panics if `capacity` is zero or pushes the range past six digits.
#[must_use]
pub fn policy_with_capacity(section: &str, prefix: char, capacity: u32) -> SequencePolicy {
    let start = 250_001;
    let config = SequenceConfig {
        sections: vec![SectionConfig::new(section, prefix, start, start + capacity - 1)],
    };
    SequencePolicy::from_config(&config).expect("valid single-section policy")
}
