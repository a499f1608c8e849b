//! The registration-number allocator.
//!
//! `next` performs exactly one counter mutation, the store's atomic
//! increment-and-get, and derives the number from the returned value. There is
//! no read-then-write across transactions, so concurrent callers (threads or
//! processes sharing the store) always receive distinct numbers.

use std::sync::Arc;

use exam_registry_storage::CounterStore;
use exam_registry_types::error::SectionCapacityExceededSnafu;
use exam_registry_types::{
    ErrorCode, RegistrationNumber, RegistryError, Result, SectionKey, SequencePolicy,
};

use crate::metrics::{self, Timer};

/// Issues registration numbers for the sections of a [`SequencePolicy`].
pub struct Allocator<C> {
    policy: Arc<SequencePolicy>,
    counters: C,
}

impl<C: CounterStore> Allocator<C> {
    /// Creates an allocator over `counters`.
    pub fn new(policy: Arc<SequencePolicy>, counters: C) -> Self {
        Self { policy, counters }
    }

    /// The policy this allocator numbers against.
    pub fn policy(&self) -> &SequencePolicy {
        &self.policy
    }

    /// Issues the next registration number for `section`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownSection`] if the section is not configured.
    ///   No counter is touched.
    /// - [`RegistryError::StoreUnavailable`] if the increment fails.
    /// - [`RegistryError::SectionCapacityExceeded`] once the range is
    ///   exhausted. The counter stays advanced; later calls keep failing.
    pub fn next(&self, section: &SectionKey) -> Result<RegistrationNumber> {
        let timer = Timer::start();
        let result = self.allocate(section);
        let status = match &result {
            Ok(_) => "success",
            Err(err) => status_label(err),
        };
        metrics::record_allocation(section.as_str(), status, timer.elapsed_secs());
        result
    }

    fn allocate(&self, section: &SectionKey) -> Result<RegistrationNumber> {
        let entry = self.policy.policy_for(section)?;
        let sequence = self.counters.increment_and_get(section)?;
        metrics::set_counter_value(section.as_str(), sequence);

        let Some(number) = entry.registration_number_for_sequence(sequence) else {
            tracing::warn!(
                section = %section,
                sequence,
                capacity = entry.capacity(),
                "Section range exhausted"
            );
            return SectionCapacityExceededSnafu {
                section: section.clone(),
                capacity: entry.capacity(),
            }
            .fail();
        };

        tracing::debug!(section = %section, sequence, registration_number = %number, "Allocated");
        Ok(number)
    }

    /// The number the next `next(section)` would issue, without mutating.
    ///
    /// Returns `None` when the section is exhausted. Under concurrency the
    /// answer is only a hint: another caller may take that number first.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSection`] or
    /// [`RegistryError::StoreUnavailable`].
    pub fn preview(&self, section: &SectionKey) -> Result<Option<RegistrationNumber>> {
        let entry = self.policy.policy_for(section)?;
        let current = self.counters.read(section)?.unwrap_or(0);
        Ok(entry.registration_number_for_sequence(current.saturating_add(1)))
    }
}

fn status_label(err: &RegistryError) -> &'static str {
    match err.code() {
        ErrorCode::UnknownSection => "unknown_section",
        ErrorCode::SectionCapacityExceeded => "capacity_exceeded",
        ErrorCode::StoreUnavailable => "store_unavailable",
        _ => "error",
    }
}
