//! Counter reconciliation against the student store.
//!
//! Recovers from counters that were lost, reset, or never created while
//! student records already exist: the counter is raised to
//! `max(0, highest_suffix - start + 1)`. Reconciliation only ever raises, so
//! running it concurrently with live allocation can never hand out a number
//! twice, and running it twice changes nothing.

use std::sync::Arc;

use exam_registry_storage::{CounterStore, StudentRecordSource};
use exam_registry_types::{RegistrationNumber, Result, SectionKey, SequencePolicy};
use serde::Serialize;

use crate::metrics;

/// Outcome of reconciling one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReconciliation {
    /// Section reconciled.
    pub section: SectionKey,
    /// Prefix letter of the section.
    pub prefix: char,
    /// Counter before reconciliation (`None` if it did not exist).
    pub prior: Option<u64>,
    /// Counter value implied by the highest stored registration number.
    pub floor: u64,
    /// Counter after reconciliation: `max(prior, floor)`.
    pub resulting: u64,
    /// Registration numbers read from the student store.
    pub scanned: u64,
    /// Values skipped because they do not parse.
    pub skipped: u64,
    /// Number the next allocation will issue, `None` if exhausted.
    pub next_preview: Option<RegistrationNumber>,
}

impl SectionReconciliation {
    /// Whether the counter moved.
    pub fn raised(&self) -> bool {
        self.prior != Some(self.resulting)
    }
}

/// Raises counters to cover registration numbers already in use.
pub struct Reconciler<C, S> {
    policy: Arc<SequencePolicy>,
    counters: C,
    students: S,
}

impl<C: CounterStore, S: StudentRecordSource> Reconciler<C, S> {
    /// Creates a reconciler over the given stores.
    pub fn new(policy: Arc<SequencePolicy>, counters: C, students: S) -> Self {
        Self { policy, counters, students }
    }

    /// The policy this reconciler checks against.
    pub fn policy(&self) -> &SequencePolicy {
        &self.policy
    }

    /// Reconciles one section.
    ///
    /// Malformed values are logged and skipped. Values whose prefix differs
    /// from the section's, or whose suffix lies past `end`, are logged and
    /// still counted, so the counter always covers every suffix in use.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSection`](exam_registry_types::RegistryError)
    /// or [`RegistryError::StoreUnavailable`](exam_registry_types::RegistryError).
    pub fn reconcile(&self, section: &SectionKey) -> Result<SectionReconciliation> {
        let entry = self.policy.policy_for(section)?;
        let numbers = self.students.scan_section(section)?;

        let mut highest: Option<u32> = None;
        let mut skipped = 0u64;
        for value in &numbers {
            let number = match RegistrationNumber::parse(value) {
                Ok(number) => number,
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(
                        section = %section,
                        value = %value,
                        error = %err,
                        "Skipping malformed registration number"
                    );
                    continue;
                },
            };
            if number.prefix() != entry.prefix() {
                tracing::warn!(
                    section = %section,
                    registration_number = %number,
                    expected_prefix = %entry.prefix(),
                    "Registration number prefix does not match section"
                );
            }
            if number.number() > entry.end() {
                tracing::warn!(
                    section = %section,
                    registration_number = %number,
                    end = entry.end(),
                    "Registration number lies past the section range"
                );
            }
            highest = highest.max(Some(number.number()));
        }

        let floor = highest.map_or(0, |h| entry.sequence_for_number(h));
        let (prior, resulting) = self.counters.set_if_higher(section, floor)?;

        let report = SectionReconciliation {
            section: section.clone(),
            prefix: entry.prefix(),
            prior,
            floor,
            resulting,
            scanned: numbers.len() as u64,
            skipped,
            next_preview: entry.registration_number_for_sequence(resulting.saturating_add(1)),
        };

        metrics::record_reconciliation(section.as_str(), report.raised());
        metrics::record_malformed_numbers(section.as_str(), skipped);
        metrics::set_counter_value(section.as_str(), resulting);
        tracing::info!(
            section = %section,
            ?prior,
            floor,
            resulting,
            scanned = report.scanned,
            skipped,
            "Reconciled counter"
        );

        Ok(report)
    }

    /// Reconciles every configured section in policy order.
    ///
    /// Stops at the first failing section; sections already reconciled keep
    /// their raised counters, which is safe because raising is idempotent.
    pub fn reconcile_all(&self) -> Result<Vec<SectionReconciliation>> {
        self.policy.sections().map(|entry| self.reconcile(entry.section())).collect()
    }
}
