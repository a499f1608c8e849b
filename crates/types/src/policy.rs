//! Sequence policy: the immutable section → numbering lookup.
//!
//! The policy is built once from validated [`SequenceConfig`] and shared
//! (`Arc<SequencePolicy>`) by the allocator and reconciler. It never touches
//! storage.

use std::collections::HashMap;

use snafu::OptionExt;

use crate::config::{ConfigError, SectionConfig, SequenceConfig};
use crate::error::{Result, UnknownSectionSnafu};
use crate::types::{RegistrationNumber, SectionKey};

/// Numbering for a single section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPolicy {
    section: SectionKey,
    prefix: char,
    start: u32,
    end: u32,
}

impl SectionPolicy {
    /// Section this entry numbers.
    pub fn section(&self) -> &SectionKey {
        &self.section
    }

    /// Prefix letter.
    pub const fn prefix(&self) -> char {
        self.prefix
    }

    /// First numeric suffix.
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Last numeric suffix (inclusive).
    pub const fn end(&self) -> u32 {
        self.end
    }

    /// Number of slots in `[start, end]`.
    pub fn capacity(&self) -> u64 {
        u64::from(self.end) - u64::from(self.start) + 1
    }

    /// Numeric suffix handed out when the counter reaches `sequence`.
    ///
    /// `sequence` is the counter value after the increment, so the first issued
    /// number (`sequence == 1`) is `start`. Returns `None` for `sequence == 0`
    /// and for anything past `end`.
    pub fn number_for_sequence(&self, sequence: u64) -> Option<u32> {
        let candidate = u64::from(self.start).checked_add(sequence.checked_sub(1)?)?;
        if candidate > u64::from(self.end) {
            return None;
        }
        u32::try_from(candidate).ok()
    }

    /// Registration number issued at counter value `sequence`, if in range.
    pub fn registration_number_for_sequence(&self, sequence: u64) -> Option<RegistrationNumber> {
        self.number_for_sequence(sequence).map(|n| RegistrationNumber::new(self.prefix, n))
    }

    /// Counter value implied by a section's highest issued suffix.
    ///
    /// `max(0, highest - start + 1)`: suffixes below `start` imply nothing was
    /// issued from this range.
    pub fn sequence_for_number(&self, highest: u32) -> u64 {
        (u64::from(highest) + 1).saturating_sub(u64::from(self.start))
    }
}

/// Section → numbering lookup.
#[derive(Debug, Clone)]
pub struct SequencePolicy {
    entries: Vec<SectionPolicy>,
    index: HashMap<SectionKey, usize>,
}

impl SequencePolicy {
    /// Builds the policy from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the configuration is invalid.
    pub fn from_config(config: &SequenceConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_sections(&config.sections))
    }

    fn from_sections(sections: &[SectionConfig]) -> Self {
        let entries: Vec<SectionPolicy> = sections
            .iter()
            .map(|s| SectionPolicy {
                section: SectionKey::new(s.name.clone()),
                prefix: s.prefix,
                start: s.start,
                end: s.end,
            })
            .collect();
        let index =
            entries.iter().enumerate().map(|(i, e)| (e.section.clone(), i)).collect();

        Self { entries, index }
    }

    /// Looks up the numbering for `section`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSection`](crate::RegistryError) if the
    /// section is not part of the policy.
    pub fn policy_for(&self, section: &SectionKey) -> Result<&SectionPolicy> {
        self.index
            .get(section)
            .and_then(|&i| self.entries.get(i))
            .context(UnknownSectionSnafu { section: section.clone() })
    }

    /// All sections in configuration order.
    pub fn sections(&self) -> impl Iterator<Item = &SectionPolicy> {
        self.entries.iter()
    }
}

impl Default for SequencePolicy {
    /// The three curriculum stages, each numbered `250001..=260000`.
    fn default() -> Self {
        Self::from_sections(&SequenceConfig::default().sections)
    }
}
