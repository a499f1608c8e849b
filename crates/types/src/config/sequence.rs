//! Registration-number sequence configuration.
//!
//! Each curriculum section gets a prefix letter and an inclusive numeric range.
//! The registration number issued for the n-th student of a section is
//! `prefix + zero-padded(start + n - 1)`.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Largest suffix that fits the six-digit registration number format.
pub const MAX_REGISTRATION_SUFFIX: u32 = 999_999;

/// Canonical name of the primary stage.
pub const PRIMARY_SECTION: &str = "المرحلة الإبتدائية";

/// Canonical name of the intermediate stage.
pub const INTERMEDIATE_SECTION: &str = "المرحلة المتوسطة";

/// Canonical name of the advanced stage.
pub const ADVANCED_SECTION: &str = "المرحلة العالية";

/// Numbering for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SectionConfig {
    /// Canonical section name, matched verbatim against student records.
    pub name: String,
    /// Single uppercase letter that prefixes every number in the section.
    pub prefix: char,
    /// First numeric suffix issued.
    pub start: u32,
    /// Last numeric suffix that may be issued (inclusive).
    pub end: u32,
}

impl SectionConfig {
    /// Creates a section entry. Validation happens in [`SequenceConfig::validate`].
    pub fn new(name: impl Into<String>, prefix: char, start: u32, end: u32) -> Self {
        Self { name: name.into(), prefix, start, end }
    }
}

/// Sequence policy configuration.
///
/// # Validation Rules
///
/// - At least one section
/// - Section names are non-blank and unique
/// - Prefixes are ASCII uppercase letters and unique
/// - `start <= end <= 999_999`
///
/// # Example
///
/// ```no_run
/// # use exam_registry_types::config::{SectionConfig, SequenceConfig};
/// let config = SequenceConfig::builder()
///     .sections(vec![SectionConfig::new("primary", 'P', 1, 9_999)])
///     .build()
///     .expect("valid sequence config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SequenceConfig {
    /// Sections in reporting order.
    #[serde(default = "default_sections")]
    pub sections: Vec<SectionConfig>,
}

#[bon::bon]
impl SequenceConfig {
    /// Creates a new sequence configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any rule listed on the type is violated.
    #[builder]
    pub fn new(
        #[builder(default = default_sections())] sections: Vec<SectionConfig>,
    ) -> Result<Self, ConfigError> {
        let config = Self { sections };
        config.validate()?;
        Ok(config)
    }
}

impl SequenceConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sections.is_empty() {
            return Err(ConfigError::Validation {
                message: "sequence policy must define at least one section".to_string(),
            });
        }

        let mut names = HashSet::new();
        let mut prefixes = HashSet::new();
        for section in &self.sections {
            if section.name.trim().is_empty() {
                return Err(ConfigError::Validation {
                    message: "section name must not be blank".to_string(),
                });
            }
            if !section.prefix.is_ascii_uppercase() {
                return Err(ConfigError::Validation {
                    message: format!(
                        "section {} prefix must be an ASCII uppercase letter, got {:?}",
                        section.name, section.prefix
                    ),
                });
            }
            if section.start > section.end {
                return Err(ConfigError::Validation {
                    message: format!(
                        "section {} start ({}) must be <= end ({})",
                        section.name, section.start, section.end
                    ),
                });
            }
            if section.end > MAX_REGISTRATION_SUFFIX {
                return Err(ConfigError::Validation {
                    message: format!(
                        "section {} end must be <= {}, got {}",
                        section.name, MAX_REGISTRATION_SUFFIX, section.end
                    ),
                });
            }
            if !names.insert(section.name.as_str()) {
                return Err(ConfigError::Validation {
                    message: format!("section {} is defined twice", section.name),
                });
            }
            if !prefixes.insert(section.prefix) {
                return Err(ConfigError::Validation {
                    message: format!(
                        "prefix {} is used by more than one section",
                        section.prefix
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self { sections: default_sections() }
    }
}

fn default_sections() -> Vec<SectionConfig> {
    vec![
        SectionConfig::new(PRIMARY_SECTION, 'I', default_start(), default_end()),
        SectionConfig::new(INTERMEDIATE_SECTION, 'M', default_start(), default_end()),
        SectionConfig::new(ADVANCED_SECTION, 'A', default_start(), default_end()),
    ]
}

fn default_start() -> u32 {
    250_001
}

fn default_end() -> u32 {
    260_000 // 10,000 slots
}
