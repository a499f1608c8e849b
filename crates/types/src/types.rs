//! Core type definitions for the exam registry.
//!
//! - Identifier types (InstitutionId)
//! - Section keys, the partition key for registration numbers
//! - Registration numbers and their canonical text form
//! - Student records

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::OptionExt;

use crate::error::{MalformedRegistrationNumberSnafu, Result};

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a numeric type for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<inner>` and `Into<inner>` conversions
/// - `Display` with a semantic prefix (e.g., `inst:123`)
/// - `new()` constructor and `value()` accessor
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, JsonSchema,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = <$inner as std::str::FromStr>::Err;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of the institution that enrolled a student.
    ///
    /// # Display
    ///
    /// Formats with `inst:` prefix: `inst:42`.
    InstitutionId, i64, "inst"
);

// ============================================================================
// Sections
// ============================================================================

/// Name of a curriculum stage, the partition key for registration numbers.
///
/// Section keys are compared verbatim; the canonical names are the ones
/// configured in the sequence policy (e.g. `المرحلة العالية`).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct SectionKey(String);

impl SectionKey {
    /// Creates a section key from its canonical name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the canonical name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SectionKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for SectionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Registration Numbers
// ============================================================================

/// Width of the zero-padded numeric suffix.
pub const REGISTRATION_DIGITS: usize = 6;

/// A registration number: one uppercase letter followed by a numeric suffix.
///
/// The canonical text form pads the suffix to six digits: `A250001`.
/// Ordering compares prefix first, then the numeric suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationNumber {
    prefix: char,
    number: u32,
}

impl RegistrationNumber {
    /// Creates a registration number from a prefix letter and numeric suffix.
    pub const fn new(prefix: char, number: u32) -> Self {
        Self { prefix, number }
    }

    /// Parses the text form `[A-Z][0-9]+`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MalformedRegistrationNumber`](crate::RegistryError)
    /// if the prefix is not an ASCII uppercase letter, the suffix is empty or
    /// contains anything but ASCII digits, or the suffix overflows `u32`.
    pub fn parse(value: &str) -> Result<Self> {
        let mut chars = value.chars();
        let prefix = chars
            .next()
            .filter(char::is_ascii_uppercase)
            .context(MalformedRegistrationNumberSnafu { value })?;

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return MalformedRegistrationNumberSnafu { value }.fail();
        }

        let number = digits
            .parse::<u32>()
            .ok()
            .context(MalformedRegistrationNumberSnafu { value })?;

        Ok(Self { prefix, number })
    }

    /// Returns the prefix letter.
    pub const fn prefix(self) -> char {
        self.prefix
    }

    /// Returns the numeric suffix.
    pub const fn number(self) -> u32 {
        self.number
    }
}

impl fmt::Display for RegistrationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:0width$}", self.prefix, self.number, width = REGISTRATION_DIGITS)
    }
}

impl std::str::FromStr for RegistrationNumber {
    type Err = crate::RegistryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RegistrationNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RegistrationNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Student Records
// ============================================================================

/// A persisted student enrollment.
///
/// `registration_number` is kept as text: records imported from earlier
/// deployments may hold values that do not parse, and reconciliation has to
/// see (and skip) them rather than fail the load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Globally unique registration number.
    pub registration_number: String,
    /// Curriculum section the student is enrolled in.
    pub section: SectionKey,
    /// Student name.
    pub name: String,
    /// Student's home place.
    pub place: String,
    /// Enrolling institution.
    pub institution_id: InstitutionId,
    /// Enrollment timestamp.
    pub created_at: DateTime<Utc>,
}
