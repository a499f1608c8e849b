//! Error types for the exam registry using snafu.
//!
//! Defines a unified error type that captures:
//! - Sequence policy errors (unknown section, exhausted range)
//! - Storage errors (counter store or student store unreachable)
//! - Integrity errors (duplicate registration numbers)
//! - Input errors (malformed registration numbers, invalid arguments)
//!
//! Each error variant maps to an [`ErrorCode`] with a unique numeric identifier,
//! retryability classification, and suggested recovery action.

use core::fmt;

use snafu::{Location, Snafu};

use crate::types::SectionKey;

/// Unified result type for registry operations.
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

/// Machine-readable error codes for programmatic error handling.
///
/// | Range       | Domain      | Examples                                       |
/// |-------------|-------------|------------------------------------------------|
/// | 1000–1099   | Storage     | Store unavailable                              |
/// | 3000–3099   | Allocation  | Unknown section, capacity exhausted, duplicate |
/// | 3200–3299   | Application | Malformed input, serialization, config         |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Storage errors (1000–1099) ---
    /// Persistence layer unreachable, timed out, or failed a transaction.
    StoreUnavailable = 1000,

    // --- Allocation errors (3000–3099) ---
    /// Section is not part of the sequence policy.
    UnknownSection = 3000,
    /// Section has issued every number in its range.
    SectionCapacityExceeded = 3001,
    /// A registration number was already taken by another student.
    DuplicateRegistrationNumber = 3002,

    // --- Application errors (3200–3299) ---
    /// Registration number text does not match `[A-Z][0-9]+`.
    MalformedRegistrationNumber = 3200,
    /// Invalid request argument.
    InvalidArgument = 3201,
    /// Serialization or deserialization error.
    Serialization = 3202,
    /// Configuration error.
    Config = 3203,
    /// Internal error (unexpected state, invariant violation).
    Internal = 3204,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::StoreUnavailable),
            3000 => Some(Self::UnknownSection),
            3001 => Some(Self::SectionCapacityExceeded),
            3002 => Some(Self::DuplicateRegistrationNumber),
            3200 => Some(Self::MalformedRegistrationNumber),
            3201 => Some(Self::InvalidArgument),
            3202 => Some(Self::Serialization),
            3203 => Some(Self::Config),
            3204 => Some(Self::Internal),
            _ => None,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Only store unavailability is retryable: the counter increment is atomic,
    /// so a retried allocation either never happened or skipped one number.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }

    /// Suggested recovery action for this error code.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::StoreUnavailable => {
                "Retry the request with backoff. Check the database file, disk space, and permissions."
            },
            Self::UnknownSection => "Use one of the sections listed in the sequence policy.",
            Self::SectionCapacityExceeded => {
                "The section range is exhausted. Raise the section's end or configure a new prefix."
            },
            Self::DuplicateRegistrationNumber => {
                "Run counter reconciliation and report the collision. Do not retry with a hand-made number."
            },
            Self::MalformedRegistrationNumber => {
                "Correct the stored value. Registration numbers are one uppercase letter followed by digits."
            },
            Self::InvalidArgument => "Fix the request parameters and resubmit.",
            Self::Serialization => {
                "Codec bug or data corruption. Report as an issue with serialized data context."
            },
            Self::Config => "Fix the configuration value and restart.",
            Self::Internal => {
                "Unexpected state or invariant violation. Collect context and report as an issue."
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Top-level error type for registry operations.
///
/// # Recovery Guide
///
/// | Variant                       | Retryable | Recovery Action                                 |
/// | ----------------------------- | --------- | ----------------------------------------------- |
/// | `UnknownSection`              | No        | Use a section from the sequence policy          |
/// | `StoreUnavailable`            | Yes       | Retry from the request layer with backoff       |
/// | `SectionCapacityExceeded`     | No        | Change the policy (raise `end`, new prefix)     |
/// | `DuplicateRegistrationNumber` | No        | Bug signal; reconcile counters and report       |
/// | `MalformedRegistrationNumber` | No        | Fix the stored value                            |
/// | `InvalidArgument`             | No        | Fix the request parameters                      |
/// | `Serialization`               | No        | Codec bug or corruption; report as issue        |
/// | `Config`                      | No        | Fix configuration and restart                   |
/// | `Internal`                    | No        | Unexpected state; report as issue with context  |
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RegistryError {
    /// Section is not a recognized curriculum stage.
    ///
    /// **Recovery**: Not retryable. No counter was touched.
    #[snafu(display("Unknown section: {section}"))]
    UnknownSection {
        /// Section that was requested.
        section: SectionKey,
    },

    /// Persistence layer unreachable or failed mid-operation.
    ///
    /// **Recovery**: Retryable from outside. The failed attempt either did not
    /// apply or applied without acknowledgment, which costs one skipped number.
    #[snafu(display("Store unavailable at {location}: {message}"))]
    StoreUnavailable {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The section has exhausted its numeric range.
    ///
    /// **Recovery**: Not retryable without a policy change.
    #[snafu(display("Section {section} exhausted its {capacity} registration numbers"))]
    SectionCapacityExceeded {
        /// Section that overflowed.
        section: SectionKey,
        /// Number of slots in the section's range.
        capacity: u64,
    },

    /// The student store rejected a registration number that is already taken.
    ///
    /// **Recovery**: Not retryable. Atomic allocation makes this structurally
    /// impossible, so it signals a bug or a counter that was lowered by hand.
    #[snafu(display("Registration number {registration_number} is already assigned"))]
    DuplicateRegistrationNumber {
        /// The colliding registration number.
        registration_number: String,
    },

    /// Registration number text does not parse.
    #[snafu(display("Malformed registration number: {value:?}"))]
    MalformedRegistrationNumber {
        /// The offending text.
        value: String,
    },

    /// Invalid argument (malformed request parameter).
    #[snafu(display("Invalid argument: {message}"))]
    InvalidArgument {
        /// Error description.
        message: String,
    },

    /// Serialization or deserialization error (postcard codec failure).
    #[snafu(display("Serialization error at {location}: {message}"))]
    Serialization {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Configuration error (invalid value or constraint violation).
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// Internal error (unexpected state, invariant violation).
    #[snafu(display("Internal error at {location}: {message}"))]
    Internal {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },
}

impl RegistryError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownSection { .. } => ErrorCode::UnknownSection,
            Self::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            Self::SectionCapacityExceeded { .. } => ErrorCode::SectionCapacityExceeded,
            Self::DuplicateRegistrationNumber { .. } => ErrorCode::DuplicateRegistrationNumber,
            Self::MalformedRegistrationNumber { .. } => ErrorCode::MalformedRegistrationNumber,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Serialization { .. } => ErrorCode::Serialization,
            Self::Config { .. } => ErrorCode::Config,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Delegates to [`ErrorCode::is_retryable`].
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Suggested recovery action for this error.
    #[must_use]
    pub const fn suggested_action(&self) -> &'static str {
        self.code().suggested_action()
    }
}

impl From<crate::config::ConfigError> for RegistryError {
    fn from(err: crate::config::ConfigError) -> Self {
        RegistryError::Config { message: err.to_string() }
    }
}
