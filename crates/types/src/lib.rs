//! Core types, errors, and configuration for the exam registry.
//!
//! This crate provides the foundational types used throughout the registry:
//! - Identifier and value types (SectionKey, RegistrationNumber, InstitutionId)
//! - Student records as persisted by the storage layer
//! - The per-section sequence policy (prefix, start, end)
//! - Error types using snafu, with machine-readable error codes

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod policy;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ErrorCode, RegistryError, Result};
pub use policy::{SectionPolicy, SequencePolicy};
pub use types::*;
