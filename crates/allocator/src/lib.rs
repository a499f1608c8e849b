//! Registration-number allocation for the exam registry.
//!
//! This crate provides:
//! - [`Allocator`]: issues `prefix + zero-padded(start + seq - 1)` from an
//!   atomically incremented per-section counter
//! - [`Reconciler`]: raises counters to cover numbers already present in the
//!   student store, never lowering them
//! - [`Initializer`]: reconciles every configured section and reports the
//!   next number each would issue
//! - [`EnrollmentService`]: validates a request, allocates exactly once, and
//!   persists the student

#![deny(unsafe_code)]

mod allocator;
mod enrollment;
mod initializer;
pub mod metrics;
mod reconciler;

pub use allocator::Allocator;
pub use enrollment::{EnrollmentRequest, EnrollmentService};
pub use initializer::{InitializationReport, Initializer};
pub use reconciler::{Reconciler, SectionReconciliation};
