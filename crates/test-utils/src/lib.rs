//! Shared test utilities for the exam registry crates.
//!
//! - [`TestDir`] - Managed temporary directory for database files
//! - [`fixtures`] - Student records and small-capacity policies
//! - [`strategies`] - Proptest generators for registration numbers

#![deny(unsafe_code)]

mod test_dir;
pub use test_dir::TestDir;

pub mod fixtures;
pub mod strategies;
