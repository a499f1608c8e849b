//! Storage engine for the exam registry.
//!
//! This crate provides:
//! - redb-based persistent storage (file-backed or in-memory)
//! - Per-section sequence counters with an atomic increment-and-return primitive
//! - Student records keyed by registration number (the uniqueness constraint)
//! - The section scan the counter reconciler consumes

#![deny(unsafe_code)]

mod counter;
mod engine;
mod student;
mod tables;

pub use counter::{CounterError, CounterStore, RedbCounterStore};
pub use engine::{EngineError, StorageEngine};
pub use student::{StudentRecordSource, StudentStore, StudentStoreError};
pub use tables::Tables;
