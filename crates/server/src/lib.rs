//! Exam registry operator tooling.
//!
//! Provides configuration loading, registry bootstrap, and the subcommands of
//! the `exam-registry` binary.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod config;
