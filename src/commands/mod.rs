//! Subcommand entry points
//!
//! Each `execute` turns parsed flags into a configuration record, runs
//! the matching service and prints the outcome.

pub mod catalog;
pub mod service;
pub mod stack;
