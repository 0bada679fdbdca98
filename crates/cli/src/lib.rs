//! PushEngage suite CLI
//!
//! Command implementations, terminal output and the test plan scaffold
//! generator behind the `pe-suite` binary.

pub mod commands;
pub mod generator;
pub mod output;

pub use generator::{generate, GenerationReport, TestPlan};
