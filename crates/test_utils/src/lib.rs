//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! trip ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common values
//! - `builders`: Builder patterns for trips and expense inputs
//! - `assertions`: Custom assertion helpers for ledger invariants
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
