//! Anvil Core - Foundational types for the Anvil importer
//!
//! This crate provides the types that all other Anvil crates depend on:
//! - `AnvilError` and the `Result` alias
//! - `Diagnostics` - the per-import warning collector
//! - `ContentHash` - SHA-256 fingerprints of imported files
//! - Unit-scale conversion

mod diagnostics;
mod error;
mod hash;
mod units;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, SUMMARY_LINES};
pub use error::{AnvilError, Result};
pub use hash::ContentHash;
pub use units::{unit_scale_factor, UnitSettings, UnitSystem, INCH_IN_METERS};
