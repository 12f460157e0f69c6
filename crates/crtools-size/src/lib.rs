//! # crtools-size
//!
//! Binary-size snapshots and symbol-level diffing for crtools.
//!
//! This crate provides:
//! - The snapshot model (containers, sections, symbols)
//! - JSON loading and saving of snapshots
//! - A multi-pass diff that pairs the symbols of two snapshots
//! - Delta summaries for reporting
//!
//! ## Padding
//!
//! Linkers insert alignment padding in front of symbols. When two symbols are
//! matched by content rather than by exact identity, which symbol owns that
//! padding is no longer meaningful, so the diff reports the drift per
//! container and section as synthetic `Overhead:` symbols instead.

pub mod diff;
pub mod error;
pub mod models;
pub mod prelude;

pub use diff::{diff, DiffOptions};
// Re-export commonly used types
pub use error::{SizeError, SizeResult};
pub use models::{Container, DeltaSizeInfo, DeltaSymbol, SizeInfo, Symbol};
