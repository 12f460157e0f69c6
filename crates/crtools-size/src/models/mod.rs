//! # Models
//!
//! In-memory representation of size snapshots and of the diffs between them.
//!
//! - [`Symbol`] / [`Section`]: one named, sized unit of compiled output
//! - [`Container`]: the binary or library owning a set of symbols
//! - [`SizeInfo`]: a whole snapshot
//! - [`DeltaSymbol`], [`DeltaContainer`], [`DeltaSizeInfo`]: diff results

pub mod container;
pub mod delta;
pub mod size_info;
pub mod symbol;

// Re-export all public types
pub use container::{assign_short_names, Container, DeltaContainer};
pub use delta::{DeltaRecord, DeltaSizeInfo, DeltaSymbol, DeltaSymbolGroup, DiffStatus, DiffSummary, StatusCounts};
pub use size_info::SizeInfo;
pub use symbol::{Section, Symbol, SymbolFlags, OVERHEAD_PREFIX};
