//! Common module for library exports

pub use crate::diff::{diff, diff_container_lists, match_symbols, DiffOptions, PaddingAggregate, SymbolMatches};
pub use crate::error::{SizeError, SizeResult};
pub use crate::models::{
    Container, DeltaContainer, DeltaSizeInfo, DeltaSymbol, DeltaSymbolGroup, DiffStatus, Section, SizeInfo, Symbol,
    SymbolFlags,
};
