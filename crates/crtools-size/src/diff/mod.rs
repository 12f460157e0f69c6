//! # Snapshot Diffing
//!
//! Diffs two [`SizeInfo`] snapshots into a [`DeltaSizeInfo`].
//!
//! ## Algorithm
//!
//! Symbols are matched in four passes of decreasing strictness (see
//! [`keys::MATCH_PASSES`]):
//!
//! 1. **exact**: same container, section, normalized full name, path and size
//! 2. **resized**: as above, size may differ
//! 3. **renamed**: short name instead of full name, clone suffixes dropped
//! 4. **moved**: full name without path, for unique names only
//!
//! Usually more than 90% of symbols are claimed by the first pass. Ties
//! within a pass go to the earliest before symbol; there is no similarity
//! scoring.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use crtools_size::diff::{diff, DiffOptions};
//! use crtools_size::models::{Container, SizeInfo, Symbol};
//!
//! let mut sym = Symbol::new(".text", 16);
//! sym.container_name = "libfoo.so".to_string();
//! sym.set_name("foo()");
//!
//! let before = Arc::new(SizeInfo::new(vec![Container::new("libfoo.so")], vec![sym.clone()])?);
//! sym.size = 20;
//! let after = Arc::new(SizeInfo::new(vec![Container::new("libfoo.so")], vec![sym])?);
//!
//! let delta = diff(before, after, DiffOptions::default())?;
//! assert_eq!(delta.symbols.size(), 4);
//! # Ok::<(), crtools_size::error::SizeError>(())
//! ```

pub mod keys;
pub mod matcher;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

pub use matcher::{match_symbols, PaddingAggregate, SymbolMatches, AGGREGATE_PADDING_NAME};

use crate::error::SizeResult;
use crate::models::{assign_short_names, Container, DeltaContainer, DeltaSizeInfo, SizeInfo};

/// Knobs for [`diff`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions
{
    /// Merge same-name path aliases into one delta, then order deltas by
    /// decreasing absolute pss change.
    pub sort: bool,
}

/// Line up two container lists by name.
///
/// Names come in after-list order, followed by containers that only exist
/// before. A name listed more than once on one side yields a single delta
/// holding the last container of that name. Short names are assigned to the
/// new delta containers; the input containers are left untouched.
#[must_use]
pub fn diff_container_lists(before: &[Arc<Container>], after: &[Arc<Container>]) -> Vec<DeltaContainer>
{
    let mut position_by_name: HashMap<&str, usize> = HashMap::new();
    let mut deltas: Vec<DeltaContainer> = Vec::with_capacity(after.len().max(before.len()));

    for container in after {
        if let Some(&position) = position_by_name.get(container.name.as_str()) {
            deltas[position].after = Some(Arc::clone(container));
            continue;
        }
        position_by_name.insert(&container.name, deltas.len());
        deltas.push(DeltaContainer {
            name: container.name.clone(),
            short_name: String::new(),
            before: None,
            after: Some(Arc::clone(container)),
        });
    }
    for container in before {
        if let Some(&position) = position_by_name.get(container.name.as_str()) {
            deltas[position].before = Some(Arc::clone(container));
            continue;
        }
        position_by_name.insert(&container.name, deltas.len());
        deltas.push(DeltaContainer {
            name: container.name.clone(),
            short_name: String::new(),
            before: Some(Arc::clone(container)),
            after: None,
        });
    }

    assign_short_names(&mut deltas);
    deltas
}

/// Diff two snapshots.
///
/// ## Errors
///
/// Returns `UnknownContainer` if a symbol's container is missing from its
/// snapshot's container list (which [`SizeInfo::new`] already rules out for
/// validated snapshots).
pub fn diff(before: Arc<SizeInfo>, after: Arc<SizeInfo>, options: DiffOptions) -> SizeResult<DeltaSizeInfo>
{
    let containers = diff_container_lists(&before.containers, &after.containers);
    let matches = match_symbols(&before.raw_symbols, &after.raw_symbols);
    let mut symbols = matches.into_delta_group(&containers)?;

    if options.sort {
        // Path aliases of header-defined functions would otherwise show up as
        // many small deltas.
        debug!("Grouping");
        symbols = symbols.grouped_by_aliases();
        debug!("Sorting");
        symbols = symbols.sorted();
    }
    debug!(deltas = symbols.len(), "Diff complete");

    Ok(DeltaSizeInfo {
        before,
        after,
        containers,
        symbols,
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn containers(names: &[&str]) -> Vec<Arc<Container>>
    {
        names.iter().map(|name| Arc::new(Container::new(*name))).collect()
    }

    #[test]
    fn test_container_order_prefers_after()
    {
        let before = containers(&["a", "b", "c"]);
        let after = containers(&["c", "d", "a"]);
        let deltas = diff_container_lists(&before, &after);

        let names: Vec<&str> = deltas.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["c", "d", "a", "b"]);

        let short: Vec<&str> = deltas.iter().map(|d| d.short_name.as_str()).collect();
        assert_eq!(short, vec!["0", "1", "2", "3"]);

        assert!(deltas[1].is_added());
        assert!(deltas[3].is_removed());
        assert!(!deltas[0].is_added() && !deltas[0].is_removed());
    }

    #[test]
    fn test_container_diff_does_not_touch_inputs()
    {
        let before = containers(&["a"]);
        let after = containers(&["a"]);
        let deltas = diff_container_lists(&before, &after);
        assert_eq!(deltas[0].short_name, "0");
        assert!(after[0].short_name.is_empty());
        assert!(Arc::ptr_eq(deltas[0].before.as_ref().unwrap(), &before[0]));
    }

    #[test]
    fn test_unnamed_container_is_not_missing()
    {
        let before = containers(&[""]);
        let after = containers(&[""]);
        let deltas = diff_container_lists(&before, &after);

        assert_eq!(deltas.len(), 1);
        assert!(!deltas[0].is_added());
        assert!(!deltas[0].is_removed());
    }

    #[test]
    fn test_repeated_names_collapse_to_last()
    {
        let before = containers(&["a", "b", "b"]);
        let after = containers(&["a", "a"]);
        let deltas = diff_container_lists(&before, &after);

        let names: Vec<&str> = deltas.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(!deltas[0].is_added() && !deltas[0].is_removed());
        assert!(Arc::ptr_eq(deltas[0].after.as_ref().unwrap(), &after[1]));
        assert!(Arc::ptr_eq(deltas[1].before.as_ref().unwrap(), &before[2]));
        assert!(deltas[1].is_removed());
        assert_eq!(deltas[1].short_name, "1");
    }
}
