//! Multi-pass symbol matching.
//!
//! Before symbols are indexed by the pass key into FIFO queues; after symbols
//! are then walked in order and each one claims the oldest unclaimed before
//! symbol sharing its key. Whatever is left on either side moves on to the
//! next, looser pass.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use super::keys::{MatchKey, MatchPass, MATCH_PASSES};
use crate::error::{SizeError, SizeResult};
use crate::models::{DeltaContainer, DeltaSymbol, DeltaSymbolGroup, Symbol};

/// Name given to the synthetic symbols carrying aggregate padding.
pub const AGGREGATE_PADDING_NAME: &str = "Overhead: aggregate padding of diff'ed symbols";

/// Padding drift of matched symbols, per `(container name, section name)`.
///
/// Once two symbols are matched by content their padding is no longer
/// attributed to them, so the drift is kept here instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaddingAggregate
{
    by_segment: BTreeMap<(String, String), f64>,
}

impl PaddingAggregate
{
    /// Accumulate `delta` bytes into a segment.
    pub fn add(&mut self, container_name: &str, section_name: &str, delta: f64)
    {
        *self
            .by_segment
            .entry((container_name.to_string(), section_name.to_string()))
            .or_insert(0.0) += delta;
    }

    /// Accumulated drift of a segment, if it was ever touched.
    #[must_use]
    pub fn get(&self, container_name: &str, section_name: &str) -> Option<f64>
    {
        self.by_segment
            .get(&(container_name.to_string(), section_name.to_string()))
            .copied()
    }

    /// Number of segments touched.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.by_segment.len()
    }

    /// Whether no segment was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.by_segment.is_empty()
    }

    /// Segments whose drift rounds to a non-zero byte count, in
    /// `(container, section)` order.
    ///
    /// Rounding is half to even.
    pub fn rounded(&self) -> impl Iterator<Item = (&str, &str, i64)> + '_
    {
        self.by_segment.iter().filter_map(|((container, section), value)| {
            #[allow(clippy::cast_possible_truncation)]
            let rounded = value.round_ties_even() as i64;
            (rounded != 0).then_some((container.as_str(), section.as_str(), rounded))
        })
    }
}

/// Output of [`match_symbols`].
#[derive(Debug, Clone, Default)]
pub struct SymbolMatches
{
    /// Matched pairs, in pass order and, within a pass, after-list order.
    pub matched: Vec<DeltaSymbol>,
    /// Before symbols nothing matched, in original order.
    pub unmatched_before: Vec<Arc<Symbol>>,
    /// After symbols nothing matched, in original order.
    pub unmatched_after: Vec<Arc<Symbol>>,
    /// Padding drift of symbols matched by the exact pass.
    pub padding: PaddingAggregate,
}

impl SymbolMatches
{
    /// Flatten into delta symbols: matches, additions, removals, then one
    /// overhead symbol per segment whose padding drift rounds to non-zero.
    ///
    /// ## Errors
    ///
    /// Returns `UnknownContainer` if a padding segment names a container
    /// missing from `containers`.
    pub fn into_delta_group(self, containers: &[DeltaContainer]) -> SizeResult<DeltaSymbolGroup>
    {
        debug!(
            count = self.unmatched_after.len() + self.unmatched_before.len(),
            "Creating unmatched symbols"
        );
        let padding_symbols = padding_symbols(&self.padding, containers)?;

        let mut deltas = self.matched;
        deltas.extend(self.unmatched_after.into_iter().map(DeltaSymbol::added));
        deltas.extend(self.unmatched_before.into_iter().map(DeltaSymbol::removed));
        deltas.extend(padding_symbols.into_iter().map(DeltaSymbol::added));
        Ok(DeltaSymbolGroup::new(deltas))
    }
}

fn padding_symbols(padding: &PaddingAggregate, containers: &[DeltaContainer]) -> SizeResult<Vec<Arc<Symbol>>>
{
    padding
        .rounded()
        .map(|(container_name, section_name, bytes)| {
            let container = containers
                .iter()
                .find(|c| c.name == container_name)
                .ok_or_else(|| SizeError::UnknownContainer(container_name.to_string()))?;

            let mut sym = Symbol::new(section_name, bytes);
            sym.container_name.clone_from(&container.name);
            sym.set_name(AGGREGATE_PADDING_NAME);
            sym.padding = bytes;
            Ok(Arc::new(sym))
        })
        .collect()
}

struct PassOutcome
{
    matched: Vec<DeltaSymbol>,
    unmatched_before: Vec<Arc<Symbol>>,
    unmatched_after: Vec<Arc<Symbol>>,
}

fn run_pass<'a>(
    pass: &MatchPass,
    before: &'a [Arc<Symbol>],
    after: &'a [Arc<Symbol>],
    padding: &mut PaddingAggregate,
) -> PassOutcome
{
    debug!(pass = pass.name, "Building symbol index");
    let mut index: HashMap<MatchKey<'a>, VecDeque<usize>> = HashMap::new();
    for (position, sym) in before.iter().enumerate() {
        if let Some(key) = (pass.key)(sym) {
            index.entry(key).or_default().push_back(position);
        }
    }

    debug!(pass = pass.name, "Creating delta symbols");
    let mut claimed = vec![false; before.len()];
    let mut matched = Vec::new();
    let mut unmatched_after = Vec::new();
    for after_sym in after {
        let hit = match (pass.key)(after_sym) {
            Some(key) => index.get_mut(&key).and_then(VecDeque::pop_front),
            None => None,
        };

        let Some(position) = hit else {
            unmatched_after.push(Arc::clone(after_sym));
            continue;
        };

        claimed[position] = true;
        let before_sym = &before[position];
        // Padding-only symbols keep their padding, everything else is
        // tracked in aggregate.
        if pass.tracks_padding && before_sym.size_without_padding() != 0 {
            padding.add(
                &before_sym.container_name,
                &before_sym.section_name,
                after_sym.padding_pss() - before_sym.padding_pss(),
            );
        }
        matched.push(DeltaSymbol::matched(Arc::clone(before_sym), Arc::clone(after_sym)));
    }

    debug!(
        pass = pass.name,
        matched = matched.len(),
        total = after.len(),
        "Matched {} of {} symbols",
        matched.len(),
        after.len()
    );

    let unmatched_before = before
        .iter()
        .zip(claimed)
        .filter(|(_, claimed)| !claimed)
        .map(|(sym, _)| Arc::clone(sym))
        .collect();

    PassOutcome {
        matched,
        unmatched_before,
        unmatched_after,
    }
}

/// Pair up the symbols of two snapshots.
///
/// Runs every pass of [`MATCH_PASSES`] in order. Each before symbol ends up
/// in at most one pair and ties on a key go to the earliest before symbol.
#[must_use]
pub fn match_symbols(before: &[Arc<Symbol>], after: &[Arc<Symbol>]) -> SymbolMatches
{
    let mut matches = SymbolMatches {
        unmatched_before: before.to_vec(),
        unmatched_after: after.to_vec(),
        ..SymbolMatches::default()
    };

    for pass in &MATCH_PASSES {
        if matches.unmatched_before.is_empty() || matches.unmatched_after.is_empty() {
            break;
        }
        let outcome = run_pass(pass, &matches.unmatched_before, &matches.unmatched_after, &mut matches.padding);
        matches.matched.extend(outcome.matched);
        matches.unmatched_before = outcome.unmatched_before;
        matches.unmatched_after = outcome.unmatched_after;
    }

    matches
}
