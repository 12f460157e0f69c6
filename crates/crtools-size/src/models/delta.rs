//! Delta types produced by diffing two snapshots.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{DeltaContainer, Section, SizeInfo, Symbol};

/// How a symbol changed between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus
{
    /// Matched, and neither size nor pss moved.
    Unchanged,
    /// Matched, with a size or pss delta.
    Changed,
    /// Only present in the "after" snapshot.
    Added,
    /// Only present in the "before" snapshot.
    Removed,
}

impl fmt::Display for DiffStatus
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            Self::Unchanged => "=",
            Self::Changed => "~",
            Self::Added => "+",
            Self::Removed => "-",
        };
        write!(f, "{label}")
    }
}

/// A symbol as it appears on either side of a diff.
///
/// At least one side is always present: a missing "before" side denotes an
/// addition, a missing "after" side a removal.
///
/// A delta may also stand for a group of path aliases (see
/// [`DeltaSymbolGroup::grouped_by_aliases`]). Its sides are then the first
/// present side among its members.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaSymbol
{
    before: Option<Arc<Symbol>>,
    after: Option<Arc<Symbol>>,
    aliases: Vec<DeltaSymbol>,
}

// Identity of a path-alias set: every alias shares these.
#[derive(PartialEq, Eq, Hash)]
struct AliasKey
{
    container_name: String,
    section_name: String,
    full_name: String,
    address: u64,
    num_aliases: u32,
    is_after: bool,
}

impl DeltaSymbol
{
    /// Pair a symbol with its counterpart in the other snapshot.
    #[must_use]
    pub fn matched(before: Arc<Symbol>, after: Arc<Symbol>) -> Self
    {
        Self {
            before: Some(before),
            after: Some(after),
            aliases: Vec::new(),
        }
    }

    /// A symbol that only exists in the "after" snapshot.
    #[must_use]
    pub fn added(after: Arc<Symbol>) -> Self
    {
        Self {
            before: None,
            after: Some(after),
            aliases: Vec::new(),
        }
    }

    /// A symbol that only exists in the "before" snapshot.
    #[must_use]
    pub fn removed(before: Arc<Symbol>) -> Self
    {
        Self {
            before: Some(before),
            after: None,
            aliases: Vec::new(),
        }
    }

    // Callers pass at least two members.
    fn alias_group(members: Vec<DeltaSymbol>) -> Self
    {
        let before = members.iter().find_map(|m| m.before.clone());
        let after = members.iter().find_map(|m| m.after.clone());
        Self {
            before,
            after,
            aliases: members,
        }
    }

    /// Members of an alias group; empty for a plain delta.
    #[must_use]
    pub fn aliases(&self) -> &[DeltaSymbol]
    {
        &self.aliases
    }

    /// Number of path aliases this delta stands for.
    #[must_use]
    pub fn alias_count(&self) -> usize
    {
        self.aliases.len().max(1)
    }

    fn alias_key(&self) -> Option<AliasKey>
    {
        let (sym, is_after) = match (&self.after, &self.before) {
            (Some(sym), _) => (sym, true),
            (None, Some(sym)) => (sym, false),
            (None, None) => return None,
        };
        (sym.num_aliases > 1 && !sym.is_overhead()).then(|| AliasKey {
            container_name: sym.container_name.clone(),
            section_name: sym.section_name.clone(),
            full_name: sym.full_name.clone(),
            address: sym.address,
            num_aliases: sym.num_aliases,
            is_after,
        })
    }

    /// "Before" side, if any.
    #[must_use]
    pub fn before(&self) -> Option<&Arc<Symbol>>
    {
        self.before.as_ref()
    }

    /// "After" side, if any.
    #[must_use]
    pub fn after(&self) -> Option<&Arc<Symbol>>
    {
        self.after.as_ref()
    }

    // Names and attribution come from the newer side when there is one.
    fn representative(&self) -> &Symbol
    {
        match (&self.after, &self.before) {
            (Some(sym), _) | (None, Some(sym)) => sym,
            (None, None) => unreachable!("delta symbol without either side"),
        }
    }

    /// Full name of the symbol.
    #[must_use]
    pub fn full_name(&self) -> &str
    {
        &self.representative().full_name
    }

    /// Unqualified name of the symbol.
    #[must_use]
    pub fn name(&self) -> &str
    {
        &self.representative().name
    }

    /// Container the symbol belongs to.
    #[must_use]
    pub fn container_name(&self) -> &str
    {
        &self.representative().container_name
    }

    /// Raw section name.
    #[must_use]
    pub fn section_name(&self) -> &str
    {
        &self.representative().section_name
    }

    /// Section classification.
    #[must_use]
    pub fn section(&self) -> Section
    {
        self.representative().section()
    }

    /// Whether this delta describes synthetic overhead.
    #[must_use]
    pub fn is_overhead(&self) -> bool
    {
        self.representative().is_overhead()
    }

    fn delta<T>(&self, f: impl Fn(&Symbol) -> T) -> (T, T)
    where
        T: Default,
    {
        let before = self.before.as_deref().map(&f).unwrap_or_default();
        let after = self.after.as_deref().map(&f).unwrap_or_default();
        (before, after)
    }

    // Padding of symbols matched by content is accounted for in aggregate by
    // the diff. Only padding-only symbols and overhead keep theirs.
    fn padding_is_attributed(&self) -> bool
    {
        if !self.aliases.is_empty() {
            return self.aliases.iter().all(DeltaSymbol::padding_is_attributed);
        }
        match (&self.before, &self.after) {
            (Some(before), Some(after)) => {
                self.is_overhead() || (before.size_without_padding() == 0 && after.size_without_padding() == 0)
            }
            _ => true,
        }
    }

    /// Change in size, padding excluded.
    #[must_use]
    pub fn size_without_padding(&self) -> i64
    {
        let (before, after) = self.delta(Symbol::size_without_padding);
        after - before
    }

    /// Change in padding attributed to this symbol.
    #[must_use]
    pub fn padding(&self) -> i64
    {
        if !self.padding_is_attributed() {
            return 0;
        }
        let (before, after) = self.delta(|s| s.padding);
        after - before
    }

    /// Change in size.
    #[must_use]
    pub fn size(&self) -> i64
    {
        self.size_without_padding() + self.padding()
    }

    /// Change in proportional size (size shared among aliases).
    #[must_use]
    pub fn pss(&self) -> f64
    {
        if !self.aliases.is_empty() {
            return self.aliases.iter().map(DeltaSymbol::pss).sum();
        }
        let (before, after) = self.delta(|s| s.pss() - s.padding_pss());
        let mut pss = after - before;
        if self.padding_is_attributed() {
            let (before, after) = self.delta(Symbol::padding_pss);
            pss += after - before;
        }
        pss
    }

    /// Classify the change.
    #[must_use]
    pub fn diff_status(&self) -> DiffStatus
    {
        if !self.aliases.is_empty() {
            let all = |status| self.aliases.iter().all(|m| m.diff_status() == status);
            if all(DiffStatus::Added) {
                return DiffStatus::Added;
            }
            if all(DiffStatus::Removed) {
                return DiffStatus::Removed;
            }
        }
        match (&self.before, &self.after) {
            (None, _) => DiffStatus::Added,
            (_, None) => DiffStatus::Removed,
            _ if self.size() != 0 || self.pss().abs() > f64::EPSILON => DiffStatus::Changed,
            _ => DiffStatus::Unchanged,
        }
    }

    /// Flat serializable view for reports.
    #[must_use]
    pub fn to_record(&self) -> DeltaRecord
    {
        DeltaRecord {
            status: self.diff_status(),
            container: self.container_name().to_string(),
            section: self.section_name().to_string(),
            full_name: self.full_name().to_string(),
            size: self.size(),
            padding: self.padding(),
            pss: self.pss(),
            aliases: self.alias_count(),
        }
    }
}

/// Serializable row describing one [`DeltaSymbol`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaRecord
{
    pub status: DiffStatus,
    pub container: String,
    pub section: String,
    pub full_name: String,
    pub size: i64,
    pub padding: i64,
    pub pss: f64,
    pub aliases: usize,
}

/// Number of delta symbols per [`DiffStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts
{
    pub unchanged: usize,
    pub changed: usize,
    pub added: usize,
    pub removed: usize,
}

/// Ordered collection of delta symbols.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaSymbolGroup
{
    symbols: Vec<DeltaSymbol>,
}

impl DeltaSymbolGroup
{
    /// Wrap a list of deltas, keeping its order.
    #[must_use]
    pub fn new(symbols: Vec<DeltaSymbol>) -> Self
    {
        Self { symbols }
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DeltaSymbol>
    {
        self.symbols.iter()
    }

    /// Number of deltas.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    /// Whether the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }

    /// Deltas with the given status, in order.
    pub fn filter_status(&self, status: DiffStatus) -> impl Iterator<Item = &DeltaSymbol> + '_
    {
        self.symbols.iter().filter(move |s| s.diff_status() == status)
    }

    /// Tally deltas by status.
    #[must_use]
    pub fn count_by_status(&self) -> StatusCounts
    {
        let mut counts = StatusCounts::default();
        for sym in &self.symbols {
            match sym.diff_status() {
                DiffStatus::Unchanged => counts.unchanged += 1,
                DiffStatus::Changed => counts.changed += 1,
                DiffStatus::Added => counts.added += 1,
                DiffStatus::Removed => counts.removed += 1,
            }
        }
        counts
    }

    /// Largest absolute pss change first, ties broken by full name.
    #[must_use]
    pub fn sorted(mut self) -> Self
    {
        self.symbols.sort_by(|a, b| {
            b.pss()
                .abs()
                .partial_cmp(&a.pss().abs())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.full_name().cmp(b.full_name()))
        });
        self
    }

    /// Merge the path aliases of each symbol into one delta.
    ///
    /// Deltas whose newer side has more than one alias are keyed by that
    /// side's container, section, full name, address and alias count. Every
    /// key shared by two or more deltas becomes a single alias group placed
    /// where its first member was.
    #[must_use]
    pub fn grouped_by_aliases(self) -> Self
    {
        let mut slots: Vec<Vec<DeltaSymbol>> = Vec::with_capacity(self.symbols.len());
        let mut slot_by_key: HashMap<AliasKey, usize> = HashMap::new();
        for sym in self.symbols {
            let Some(key) = sym.alias_key() else {
                slots.push(vec![sym]);
                continue;
            };
            match slot_by_key.entry(key) {
                Entry::Occupied(slot) => slots[*slot.get()].push(sym),
                Entry::Vacant(slot) => {
                    slot.insert(slots.len());
                    slots.push(vec![sym]);
                }
            }
        }

        let symbols = slots
            .into_iter()
            .filter_map(|mut members| match members.len() {
                1 => members.pop(),
                _ => Some(DeltaSymbol::alias_group(members)),
            })
            .collect();
        Self { symbols }
    }

    /// Total size change.
    #[must_use]
    pub fn size(&self) -> i64
    {
        self.symbols.iter().map(DeltaSymbol::size).sum()
    }
}

impl<'a> IntoIterator for &'a DeltaSymbolGroup
{
    type Item = &'a DeltaSymbol;
    type IntoIter = std::slice::Iter<'a, DeltaSymbol>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.symbols.iter()
    }
}

impl IntoIterator for DeltaSymbolGroup
{
    type Item = DeltaSymbol;
    type IntoIter = std::vec::IntoIter<DeltaSymbol>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.symbols.into_iter()
    }
}

/// Result of diffing two snapshots.
#[derive(Debug, Clone)]
pub struct DeltaSizeInfo
{
    /// The "before" snapshot.
    pub before: Arc<SizeInfo>,
    /// The "after" snapshot.
    pub after: Arc<SizeInfo>,
    /// Containers of both snapshots, lined up by name.
    pub containers: Vec<DeltaContainer>,
    /// Symbol deltas.
    pub symbols: DeltaSymbolGroup,
}

/// Headline numbers of a [`DeltaSizeInfo`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffSummary
{
    /// Symbols per status.
    pub counts: StatusCounts,
    /// Total size change in bytes.
    pub size_delta: i64,
    /// Size change per raw section name.
    pub section_deltas: BTreeMap<String, i64>,
    /// Containers only present after.
    pub added_containers: Vec<String>,
    /// Containers only present before.
    pub removed_containers: Vec<String>,
}

impl DeltaSizeInfo
{
    /// Summarize the diff.
    #[must_use]
    pub fn summary(&self) -> DiffSummary
    {
        let mut section_deltas = BTreeMap::new();
        for sym in &self.symbols {
            *section_deltas.entry(sym.section_name().to_string()).or_insert(0) += sym.size();
        }

        DiffSummary {
            counts: self.symbols.count_by_status(),
            size_delta: self.symbols.size(),
            section_deltas,
            added_containers: self
                .containers
                .iter()
                .filter(|c| c.is_added())
                .map(|c| c.name.clone())
                .collect(),
            removed_containers: self
                .containers
                .iter()
                .filter(|c| c.is_removed())
                .map(|c| c.name.clone())
                .collect(),
        }
    }
}
