//! Match keys used by the symbol diff.
//!
//! Each pass of the diff groups symbols by a key derived from their
//! attributes. Keys go from strictest to loosest so that the cheap exact pass
//! claims the bulk of unchanged symbols, and later passes only see what is
//! left.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Section, Symbol};

// Non-stable numbers in names:
// - names generated by macros that use __LINE__
// - toolchain-generated ".N" suffixes, e.g. ".L.ref.tmp.2"
// - Java anonymous classes, e.g. "SingleCategoryPreferences$3#this$0"
static STRIP_NUMBERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.0-9]+$|\$\d+").expect("strip-numbers regex"));

// "* symbol gap 3 (bar)" -> "* symbol gaps"
static STAR_SYMBOL_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\d+( \(.*\))?$").expect("star-symbol regex"));

const CLONE_MARKER: &str = " [clone ";

/// Grouping key for one match pass.
///
/// Fields a pass does not care about are left as `None`; since every symbol
/// of a pass is keyed by the same function this never mixes key shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey<'a>
{
    pub container: &'a str,
    pub section: Section,
    pub name: Cow<'a, str>,
    pub path: Option<&'a str>,
    pub size: Option<i64>,
}

/// Key extraction function. `None` opts a symbol out of the pass.
pub type KeyFn = for<'a> fn(&'a Symbol) -> Option<MatchKey<'a>>;

/// One pass of the symbol diff.
#[derive(Clone, Copy)]
pub struct MatchPass
{
    /// Label used in logs.
    pub name: &'static str,
    /// Key extraction function.
    pub key: KeyFn,
    /// Whether matches found by this pass feed the padding aggregate.
    pub tracks_padding: bool,
}

impl std::fmt::Debug for MatchPass
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("MatchPass")
            .field("name", &self.name)
            .field("tracks_padding", &self.tracks_padding)
            .finish_non_exhaustive()
    }
}

/// Passes in the order they run.
pub const MATCH_PASSES: [MatchPass; 4] = [
    MatchPass {
        name: "exact",
        key: exact_key,
        tracks_padding: true,
    },
    MatchPass {
        name: "resized",
        key: resized_key,
        tracks_padding: false,
    },
    MatchPass {
        name: "renamed",
        key: renamed_key,
        tracks_padding: false,
    },
    MatchPass {
        name: "moved",
        key: moved_key,
        tracks_padding: false,
    },
];

/// Remove compiler and linker generated numbering from a name.
#[must_use]
pub fn strip_numbers(name: &str) -> Cow<'_, str>
{
    STRIP_NUMBERS.replace_all(name, "")
}

/// Normalize a short name for the `renamed` pass.
#[must_use]
pub fn normalize_short_name(name: &str) -> Cow<'_, str>
{
    let mut name = strip_numbers(name);
    if let Some(idx) = name.find(CLONE_MARKER) {
        name = match name {
            Cow::Borrowed(name) => Cow::Borrowed(&name[..idx]),
            Cow::Owned(mut name) => {
                name.truncate(idx);
                Cow::Owned(name)
            }
        };
    }
    if name.starts_with('*') {
        name = Cow::Owned(STAR_SYMBOL_SUFFIX.replace(&name, "s").into_owned());
    }
    name
}

/// Unchanged symbols: same container, section, normalized full name, path and
/// size without padding.
///
/// Size matters for string literals, which all share one name but shift order
/// whenever one is added.
pub fn exact_key(sym: &Symbol) -> Option<MatchKey<'_>>
{
    let mut key = resized_key(sym)?;
    key.size = Some(sym.size_without_padding());
    Some(key)
}

/// Like [`exact_key`], but the size may change.
pub fn resized_key(sym: &Symbol) -> Option<MatchKey<'_>>
{
    Some(MatchKey {
        container: &sym.container_name,
        section: sym.section(),
        name: strip_numbers(&sym.full_name),
        path: Some(sym.source_or_object_path()),
        size: None,
    })
}

/// Like [`resized_key`], but uses the short name so signature changes and
/// clones still match.
pub fn renamed_key(sym: &Symbol) -> Option<MatchKey<'_>>
{
    Some(MatchKey {
        container: &sym.container_name,
        section: sym.section(),
        name: normalize_short_name(&sym.name),
        path: Some(sym.source_or_object_path()),
        size: None,
    })
}

/// Full name without path, to follow symbols across file moves. Only usable
/// for names known to be unique.
pub fn moved_key(sym: &Symbol) -> Option<MatchKey<'_>>
{
    if !sym.is_name_unique() {
        return None;
    }
    Some(MatchKey {
        container: &sym.container_name,
        section: sym.section(),
        name: Cow::Borrowed(&sym.full_name),
        path: None,
        size: None,
    })
}
