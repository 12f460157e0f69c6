//! Tests for snapshot diffing

use std::sync::Arc;

use crtools_size::diff::{diff, match_symbols, DiffOptions, AGGREGATE_PADDING_NAME};
use crtools_size::models::{Container, DiffStatus, SizeInfo, Symbol, SymbolFlags};
use pretty_assertions::assert_eq;

const LIB: &str = "libfoo.so";

fn sym(full_name: &str, path: &str, size: i64) -> Symbol
{
    let mut s = Symbol::new(".text", size);
    s.container_name = LIB.to_string();
    s.set_name(full_name);
    s.source_path = path.to_string();
    s
}

fn padded(mut s: Symbol, padding: i64) -> Symbol
{
    s.padding = padding;
    s
}

fn arcs(symbols: Vec<Symbol>) -> Vec<Arc<Symbol>>
{
    symbols.into_iter().map(Arc::new).collect()
}

fn snapshot(symbols: Vec<Symbol>) -> Arc<SizeInfo>
{
    Arc::new(SizeInfo::new(vec![Container::new(LIB)], symbols).unwrap())
}

fn count_ptr(haystack: impl IntoIterator<Item = Arc<Symbol>>, needle: &Arc<Symbol>) -> usize
{
    haystack.into_iter().filter(|s| Arc::ptr_eq(s, needle)).count()
}

#[test]
fn test_diff_against_itself_is_all_unchanged()
{
    let info = snapshot(vec![
        padded(sym("a()", "a.cc", 10), 2),
        sym("b()", "b.cc", 20),
        padded(sym("** symbol gap 0", "", 4), 4),
        sym("\"string literal\"", "c.cc", 8),
        sym("\"string literal\"", "c.cc", 8),
    ]);

    let matches = match_symbols(&info.raw_symbols, &info.raw_symbols);
    assert_eq!(matches.matched.len(), 5);
    assert!(matches.unmatched_before.is_empty());
    assert!(matches.unmatched_after.is_empty());
    assert_eq!(matches.padding.rounded().count(), 0);

    let delta = diff(Arc::clone(&info), info, DiffOptions::default()).unwrap();
    assert_eq!(delta.symbols.len(), 5);
    assert_eq!(delta.symbols.count_by_status().unchanged, 5);
    assert_eq!(delta.symbols.size(), 0);
}

#[test]
fn test_every_symbol_lands_in_exactly_one_pair()
{
    let before = arcs(vec![
        sym("kept()", "a.cc", 10),
        sym("resized()", "a.cc", 10),
        sym("gone()", "a.cc", 10),
        sym("moved()", "old.cc", 10),
        sym("dup", "a.cc", 1),
        sym("dup", "a.cc", 1),
    ]);
    let after = arcs(vec![
        sym("dup", "a.cc", 1),
        sym("moved()", "new.cc", 10),
        sym("new()", "a.cc", 10),
        sym("resized()", "a.cc", 30),
        sym("kept()", "a.cc", 10),
    ]);

    let matches = match_symbols(&before, &after);
    let matched_before: Vec<Arc<Symbol>> = matches.matched.iter().filter_map(|d| d.before().cloned()).collect();
    let matched_after: Vec<Arc<Symbol>> = matches.matched.iter().filter_map(|d| d.after().cloned()).collect();

    for s in &before {
        let uses = count_ptr(matched_before.iter().cloned(), s) + count_ptr(matches.unmatched_before.iter().cloned(), s);
        assert_eq!(uses, 1, "before symbol {s} used {uses} times");
    }
    for s in &after {
        let uses = count_ptr(matched_after.iter().cloned(), s) + count_ptr(matches.unmatched_after.iter().cloned(), s);
        assert_eq!(uses, 1, "after symbol {s} used {uses} times");
    }

    assert_eq!(matches.matched.len(), 4);
    let removed: Vec<&str> = matches.unmatched_before.iter().map(|s| s.full_name.as_str()).collect();
    assert_eq!(removed, vec!["gone()", "dup"]);
    let added: Vec<&str> = matches.unmatched_after.iter().map(|s| s.full_name.as_str()).collect();
    assert_eq!(added, vec!["new()"]);
}

#[test]
fn test_ties_go_to_earliest_before_symbol()
{
    let before = arcs(vec![sym("\"str\"", "a.cc", 4), sym("\"str\"", "a.cc", 4)]);
    let after = arcs(vec![sym("\"str\"", "a.cc", 4)]);

    let matches = match_symbols(&before, &after);
    assert_eq!(matches.matched.len(), 1);
    assert!(Arc::ptr_eq(matches.matched[0].before().unwrap(), &before[0]));
    assert_eq!(matches.unmatched_before.len(), 1);
    assert!(Arc::ptr_eq(&matches.unmatched_before[0], &before[1]));
}

#[test]
fn test_size_change_matches_in_resized_pass()
{
    // Padding drift is only tracked for exact matches, so an empty aggregate
    // shows the pair was not claimed by the first pass.
    let before = arcs(vec![padded(sym("f()", "f.cc", 10), 1)]);
    let after = arcs(vec![padded(sym("f()", "f.cc", 40), 9)]);

    let matches = match_symbols(&before, &after);
    assert_eq!(matches.matched.len(), 1);
    assert!(matches.padding.is_empty());

    let delta = &matches.matched[0];
    assert_eq!(delta.diff_status(), DiffStatus::Changed);
    assert_eq!(delta.size_without_padding(), 22);
    assert_eq!(delta.padding(), 0);
}

#[test]
fn test_numbered_suffixes_match_exactly()
{
    let before = arcs(vec![padded(sym(".L.ref.tmp.2", "f.cc", 8), 1)]);
    let after = arcs(vec![padded(sym(".L.ref.tmp.7", "f.cc", 8), 1)]);

    let matches = match_symbols(&before, &after);
    assert_eq!(matches.matched.len(), 1);
    // Claimed by the exact pass, which records the segment even at zero drift.
    assert_eq!(matches.padding.get(LIB, ".text"), Some(0.0));
}

#[test]
fn test_clone_suffix_matches_in_renamed_pass()
{
    let before = arcs(vec![sym("Foo::bar()", "foo.cc", 10)]);
    let after = arcs(vec![sym("Foo::bar() [clone .1234]", "foo.cc", 12)]);

    let matches = match_symbols(&before, &after);
    assert_eq!(matches.matched.len(), 1);
    assert!(matches.unmatched_before.is_empty());
    assert!(matches.unmatched_after.is_empty());
}

#[test]
fn test_signature_change_matches_in_renamed_pass()
{
    let mut before = sym("Foo::bar(int)", "foo.cc", 10);
    before.name = "bar".to_string();
    let mut after = sym("Foo::bar(long)", "foo.cc", 10);
    after.name = "bar".to_string();

    let matches = match_symbols(&arcs(vec![before]), &arcs(vec![after]));
    assert_eq!(matches.matched.len(), 1);
}

#[test]
fn test_moved_unique_symbol_matches()
{
    let before = arcs(vec![sym("Foo::Moved()", "old/foo.cc", 10)]);
    let after = arcs(vec![sym("Foo::Moved()", "new/foo.cc", 16)]);

    let matches = match_symbols(&before, &after);
    assert_eq!(matches.matched.len(), 1);
    assert_eq!(matches.matched[0].size(), 6);
}

#[test]
fn test_ambiguous_names_never_match_when_moved()
{
    let flagged = |path: &str| {
        let mut s = sym("dup", path, 4);
        s.flags = SymbolFlags::NOT_UNIQUE;
        s
    };
    let before = arcs(vec![flagged("a.cc"), flagged("b.cc")]);
    let after = arcs(vec![flagged("c.cc"), flagged("d.cc")]);

    let matches = match_symbols(&before, &after);
    assert!(matches.matched.is_empty());
    assert_eq!(matches.unmatched_before.len(), 2);
    assert_eq!(matches.unmatched_after.len(), 2);

    let info_before = snapshot(before.iter().map(|s| Symbol::clone(s)).collect());
    let info_after = snapshot(after.iter().map(|s| Symbol::clone(s)).collect());
    let delta = diff(info_before, info_after, DiffOptions::default()).unwrap();
    let counts = delta.symbols.count_by_status();
    assert_eq!((counts.added, counts.removed), (2, 2));
}

#[test]
fn test_small_padding_drift_emits_no_overhead()
{
    let mut before = padded(sym("f()", "f.cc", 10), 2);
    before.num_aliases = 4;
    let mut after = padded(sym("f()", "f.cc", 11), 3);
    after.num_aliases = 4;

    let delta = diff(snapshot(vec![before]), snapshot(vec![after]), DiffOptions::default()).unwrap();
    assert_eq!(delta.symbols.len(), 1);
    assert!(!delta.symbols.iter().any(|d| d.is_overhead()));
}

#[test]
fn test_padding_drift_emits_one_overhead_symbol_per_segment()
{
    let mut data_before = padded(sym("kData", "d.cc", 12), 4);
    data_before.section_name = ".data".to_string();
    let mut data_after = padded(sym("kData", "d.cc", 9), 1);
    data_after.section_name = ".data".to_string();

    let before = vec![padded(sym("f()", "f.cc", 10), 2), padded(sym("g()", "g.cc", 10), 0), data_before];
    let after = vec![padded(sym("f()", "f.cc", 11), 3), padded(sym("g()", "g.cc", 11), 1), data_after];

    let delta = diff(snapshot(before), snapshot(after), DiffOptions::default()).unwrap();
    let overhead: Vec<(String, i64)> = delta
        .symbols
        .iter()
        .filter(|d| d.is_overhead())
        .map(|d| (d.section_name().to_string(), d.size()))
        .collect();
    assert_eq!(overhead, vec![(".data".to_string(), -3), (".text".to_string(), 2)]);

    for d in delta.symbols.iter().filter(|d| d.is_overhead()) {
        assert_eq!(d.full_name(), AGGREGATE_PADDING_NAME);
        assert_eq!(d.container_name(), LIB);
        assert_eq!(d.diff_status(), DiffStatus::Added);
        assert!(d.before().is_none());
    }

    // Matched symbols report no padding change themselves, so the overhead
    // symbols keep the total size delta intact.
    assert_eq!(delta.symbols.size(), (11 + 11 + 9) - (10 + 10 + 12));
}

#[test]
fn test_padding_only_symbols_keep_their_padding()
{
    let before = vec![padded(sym("** symbol gap 0", "", 4), 4)];
    let after = vec![padded(sym("** symbol gap 0", "", 4), 4), padded(sym("** symbol gap 1", "", 8), 8)];

    let delta = diff(snapshot(before), snapshot(after), DiffOptions::default()).unwrap();
    assert!(!delta.symbols.iter().any(|d| d.is_overhead()));
    assert_eq!(delta.symbols.size(), 8);
}

#[test]
fn test_sorted_diff_puts_largest_change_first()
{
    let before = vec![sym("small()", "a.cc", 10), sym("big()", "a.cc", 10)];
    let after = vec![sym("small()", "a.cc", 11), sym("big()", "a.cc", 110), sym("new()", "a.cc", 50)];

    let delta = diff(snapshot(before), snapshot(after), DiffOptions { sort: true }).unwrap();
    let names: Vec<&str> = delta.symbols.iter().map(|d| d.full_name()).collect();
    assert_eq!(names, vec!["big()", "new()", "small()"]);
}

#[test]
fn test_summary_counts_and_sections()
{
    let before = Arc::new(
        SizeInfo::new(
            vec![Container::new(LIB), Container::new("libold.so")],
            vec![sym("kept()", "a.cc", 10), sym("gone()", "a.cc", 5)],
        )
        .unwrap(),
    );
    let after = Arc::new(
        SizeInfo::new(
            vec![Container::new("libnew.so"), Container::new(LIB)],
            vec![sym("kept()", "a.cc", 10), sym("added()", "a.cc", 7)],
        )
        .unwrap(),
    );

    let summary = diff(before, after, DiffOptions::default()).unwrap().summary();
    assert_eq!(summary.counts.unchanged, 1);
    assert_eq!(summary.counts.added, 1);
    assert_eq!(summary.counts.removed, 1);
    assert_eq!(summary.size_delta, 2);
    assert_eq!(summary.section_deltas.get(".text"), Some(&2));
    assert_eq!(summary.added_containers, vec!["libnew.so".to_string()]);
    assert_eq!(summary.removed_containers, vec!["libold.so".to_string()]);
}

fn path_alias(path: &str, size: i64) -> Symbol
{
    let mut s = sym("Foo::Bar()", path, size);
    s.address = 0x4000;
    s.num_aliases = 3;
    s
}

#[test]
fn test_sorted_diff_groups_path_aliases()
{
    let before = vec![
        path_alias("a.h", 30),
        sym("baz()", "b.cc", 10),
        path_alias("b.h", 30),
        path_alias("c.h", 30),
    ];
    let after = vec![
        path_alias("a.h", 90),
        sym("baz()", "b.cc", 25),
        path_alias("b.h", 90),
        path_alias("c.h", 90),
    ];

    let unsorted = diff(snapshot(before.clone()), snapshot(after.clone()), DiffOptions::default()).unwrap();
    assert_eq!(unsorted.symbols.len(), 4);

    let delta = diff(snapshot(before), snapshot(after), DiffOptions { sort: true }).unwrap();
    let rows: Vec<(&str, usize, i64)> = delta
        .symbols
        .iter()
        .map(|d| (d.full_name(), d.alias_count(), d.size()))
        .collect();
    assert_eq!(rows, vec![("Foo::Bar()", 3, 60), ("baz()", 1, 15)]);
    assert!((delta.symbols.iter().next().unwrap().pss() - 60.0).abs() < 1e-9);
}

#[test]
fn test_unnamed_container_is_present_on_both_sides()
{
    let snapshot_json = r#"{
        "containers": [{ "name": "" }],
        "symbols": [{ "section_name": ".text", "size": 12, "full_name": "main", "name": "main" }]
    }"#;
    let before = Arc::new(SizeInfo::from_reader(snapshot_json.as_bytes()).unwrap());
    let after = Arc::new(SizeInfo::from_reader(snapshot_json.as_bytes()).unwrap());

    let delta = diff(before, after, DiffOptions::default()).unwrap();
    let summary = delta.summary();
    assert_eq!(delta.containers.len(), 1);
    assert!(summary.added_containers.is_empty());
    assert!(summary.removed_containers.is_empty());
    assert_eq!(summary.counts.unchanged, 1);
}
