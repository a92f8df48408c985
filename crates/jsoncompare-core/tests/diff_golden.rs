use std::fs;
use std::path::Path;

use jsoncompare_core::{compare, reduce, structural_diff, Algorithm, Difference, HashCache};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Fixture {
    lhs: Value,
    rhs: Value,
    diff: Difference,
}

fn load_fixtures() -> Vec<(String, Fixture)> {
    let fixtures_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/structural");
    let mut entries: Vec<_> = fs::read_dir(&fixtures_root)
        .expect("fixtures directory must exist")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();
    assert!(!entries.is_empty(), "expected at least one fixture under tests/fixtures/structural");

    entries
        .into_iter()
        .map(|path| {
            let data = fs::read_to_string(&path).expect("fixture should be readable");
            let fixture = serde_json::from_str(&data).expect("fixture should deserialize");
            (path.display().to_string(), fixture)
        })
        .collect()
}

#[test]
fn structural_golden_parity() {
    for (name, fixture) in load_fixtures() {
        let diff = structural_diff(&fixture.lhs, &fixture.rhs).expect("fixture inputs are containers");
        assert_eq!(diff, fixture.diff, "fixture {name}");
    }
}

#[test]
fn compare_dispatches_to_structural() {
    let cache = HashCache::default();
    for (name, fixture) in load_fixtures() {
        let diff = compare(&fixture.lhs, &fixture.rhs, Algorithm::Structural, &cache).expect("valid input");
        assert_eq!(diff.as_ref(), Some(&fixture.diff), "fixture {name}");
    }
}

#[test]
fn flat_agrees_on_leaf_changes() {
    // Flat reports enclosing containers too, so only check that every leaf
    // the structural diff flags is also flagged by the flat diff.
    let cache = HashCache::default();
    for (name, fixture) in load_fixtures() {
        let flat = compare(&fixture.lhs, &fixture.rhs, Algorithm::Flat, &cache).unwrap().expect("containers");
        for path in &fixture.diff.left.missing {
            assert!(flat.left.missing.contains(path) || flat.left.different.contains(path), "{name}: {path}");
        }
        for path in &fixture.diff.right.extra {
            assert!(flat.right.extra.contains(path) || flat.right.different.contains(path), "{name}: {path}");
        }
        assert!(flat.left.extra.is_empty(), "{name}");
        assert!(flat.right.missing.is_empty(), "{name}");
    }
}

#[test]
fn reducer_visits_every_golden_change_once() {
    for (name, fixture) in load_fixtures() {
        let unique = reduce(&fixture.diff);
        let expected = fixture.diff.left.different.len() + fixture.diff.left.missing.len() + fixture.diff.right.extra.len();
        assert_eq!(unique.len(), expected, "fixture {name}");
        assert_eq!(unique.index(), usize::from(expected > 0), "fixture {name}");
    }
}
