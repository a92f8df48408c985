use jsoncompare_benches::available_corpora;
use jsoncompare_core::{compare, reduce, Algorithm, HashCache, UniqueDiffEntry};
use serde_json::json;

#[test]
fn top_level_readme_quickstart() -> Result<(), Box<dyn std::error::Error>> {
    let left = json!({"name": "widget", "tags": ["a"]});
    let right = json!({"name": "gadget", "tags": ["a", "b"]});

    let diff = compare(&left, &right, Algorithm::Structural, &HashCache::default())?
        .expect("both inputs are objects");
    assert_eq!(diff.left.different, ["$.name"]);
    assert_eq!(diff.right.extra, ["$.tags.[1]"]);

    let mut unique = reduce(&diff);
    assert_eq!(unique.current(), Some(&UniqueDiffEntry::paired("$.name")));
    assert_eq!(unique.next(), Some(&UniqueDiffEntry::right_only("$.tags.[1]")));
    Ok(())
}

#[test]
fn benches_readme_example() {
    let corpus = available_corpora().iter().find(|c| c.name() == "records").expect("registered corpus");
    let dataset = corpus.load();
    let unique = dataset.unique();
    assert_eq!(unique.len(), 10);
    assert!(unique.entries().iter().all(|entry| entry.path_left.as_deref().is_some_and(|p| p.ends_with(".status"))));
}
