//! Synthetic corpora shared by the benchmark suite and its smoke tests.
//!
//! Every corpus is generated deterministically, so benchmark numbers stay
//! comparable across machines without checked-in fixtures.
//!
//! ```
//! use jsoncompare_benches::available_corpora;
//!
//! let corpus = available_corpora().iter().find(|c| c.name() == "wide-object").unwrap();
//! let dataset = corpus.load();
//! assert!(!dataset.structural().is_empty());
//! ```
#![forbid(unsafe_code)]

use jsoncompare_core::{flat_diff, reduce, structural_diff, Difference, HashCache, UniqueDiffs};
use serde_json::{json, Map, Value};

/// A named generator for a pair of documents.
#[derive(Debug, Clone, Copy)]
pub struct Corpus {
    name: &'static str,
    generate: fn() -> Dataset,
}

impl Corpus {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn load(&self) -> Dataset {
        (self.generate)()
    }
}

/// The before/after pair of one corpus.
#[derive(Debug, Clone)]
pub struct Dataset {
    before: Value,
    after: Value,
}

impl Dataset {
    pub fn before(&self) -> &Value {
        &self.before
    }

    pub fn after(&self) -> &Value {
        &self.after
    }

    /// Serialized size of both documents, for throughput reporting.
    pub fn byte_len(&self) -> usize {
        [&self.before, &self.after].iter().map(|value| value.to_string().len()).sum()
    }

    /// Every generated pair is two objects or two arrays, so this cannot
    /// fail; an empty difference is returned rather than panicking if it did.
    pub fn structural(&self) -> Difference {
        structural_diff(&self.before, &self.after).unwrap_or_default()
    }

    pub fn flat(&self, cache: &HashCache) -> Difference {
        flat_diff(&self.before, &self.after, cache).unwrap_or_default()
    }

    pub fn unique(&self) -> UniqueDiffs {
        reduce(&self.structural())
    }
}

const CORPORA: &[Corpus] = &[
    Corpus { name: "wide-object", generate: wide_object },
    Corpus { name: "deep-nesting", generate: deep_nesting },
    Corpus { name: "long-array", generate: long_array },
    Corpus { name: "records", generate: records },
];

pub fn available_corpora() -> &'static [Corpus] {
    CORPORA
}

/// 2000 keys with every 50th value changed, a handful removed and added.
fn wide_object() -> Dataset {
    let mut before = Map::new();
    let mut after = Map::new();
    for i in 0..2000 {
        let key = format!("key_{i:04}");
        before.insert(key.clone(), json!(i));
        if i % 97 == 0 {
            continue;
        }
        let value = if i % 50 == 0 { json!(format!("changed {i}")) } else { json!(i) };
        after.insert(key, value);
    }
    for i in 0..20 {
        after.insert(format!("new.{i}"), json!({ "added": true }));
    }
    Dataset { before: Value::Object(before), after: Value::Object(after) }
}

/// A 64-level chain of objects differing only at the bottom.
fn deep_nesting() -> Dataset {
    let nest = |leaf: Value| {
        (0..64).fold(leaf, |inner, depth| {
            json!({ format!("level{depth}"): inner, "sibling": [depth, depth + 1] })
        })
    };
    Dataset { before: nest(json!("bottom")), after: nest(json!("changed")) }
}

/// 5000 numbers, with a tail appended and a few interior edits.
fn long_array() -> Dataset {
    let before: Vec<Value> = (0..5000).map(|i| json!(i)).collect();
    let mut after = before.clone();
    for i in (0..5000).step_by(500) {
        after[i] = json!(-1);
    }
    after.extend((0..100).map(|i| json!({ "tail": i })));
    Dataset { before: Value::Array(before), after: Value::Array(after) }
}

/// An array of API-style records where most entries are untouched.
fn records() -> Dataset {
    let record = |id: u64, status: &str| {
        json!({
            "id": id,
            "status": status,
            "owner": { "name": format!("user {}", id % 17), "teams": ["core", "infra"] },
            "labels": ["bug", "triage"],
            "meta": { "created": "2024-01-01", "score": 0.5 }
        })
    };
    let before: Vec<Value> = (0..400).map(|id| record(id, "open")).collect();
    let after: Vec<Value> =
        (0..400).map(|id| record(id, if id % 40 == 0 { "closed" } else { "open" })).collect();
    Dataset { before: Value::Array(before), after: Value::Array(after) }
}
