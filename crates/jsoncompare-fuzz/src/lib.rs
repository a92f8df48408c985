//! Fuzzing harnesses for the `jsoncompare` engine.
//!
//! Each public function accepts raw bytes so it can be driven from a
//! `cargo fuzz` target as well as from ordinary tests. Recoverable errors are
//! swallowed; the harnesses assert the invariants that must hold for every
//! input instead.
//!
//! # Examples
//!
//! ```
//! jsoncompare_fuzz::fuzz_path_codec(b"$.a.\"b.c\".[0]");
//! jsoncompare_fuzz::fuzz_diff(&[1, 2, 3, 4]);
//! jsoncompare_fuzz::fuzz_reduce(b"example");
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use arbitrary::Unstructured;
use jsoncompare_core::path::{decode_pointer, encode_pointer};
use jsoncompare_core::{flat_diff, normalize, parse_document, reduce, structural_diff, Format, HashCache, Path};
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

const MAX_DEPTH: usize = 4;
const MAX_ARRAY_LEN: u8 = 6;
const MAX_OBJECT_LEN: u8 = 6;
const MAX_STRING_LEN: u8 = 12;

/// Decodes arbitrary text as a path and checks that re-encoding is stable.
///
/// Decoding is lenient, so any string yields some path; that path must then
/// survive both dialects unchanged.
///
/// ```
/// jsoncompare_fuzz::fuzz_path_codec(b"$..[01].\\\"x");
/// ```
pub fn fuzz_path_codec(data: &[u8]) {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let path = Path::decode(text);
    let encoded = path.encode();
    assert_eq!(Path::decode(&encoded), path, "dot notation round trip for {text:?}");
    assert_eq!(decode_pointer(&encode_pointer(&path)).editor_segments(), path.editor_segments());

    let _ = parse_document(text, Format::Json);
    let _ = parse_document(text, Format::Yaml);
}

/// Diffs two generated documents with both algorithms.
///
/// ```
/// jsoncompare_fuzz::fuzz_diff(b"seed");
/// ```
pub fn fuzz_diff(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let (Some(lhs), Some(rhs)) = (random_document(&mut unstructured), random_document(&mut unstructured)) else {
        return;
    };
    let cache = HashCache::new(64);

    assert!(structural_diff(&lhs, &lhs).is_ok_and(|diff| diff.is_empty()));
    if let Ok(diff) = structural_diff(&lhs, &rhs) {
        assert_eq!(diff.left.different, diff.right.different);
        for path in diff.left.missing.iter().chain(&diff.right.extra) {
            assert_eq!(&Path::decode(path).encode(), path);
        }
    }

    if let Some(diff) = flat_diff(&lhs, &rhs, &cache) {
        assert!(diff.left.extra.is_empty() && diff.right.missing.is_empty());
    }
    let flat = normalize(&lhs, &cache);
    for path in flat.keys() {
        assert_eq!(&Path::decode(path).encode(), path);
    }
}

/// Reduces the difference of two generated documents and walks the result.
///
/// ```
/// jsoncompare_fuzz::fuzz_reduce(b"reduce fuzz");
/// ```
pub fn fuzz_reduce(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let (Some(lhs), Some(rhs)) = (random_document(&mut unstructured), random_document(&mut unstructured)) else {
        return;
    };
    let Some(diff) = flat_diff(&lhs, &rhs, &HashCache::default()) else {
        return;
    };
    let mut unique = reduce(&diff);
    let len = unique.len();
    for _ in 0..=len {
        unique.next();
        assert!(unique.index() >= 1 && unique.index() <= len);
    }
    for _ in 0..=len {
        unique.previous();
        assert!(unique.index() >= 1 && unique.index() <= len);
    }
}

fn random_document(unstructured: &mut Unstructured<'_>) -> Option<JsonValue> {
    let value = json_value_from_unstructured(unstructured, 0).ok()?;
    matches!(value, JsonValue::Object(_) | JsonValue::Array(_)).then_some(value)
}

fn json_value_from_unstructured(
    unstructured: &mut Unstructured<'_>,
    depth: usize,
) -> Result<JsonValue, arbitrary::Error> {
    if depth >= MAX_DEPTH {
        return json_leaf(unstructured);
    }

    // Containers are weighted up so documents usually have some shape.
    let choice = unstructured.int_in_range::<u8>(0..=7)?;
    match choice {
        0 | 1 => json_leaf(unstructured),
        2..=4 => {
            let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_ARRAY_LEN)?);
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(json_value_from_unstructured(unstructured, depth + 1)?);
            }
            Ok(JsonValue::Array(items))
        }
        _ => {
            let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_OBJECT_LEN)?);
            let mut map = JsonMap::new();
            for _ in 0..len {
                let key = random_string(unstructured)?;
                let value = json_value_from_unstructured(unstructured, depth + 1)?;
                map.insert(key, value);
            }
            Ok(JsonValue::Object(map))
        }
    }
}

fn json_leaf(unstructured: &mut Unstructured<'_>) -> Result<JsonValue, arbitrary::Error> {
    match unstructured.int_in_range::<u8>(0..=3)? {
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        _ => Ok(JsonValue::String(random_string(unstructured)?)),
    }
}

fn random_number(unstructured: &mut Unstructured<'_>) -> Result<JsonNumber, arbitrary::Error> {
    if unstructured.arbitrary()? {
        Ok(JsonNumber::from(unstructured.arbitrary::<i64>()?))
    } else {
        let numerator = f64::from(unstructured.arbitrary::<i32>()?);
        let denominator = f64::from(unstructured.int_in_range::<u16>(1..=1024)?);
        JsonNumber::from_f64(numerator / denominator).ok_or(arbitrary::Error::IncorrectFormat)
    }
}

/// Printable ASCII, which covers every character the path codec treats
/// specially.
fn random_string(unstructured: &mut Unstructured<'_>) -> Result<String, arbitrary::Error> {
    let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_STRING_LEN)?);
    let mut string = String::with_capacity(len);
    for _ in 0..len {
        let byte = unstructured.int_in_range::<u8>(0x20..=0x7e)?;
        string.push(char::from(byte));
    }
    Ok(string)
}
