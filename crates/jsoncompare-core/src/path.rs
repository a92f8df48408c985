//! Path codec.
//!
//! Paths are rendered as `$`-rooted dot notation: object keys follow a `.`
//! verbatim, array indices render as `[N]`, and keys that contain a `.` (or
//! would otherwise be ambiguous) are wrapped in double quotes. Backslash
//! escapes `\`, `'` and `"` inside keys.
//!
//! ```
//! # use jsoncompare_core::{Path, PathSegment};
//! let path = Path::decode(r#"$.servers."eu.west".[0]"#);
//! assert_eq!(
//!     path.segments(),
//!     [PathSegment::key("servers"), PathSegment::key("eu.west"), PathSegment::index(0usize)]
//! );
//! assert_eq!(path.encode(), r#"$.servers."eu.west".[0]"#);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Marker for the document root in encoded paths.
pub const ROOT: &str = "$";

const POINTER_SEPARATOR: &str = "%2F";

/// Represents a single element within a path.
///
/// ```
/// # use jsoncompare_core::PathSegment;
/// assert!(matches!(PathSegment::key("name"), PathSegment::Key(_)));
/// assert!(matches!(PathSegment::index(2usize), PathSegment::Index(2)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key lookup.
    Key(String),
    /// Array index lookup.
    Index(usize),
}

impl PathSegment {
    /// Creates a key segment.
    #[must_use]
    pub fn key<S>(value: S) -> Self
    where
        S: Into<String>,
    {
        Self::Key(value.into())
    }

    /// Creates an index segment.
    #[must_use]
    pub fn index<I>(value: I) -> Self
    where
        I: Into<usize>,
    {
        Self::Index(value.into())
    }

    /// Returns the segment the way the editor widget addresses it: keys
    /// verbatim, indices as decimal strings.
    #[must_use]
    pub fn to_editor_segment(&self) -> String {
        match self {
            Self::Key(key) => key.clone(),
            Self::Index(index) => index.to_string(),
        }
    }

    /// Maps an editor segment back, treating all-digit segments as indices.
    #[must_use]
    pub fn from_editor_segment(segment: &str) -> Self {
        match parse_index(segment) {
            Some(index) => Self::Index(index),
            None => Self::Key(segment.to_owned()),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(&encode_key(key)),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Represents the location of a value within a document, relative to the root.
///
/// ```
/// # use jsoncompare_core::{Path, PathSegment};
/// let path = Path::new().with_segment(PathSegment::key("foo")).with_segment(PathSegment::index(0usize));
/// assert_eq!(path.len(), 2);
/// assert_eq!(path.to_string(), "$.foo.[0]");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// Creates an empty (root) path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new segment, returning the extended path.
    #[must_use]
    pub fn with_segment(mut self, segment: PathSegment) -> Self {
        self.0.push(segment);
        self
    }

    /// Returns the underlying segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether this is the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pushes a new segment in-place.
    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Pops the last segment off the path.
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    /// Consumes the path and returns the owned segments.
    #[must_use]
    pub fn into_segments(self) -> Vec<PathSegment> {
        self.0
    }

    /// Reports whether `prefix` addresses this path or one of its ancestors.
    ///
    /// ```
    /// # use jsoncompare_core::Path;
    /// let path = Path::decode("$.a.b");
    /// assert!(path.starts_with(&Path::decode("$.a")));
    /// assert!(!Path::decode("$.ab").starts_with(&Path::decode("$.a")));
    /// ```
    #[must_use]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Returns the segments in the editor widget's representation.
    #[must_use]
    pub fn editor_segments(&self) -> Vec<String> {
        self.0.iter().map(PathSegment::to_editor_segment).collect()
    }

    /// Builds a path from editor segments, treating all-digit segments as
    /// array indices.
    ///
    /// ```
    /// # use jsoncompare_core::Path;
    /// let path = Path::from_editor_segments(["items", "3", "a.b"]);
    /// assert_eq!(path.encode(), r#"$.items.[3]."a.b""#);
    /// ```
    #[must_use]
    pub fn from_editor_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(segments.into_iter().map(|s| PathSegment::from_editor_segment(s.as_ref())).collect())
    }

    /// Renders the path in dot/bracket notation.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self)
    }

    /// Parses a dot/bracket notation path.
    #[must_use]
    pub fn decode(input: &str) -> Self {
        decode(input)
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(value: Vec<PathSegment>) -> Self {
        Self(value)
    }
}

impl From<PathSegment> for Path {
    fn from(value: PathSegment) -> Self {
        Self(vec![value])
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT)?;
        for segment in &self.0 {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(decode(s))
    }
}

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(decode(&raw))
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathSegment;
    type IntoIter = std::slice::Iter<'a, PathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Path {
    type Item = PathSegment;
    type IntoIter = std::vec::IntoIter<PathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Backslash-escapes `\`, `'` and `"` in an object key.
#[must_use]
pub fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for ch in key.chars() {
        if matches!(ch, '\\' | '\'' | '"') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Renders an object key as a single path segment.
///
/// ```
/// # use jsoncompare_core::path::encode_key;
/// assert_eq!(encode_key("name"), "name");
/// assert_eq!(encode_key("a.b"), "\"a.b\"");
/// assert_eq!(encode_key("it's"), "it\\'s");
/// ```
#[must_use]
pub fn encode_key(key: &str) -> String {
    let escaped = escape_key(key);
    if key.is_empty() || key.contains('.') || looks_like_index(key) {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

/// Joins a parent path string and a child object key.
pub(crate) fn join_key(parent: &str, key: &str) -> String {
    format!("{parent}.{}", encode_key(key))
}

/// Joins a parent path string and a child array index.
pub(crate) fn join_index(parent: &str, index: usize) -> String {
    format!("{parent}.[{index}]")
}

/// Encodes a path as a `$`-rooted dot/bracket string.
#[must_use]
pub fn encode(path: &Path) -> String {
    path.to_string()
}

/// Decodes a dot/bracket string into a path.
///
/// A leading bare `$` is the root marker and is not part of the result. The
/// decoder is lenient: text it cannot interpret as a quoted span or an index
/// is kept as key text.
///
/// ```
/// # use jsoncompare_core::{path::decode, PathSegment};
/// let path = decode("$..a.[1].[x]");
/// assert_eq!(
///     path.segments(),
///     [PathSegment::key("a"), PathSegment::index(1usize), PathSegment::key("[x]")]
/// );
/// ```
#[must_use]
pub fn decode(input: &str) -> Path {
    let chars: Vec<char> = input.chars().collect();
    let mut cursor = 0;
    if chars.first() == Some(&'$') && chars.get(1).is_none_or(|c| *c == '.') {
        cursor = 1;
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut started = false;
    while cursor < chars.len() {
        match chars[cursor] {
            '.' => {
                if started {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    started = false;
                }
                cursor += 1;
            }
            '\\' => {
                if let Some(escaped) = chars.get(cursor + 1) {
                    current.push(*escaped);
                }
                started = true;
                cursor += 2;
            }
            '"' if !started => {
                if let Some((content, close)) = quoted_span(&chars, cursor + 1) {
                    if at_boundary(&chars, close + 1) {
                        segments.push(PathSegment::Key(content));
                        cursor = close + 2;
                        continue;
                    }
                }
                current.push('"');
                started = true;
                cursor += 1;
            }
            '[' if !started => {
                if let Some((index, close)) = bracket_index(&chars, cursor + 1) {
                    if at_boundary(&chars, close + 1) {
                        segments.push(PathSegment::Index(index));
                        cursor = close + 2;
                        continue;
                    }
                }
                current.push('[');
                started = true;
                cursor += 1;
            }
            other => {
                current.push(other);
                started = true;
                cursor += 1;
            }
        }
    }
    if started {
        segments.push(PathSegment::Key(current));
    }
    Path(segments)
}

/// Encodes a path in the editor's pointer dialect: a JSON Pointer whose
/// separators and reserved characters are percent-encoded, so segments end up
/// `%2F`-joined.
///
/// ```
/// # use jsoncompare_core::{path::encode_pointer, Path};
/// assert_eq!(encode_pointer(&Path::decode("$.a.[0].b c")), "%2Fa%2F0%2Fb%20c");
/// assert_eq!(encode_pointer(&Path::new()), "");
/// ```
#[must_use]
pub fn encode_pointer(path: &Path) -> String {
    let mut encoded = String::new();
    for segment in path {
        encoded.push_str(POINTER_SEPARATOR);
        let escaped = segment.to_editor_segment().replace('~', "~0").replace('/', "~1");
        encoded.push_str(&percent_encode(&escaped));
    }
    encoded
}

/// Decodes the editor's pointer dialect produced by [`encode_pointer`].
///
/// All-digit segments become array indices.
#[must_use]
pub fn decode_pointer(input: &str) -> Path {
    let pointer = percent_decode(input);
    if pointer.is_empty() {
        return Path::new();
    }
    let body = pointer.strip_prefix('/').unwrap_or(&pointer);
    Path::from_editor_segments(
        body.split('/').map(|segment| segment.replace("~1", "/").replace("~0", "~")),
    )
}

fn at_boundary(chars: &[char], position: usize) -> bool {
    position == chars.len() || chars[position] == '.'
}

fn quoted_span(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut content = String::new();
    let mut cursor = start;
    while cursor < chars.len() {
        match chars[cursor] {
            '\\' => {
                content.push(*chars.get(cursor + 1)?);
                cursor += 2;
            }
            '"' => return Some((content, cursor)),
            other => {
                content.push(other);
                cursor += 1;
            }
        }
    }
    None
}

fn bracket_index(chars: &[char], start: usize) -> Option<(usize, usize)> {
    let close = start + chars[start..].iter().position(|c| *c == ']')?;
    let digits: String = chars[start..close].iter().collect();
    parse_index(&digits).map(|index| (index, close))
}

fn parse_index(text: &str) -> Option<usize> {
    let canonical = !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'));
    if canonical {
        text.parse().ok()
    } else {
        None
    }
}

fn looks_like_index(key: &str) -> bool {
    key.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')).and_then(parse_index).is_some()
}

fn percent_encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        let unreserved = byte.is_ascii_alphanumeric()
            || matches!(byte, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')');
        if unreserved {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut cursor = 0;
    while cursor < bytes.len() {
        if bytes[cursor] == b'%' && cursor + 2 < bytes.len() {
            let value = std::str::from_utf8(&bytes[cursor + 1..cursor + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(value) = value {
                decoded.push(value);
                cursor += 3;
                continue;
            }
        }
        decoded.push(bytes[cursor]);
        cursor += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn root_marker_is_dropped() {
        assert!(decode("$").is_empty());
        assert!(decode("").is_empty());
        assert_eq!(decode("$.a").segments(), [PathSegment::key("a")]);
    }

    #[test]
    fn dollar_key_after_root_is_kept() {
        let path = decode("$.$");
        assert_eq!(path.segments(), [PathSegment::key("$")]);
        assert_eq!(path.encode(), "$.$");
    }

    #[test]
    fn repeated_dots_are_skipped() {
        assert_eq!(decode("$.a...b").segments(), [PathSegment::key("a"), PathSegment::key("b")]);
    }

    #[test]
    fn quoted_span_keeps_dots() {
        let path = decode(r#"$."a.b".c"#);
        assert_eq!(path.segments(), [PathSegment::key("a.b"), PathSegment::key("c")]);
    }

    #[test]
    fn quote_not_followed_by_boundary_is_literal() {
        let path = decode(r#"$."ab"cd.e"#);
        assert_eq!(path.segments(), [PathSegment::key("\"ab\"cd"), PathSegment::key("e")]);
    }

    #[test]
    fn escaped_quote_inside_quoted_span() {
        let path = decode(r#"$."x.y\"z""#);
        assert_eq!(path.segments(), [PathSegment::key("x.y\"z")]);
        assert_eq!(path.encode(), r#"$."x.y\"z""#);
    }

    #[test]
    fn bracket_index_in_the_middle_and_at_the_end() {
        let path = decode("$.[0].a.[12]");
        assert_eq!(
            path.segments(),
            [PathSegment::index(0usize), PathSegment::key("a"), PathSegment::index(12usize)]
        );
    }

    #[test]
    fn non_numeric_brackets_stay_keys() {
        assert_eq!(decode("$.[foo].x").segments(), [PathSegment::key("[foo]"), PathSegment::key("x")]);
        assert_eq!(decode("$.[01]").segments(), [PathSegment::key("[01]")]);
    }

    #[test]
    fn ambiguous_keys_are_quoted() {
        assert_eq!(encode_key(""), "\"\"");
        assert_eq!(encode_key("[3]"), "\"[3]\"");
        assert_eq!(decode(&join_key("$", "[3]")).segments(), [PathSegment::key("[3]")]);
        assert_eq!(decode(&join_key("$", "")).segments(), [PathSegment::key("")]);
    }

    #[test]
    fn numeric_object_keys_stay_keys() {
        let path = decode("$.1");
        assert_eq!(path.segments(), [PathSegment::key("1")]);
        assert_eq!(path.encode(), "$.1");
    }

    #[test]
    fn backslash_in_key_round_trips() {
        let path = Path::from(PathSegment::key("a\\b"));
        assert_eq!(path.encode(), "$.a\\\\b");
        assert_eq!(decode(&path.encode()), path);
    }

    #[test]
    fn editor_segments_map_digits_to_indices() {
        let path = Path::from_editor_segments(["a", "0", "007"]);
        assert_eq!(
            path.segments(),
            [PathSegment::key("a"), PathSegment::index(0usize), PathSegment::key("007")]
        );
        assert_eq!(path.editor_segments(), ["a", "0", "007"]);
    }

    #[test]
    fn pointer_dialect_escapes_separators() {
        let path = Path::from(vec![PathSegment::key("a/b"), PathSegment::key("c~d"), PathSegment::index(2usize)]);
        let pointer = encode_pointer(&path);
        assert_eq!(pointer, "%2Fa~1b%2Fc~0d%2F2");
        assert_eq!(decode_pointer(&pointer), path);
    }

    #[test]
    fn serde_uses_encoded_form() {
        let path = decode(r#"$."a.b".[1]"#);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""$.\"a.b\".[1]""#);
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    fn arb_segment() -> impl Strategy<Value = PathSegment> {
        prop_oneof![
            any::<usize>().prop_map(PathSegment::Index),
            "[ -~]{0,8}".prop_map(PathSegment::Key),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(segments in proptest::collection::vec(arb_segment(), 0..6)) {
            let path = Path::from(segments);
            prop_assert_eq!(decode(&path.encode()), path);
        }

        #[test]
        fn encode_inverts_decode_for_well_formed(segments in proptest::collection::vec(arb_segment(), 0..6)) {
            let encoded = Path::from(segments).encode();
            prop_assert_eq!(decode(&encoded).encode(), encoded);
        }

        #[test]
        fn pointer_round_trip(keys in proptest::collection::vec("[a-z/~% ]{1,6}", 0..5)) {
            let path = Path::from(keys.into_iter().map(PathSegment::Key).collect::<Vec<_>>());
            let decoded = decode_pointer(&encode_pointer(&path));
            let expected = Path::from_editor_segments(path.editor_segments());
            prop_assert_eq!(decoded, expected);
        }
    }
}
