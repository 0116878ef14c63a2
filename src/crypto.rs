//! Hashing primitives and canonical serialization for PetChain
//!
//! Block hashes must match the digests produced by other implementations of
//! the ledger byte for byte, so the canonical form reproduces the text that
//! Python's `json.dumps(obj, sort_keys=True)` emits:
//! - object keys sorted lexicographically,
//! - `", "` between members and `": "` between key and value,
//! - ASCII-only output, every other code point escaped as `\uXXXX`
//!   (UTF-16 surrogate pairs above the BMP, DEL included).

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io;

/// SHA-256 of `bytes`, rendered as 64 lowercase hex characters.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Serialize `value` into its canonical text form.
///
/// The value is first lowered into a `serde_json::Value` and every object is
/// rebuilt with sorted keys, so field declaration order never leaks into the
/// output.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let tree = sort_keys(serde_json::to_value(value)?);
    let mut out = Vec::with_capacity(128);
    let mut serializer = Serializer::with_formatter(&mut out, SortedKeysFormatter);
    tree.serialize(&mut serializer)?;
    // The formatter only ever emits ASCII.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Canonical text of `value` hashed with SHA-256.
pub fn canonical_digest<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    canonical_json(value).map(|text| sha256_hex(text.as_bytes()))
}

// Rebuilt explicitly: `serde_json::Map` keeps insertion order whenever the
// `preserve_order` feature is enabled anywhere in the dependency graph.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

struct SortedKeysFormatter;

impl SortedKeysFormatter {
    fn is_plain(ch: char) -> bool {
        (' '..='~').contains(&ch)
    }
}

impl Formatter for SortedKeysFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if Self::is_plain(ch) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sha256_hex_shape() {
        let digest = sha256_hex(b"-21");
        assert_eq!(
            digest,
            "e54dc15ccafa608142ffa6340b035c327f972e24882052cfc3345f240f4ee237"
        );
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_keys_sorted_with_python_separators() {
        let value = json!({ "proof": 1, "index": 1, "animal_type": "Charizard" });
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"animal_type": "Charizard", "index": 1, "proof": 1}"#
        );
    }

    #[test]
    fn test_non_ascii_is_escaped() {
        let value = json!({ "name": "Pokémon\u{7f}" });
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"name": "Pok\u00e9mon\u007f"}"#
        );
    }

    #[test]
    fn test_astral_plane_uses_surrogate_pairs() {
        let value = json!({ "a": "😀" });
        assert_eq!(canonical_json(&value).unwrap(), r#"{"a": "\ud83d\ude00"}"#);
        assert_eq!(
            canonical_digest(&value).unwrap(),
            "584fb7ef2a897b2fd0d46a0e4461ea35a087048a1b75a6d9d4ee1467ea5f7197"
        );
    }

    #[test]
    fn test_control_characters_and_quotes() {
        let value = json!({ "s": "a\"b\\c\nd\te" });
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"s": "a\"b\\c\nd\te"}"#
        );
    }

    #[test]
    fn test_arrays_and_nesting() {
        let value = json!({ "b": [1, 2, {"z": null, "y": true}], "a": {} });
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a": {}, "b": [1, 2, {"y": true, "z": null}]}"#
        );
    }
}
