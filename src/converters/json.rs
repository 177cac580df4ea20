//! JSON format of an annotated text
//!
//! ```json
//! {"text": "...",
//!  "tags": {"ns": {"id": [[0, 3], [5, 7, 9, 12]]}},
//!  "metadata": {"checksum": {"encoding": "utf-8", "md5": "<hex>"},
//!               "attributes": {"ns": {"id": {"0.3": {"k": "v"}}}},
//!               "maps": {"utf8": [0, 1, 3], "utf16": [0, 2, 4]}}}
//! ```
//!
//! Maps are written in sorted order so equal texts serialize identically.
//! Offsets are read as signed integers so that negative values are reported
//! as invalid offsets rather than as malformed JSON. Precomputed offset maps
//! that do not fit the text are dropped.

use crate::error::Result;
use crate::models::{merge_attributes, Attributes, Offsets, Tag};
use crate::text::codec::Encoding;
use crate::text::digest::{normalize_key, Checksum, HashType};
use crate::text::AnnotatedText;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// namespace -> id -> offset key -> attributes
type AttributeTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, Attributes>>>;

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    text: String,
    #[serde(default)]
    tags: BTreeMap<String, BTreeMap<String, Vec<Vec<i64>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<JsonMetadata>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JsonMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checksum: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: AttributeTree,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    maps: BTreeMap<String, Value>,
}

/// Serialize an annotated text to a JSON value
pub fn to_json(text: &AnnotatedText) -> Result<Value> {
    let mut tags: BTreeMap<String, BTreeMap<String, Vec<Vec<i64>>>> = BTreeMap::new();
    let mut attributes: AttributeTree = BTreeMap::new();

    for (tag, attrs) in text.tags_with_attributes() {
        tags.entry(tag.namespace().to_string())
            .or_default()
            .entry(tag.id().to_string())
            .or_default()
            .push(tag.offsets().as_slice().iter().map(|&o| o as i64).collect());

        if let Some(attrs) = attrs {
            attributes
                .entry(tag.namespace().to_string())
                .or_default()
                .entry(tag.id().to_string())
                .or_default()
                .insert(tag.offsets().to_key(), attrs.clone());
        }
    }

    let checksum = Checksum {
        encoding: Encoding::Utf8,
        hash: HashType::Md5,
        hex: text.hex_digest(),
    };

    let document = JsonDocument {
        text: text.as_str().to_string(),
        tags,
        metadata: Some(JsonMetadata {
            checksum: Some(checksum.to_json()),
            attributes,
            maps: BTreeMap::from([
                ("utf8".to_string(), Value::from(text.utf8())),
                ("utf16".to_string(), Value::from(text.utf16())),
            ]),
        }),
    };

    Ok(serde_json::to_value(document)?)
}

pub fn to_json_string(text: &AnnotatedText) -> Result<String> {
    Ok(serde_json::to_string(&to_json(text)?)?)
}

/// Deserialize an annotated text, verifying the checksum if one is declared
///
/// Attributes of tags missing from `tags` add those tags.
pub fn from_json(value: &Value) -> Result<AnnotatedText> {
    let document: JsonDocument = serde_json::from_value(value.clone())?;
    let metadata = document.metadata.unwrap_or_default();

    if let Some(checksum) = &metadata.checksum {
        Checksum::from_json(checksum)?.verify(&document.text)?;
    }

    let mut pairs: BTreeMap<Tag, Option<Attributes>> = BTreeMap::new();

    for (namespace, ids) in document.tags {
        for (id, offset_lists) in ids {
            for offsets in offset_lists {
                let tag = Tag::from_offsets(namespace.as_str(), id.as_str(), Offsets::from_signed(&offsets)?);
                pairs.entry(tag).or_default();
            }
        }
    }

    for (namespace, ids) in metadata.attributes {
        for (id, keyed) in ids {
            for (key, attrs) in keyed {
                let tag = Tag::from_offsets(namespace.as_str(), id.as_str(), Offsets::parse_key(&key)?);
                match pairs.entry(tag).or_default() {
                    Some(existing) => merge_attributes(existing, attrs),
                    slot => *slot = Some(attrs),
                }
            }
        }
    }

    let mut text = AnnotatedText::with_tags(document.text, pairs)?;
    for (name, map) in &metadata.maps {
        restore_map(&mut text, name, map);
    }
    Ok(text)
}

/// Seed a cached offset map; maps that do not fit the text are dropped
fn restore_map(text: &mut AnnotatedText, name: &str, map: &Value) {
    let encoding = match normalize_key(name).as_str() {
        "utf8" => Encoding::Utf8,
        "utf16" => Encoding::Utf16Le,
        _ => return,
    };

    let restored = serde_json::from_value::<Vec<usize>>(map.clone())
        .map_err(Into::into)
        .and_then(|map| text.set_offset_map(encoding, &map));

    if let Err(e) = restored {
        log::debug!("dropping {} map: {}", name, e);
    }
}

pub fn from_json_str(json: &str) -> Result<AnnotatedText> {
    let value: Value = serde_json::from_str(json)?;
    from_json(&value)
}

impl AnnotatedText {
    /// See [`to_json`]
    pub fn to_json(&self) -> Result<Value> {
        to_json(self)
    }

    /// See [`from_json`]
    pub fn from_json(value: &Value) -> Result<Self> {
        from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TextError;
    use serde_json::json;

    #[test]
    fn test_shape() {
        let mut text = AnnotatedText::new("abcd");
        text.add(Tag::span("ns", "id", 0, 3).unwrap(), json!({"k": "v"}).as_object().cloned())
            .unwrap();
        text.add(Tag::new("ns", "id", &[0, 1, 2, 4]).unwrap(), None).unwrap();

        let value = to_json(&text).unwrap();
        assert_eq!(value["text"], "abcd");
        assert_eq!(value["tags"], json!({"ns": {"id": [[0, 1, 2, 4], [0, 3]]}}));
        assert_eq!(value["metadata"]["checksum"]["md5"], "e2fc714c4727ee9395f324cd2e7f331f");
        assert_eq!(value["metadata"]["attributes"], json!({"ns": {"id": {"0.3": {"k": "v"}}}}));
    }

    #[test]
    fn test_metadata_is_optional() {
        let text = from_json(&json!({"text": "abcd", "tags": {"a": {"b": [[1, 2], [3]]}}})).unwrap();
        assert_eq!(text.len(), 2);
        assert!(from_json(&json!({"text": "abcd"})).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_offsets_fail_closed() {
        let result = from_json(&json!({"text": "abcd", "tags": {"a": {"b": [[2, 1]]}}}));
        assert!(matches!(result, Err(TextError::InvalidOffset { .. })));

        let result = from_json(&json!({"text": "abcd", "tags": {"a": {"b": [[-1, 1]]}}}));
        assert!(matches!(result, Err(TextError::InvalidOffset { .. })));

        let result = from_json(&json!({"text": "abcd", "tags": {"a": {"b": [[1, 9]]}}}));
        assert!(matches!(result, Err(TextError::InvalidOffset { .. })));
    }

    #[test]
    fn test_structural_errors_are_malformed() {
        assert!(matches!(from_json(&json!({"tags": {}})), Err(TextError::MalformedWireObject(_))));
        assert!(matches!(
            from_json(&json!({"text": "a", "tags": {"a": {"b": "0.1"}}})),
            Err(TextError::MalformedWireObject(_))
        ));
        assert!(matches!(from_json_str("{\"text\": "), Err(TextError::MalformedWireObject(_))));
    }

    #[test]
    fn test_maps_are_written() {
        let value = to_json(&AnnotatedText::new("aä\u{10ABCD}!")).unwrap();
        assert_eq!(value["metadata"]["maps"]["utf8"], json!([0, 1, 3, 7, 8]));
        assert_eq!(value["metadata"]["maps"]["utf16"], json!([0, 2, 4, 8, 10]));
    }

    #[test]
    fn test_maps_are_read_or_dropped() {
        let value = json!({"text": "aä", "metadata": {"maps": {"UTF-8": [3, 4, 6], "utf16": [0, 2, 4]}}});
        let text = from_json(&value).unwrap();
        assert_eq!(text.utf8(), &[0, 1, 3]);
        assert_eq!(text.utf16(), &[0, 2, 4]);

        let value = json!({"text": "aä", "metadata": {"maps": {"utf8": [0, 5, 1], "utf16": [-1, 2], "utf32": "x"}}});
        let text = from_json(&value).expect("bad maps are not an error");
        assert_eq!(text.utf8(), &[0, 1, 3]);
        assert_eq!(text.utf16(), &[0, 2, 4]);
    }

    #[test]
    fn test_checksum_is_verified() {
        let mut value = to_json(&AnnotatedText::new("abcd")).unwrap();
        value["text"] = json!("abce");
        assert!(matches!(from_json(&value), Err(TextError::ChecksumMismatch { .. })));
    }
}
