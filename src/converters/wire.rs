//! Wire documents: text objects, annotation objects and collections
//!
//! A text object carries a text together with a checksum of its encoded
//! form. An annotation object carries tags for a text, either by reference
//! (`text_id`, the `_id` of a text object in the same collection) or inline
//! (`text` plus `checksum`). Both are plain JSON objects; unknown members are
//! ignored.

use crate::error::{Result, TextError};
use crate::models::{Attributes, Offsets, Tag};
use crate::text::codec::Encoding;
use crate::text::digest::{Checksum, HashType};
use crate::text::AnnotatedText;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Longer `_id` values are accepted but logged
pub const MAX_ID_LEN: usize = 256;

static URL_ANNOTATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:https?|ftp)://[^\s/?#@]+(?:@[^\s/?#]+)?(?:[/?#]\S*)?|mailto:[^\s@]+@[^\s@]+)$")
        .expect("Invalid annotator URL pattern")
});

static EMAIL_ANNOTATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("Invalid annotator email pattern")
});

/// Who produced an annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotator {
    /// An automated agent, identified by an `http`, `https`, `ftp` or `mailto` URL
    Agent(String),
    /// A human, identified by a bare email address
    Person(String),
}

impl Annotator {
    pub fn parse(value: &str) -> Result<Self> {
        if URL_ANNOTATOR.is_match(value) {
            Ok(Annotator::Agent(value.to_string()))
        } else if EMAIL_ANNOTATOR.is_match(value) {
            Ok(Annotator::Person(value.to_string()))
        } else {
            Err(TextError::malformed(format!(
                "annotator '{}' is neither an agent URL nor an email address",
                value
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Annotator::Agent(url) => url,
            Annotator::Person(email) => email,
        }
    }

    pub fn is_agent(&self) -> bool {
        matches!(self, Annotator::Agent(_))
    }
}

impl fmt::Display for Annotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| TextError::malformed(format!("{} is not a JSON object", what)))
}

fn required_str<'a>(object: &'a Map<String, Value>, member: &str) -> Result<&'a str> {
    match object.get(member) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(TextError::malformed(format!("'{}' is not a string", member))),
        None => Err(TextError::malformed(format!("'{}' missing", member))),
    }
}

/// Read the optional `_id` member
fn document_id(object: &Map<String, Value>) -> Result<Option<String>> {
    match object.get("_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Err(TextError::malformed("'_id' is empty")),
        Some(Value::String(id)) => {
            if id.chars().count() > MAX_ID_LEN {
                log::warn!("document id exceeds {} characters: {}...", MAX_ID_LEN, id.chars().take(32).collect::<String>());
            }
            Ok(Some(id.clone()))
        }
        Some(_) => Err(TextError::malformed("'_id' is not a string")),
    }
}

/// A text with the checksum guarding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextObject {
    pub id: Option<String>,
    pub text: String,
    pub checksum: Checksum,
}

impl TextObject {
    /// Wrap a text, computing its checksum
    pub fn from_text(text: impl Into<String>, hash: HashType, encoding: Encoding, id: Option<String>) -> Self {
        let text = text.into();
        let checksum = Checksum::compute(&text, hash, encoding);
        Self { id, text, checksum }
    }

    /// Parse and verify a text object
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = as_object(value, "text object")?;
        Self::from_members(object, document_id(object)?)
    }

    fn from_members(object: &Map<String, Value>, id: Option<String>) -> Result<Self> {
        let text = required_str(object, "text")?;
        let checksum = object
            .get("checksum")
            .ok_or_else(|| TextError::malformed("'checksum' missing"))?;
        let checksum = Checksum::from_json(checksum)?;
        checksum.verify(text)?;

        Ok(Self {
            id,
            text: text.to_string(),
            checksum,
        })
    }

    fn write_members(&self, object: &mut Map<String, Value>) {
        object.insert("text".to_string(), Value::String(self.text.clone()));
        object.insert("checksum".to_string(), self.checksum.to_json());
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        if let Some(id) = &self.id {
            object.insert("_id".to_string(), Value::String(id.clone()));
        }
        self.write_members(&mut object);
        Value::Object(object)
    }

    /// An annotated text without tags
    pub fn to_annotated_text(&self) -> AnnotatedText {
        AnnotatedText::new(self.text.as_str())
    }
}

/// The text an annotation object refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextTarget {
    /// `_id` of a text object in the same collection
    Reference(String),
    /// The text itself with its checksum
    Inline(TextObject),
}

/// A set of tags produced by one annotator for one text
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationObject {
    pub id: Option<String>,
    pub annotator: Annotator,
    pub target: TextTarget,
    pub tags: Vec<(Tag, Option<Attributes>)>,
}

impl AnnotationObject {
    /// Collect all tags of `text` into an annotation object
    pub fn from_text(text: &AnnotatedText, annotator: Annotator, target: TextTarget) -> Self {
        let tags = text
            .tags_with_attributes()
            .into_iter()
            .map(|(tag, attributes)| (tag.clone(), attributes.cloned()))
            .collect();

        Self {
            id: None,
            annotator,
            target,
            tags,
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let object = as_object(value, "annotation object")?;
        let id = document_id(object)?;
        let annotator = Annotator::parse(required_str(object, "annotator")?)?;

        let target = match (object.get("text_id"), object.contains_key("text")) {
            (Some(_), true) => {
                return Err(TextError::malformed("both 'text_id' and 'text' given"));
            }
            (Some(_), false) => TextTarget::Reference(required_str(object, "text_id")?.to_string()),
            (None, true) => TextTarget::Inline(TextObject::from_members(object, None)?),
            (None, false) => {
                return Err(TextError::malformed("neither 'text_id' nor 'text' given"));
            }
        };

        let tags = parse_tags(object.get("tags").ok_or_else(|| TextError::malformed("'tags' missing"))?)?;

        Ok(Self {
            id,
            annotator,
            target,
            tags,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();

        if let Some(id) = &self.id {
            object.insert("_id".to_string(), Value::String(id.clone()));
        }
        object.insert("annotator".to_string(), Value::String(self.annotator.to_string()));

        match &self.target {
            TextTarget::Reference(text_id) => {
                object.insert("text_id".to_string(), Value::String(text_id.clone()));
            }
            TextTarget::Inline(text) => text.write_members(&mut object),
        }

        let mut tree: BTreeMap<&str, BTreeMap<&str, Map<String, Value>>> = BTreeMap::new();
        for (tag, attributes) in &self.tags {
            let value = match attributes {
                Some(attributes) => Value::Object(attributes.clone()),
                None => Value::Null,
            };
            tree.entry(tag.namespace())
                .or_default()
                .entry(tag.id())
                .or_default()
                .insert(tag.offsets().to_key(), value);
        }

        let tags: Map<String, Value> = tree
            .into_iter()
            .map(|(namespace, ids)| {
                let ids: Map<String, Value> = ids
                    .into_iter()
                    .map(|(id, keyed)| (id.to_string(), Value::Object(keyed)))
                    .collect();
                (namespace.to_string(), Value::Object(ids))
            })
            .collect();
        object.insert("tags".to_string(), Value::Object(tags));

        Value::Object(object)
    }

    /// Add the tags to `text`
    ///
    /// Inline targets are checked against `text` first. Returns the number of
    /// new tags.
    pub fn apply(&self, text: &mut AnnotatedText) -> Result<usize> {
        if let TextTarget::Inline(target) = &self.target {
            target.checksum.verify(text.as_str())?;
        }

        text.add_all(self.tags.iter().cloned())
    }
}

/// Parse `{namespace: {tagId: {offsetKey: {attr: value} | null}}}`
fn parse_tags(value: &Value) -> Result<Vec<(Tag, Option<Attributes>)>> {
    let mut tags = Vec::new();

    for (namespace, ids) in as_object(value, "'tags'")? {
        for (id, keyed) in as_object(ids, "tag namespace")? {
            for (key, attributes) in as_object(keyed, "tag id")? {
                let offsets = Offsets::parse_key(key)?;
                let attributes = match attributes {
                    Value::Null => None,
                    Value::Object(map) => Some(map.clone()),
                    _ => {
                        return Err(TextError::malformed(format!(
                            "attributes of {}:{} at {} are not an object",
                            namespace, id, key
                        )))
                    }
                };
                tags.push((Tag::from_offsets(namespace.as_str(), id.as_str(), offsets), attributes));
            }
        }
    }

    Ok(tags)
}

/// Text objects of one collection, addressable by `_id`
#[derive(Debug, Clone, Default)]
pub struct WireCollection {
    texts: HashMap<String, TextObject>,
}

impl WireCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text object; it must have an `_id` not yet in the collection
    pub fn insert_text(&mut self, text: TextObject) -> Result<()> {
        let id = text
            .id
            .clone()
            .ok_or_else(|| TextError::malformed("text object without '_id' cannot be stored"))?;

        if self.texts.contains_key(&id) {
            return Err(TextError::malformed(format!("duplicate text '_id' {}", id)));
        }

        self.texts.insert(id, text);
        Ok(())
    }

    /// Parse, verify and add a text object
    pub fn insert_json(&mut self, value: &Value) -> Result<()> {
        self.insert_text(TextObject::from_json(value)?)
    }

    pub fn text(&self, id: &str) -> Option<&TextObject> {
        self.texts.get(id)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// The annotated text an annotation object describes
    pub fn resolve(&self, annotation: &AnnotationObject) -> Result<AnnotatedText> {
        let mut text = match &annotation.target {
            TextTarget::Reference(id) => self
                .texts
                .get(id)
                .ok_or_else(|| TextError::malformed(format!("unknown text_id {}", id)))?
                .to_annotated_text(),
            TextTarget::Inline(inline) => inline.to_annotated_text(),
        };

        annotation.apply(&mut text)?;
        Ok(text)
    }

    /// Merge several annotation objects of the same text
    pub fn resolve_all<'a, I>(&self, annotations: I) -> Result<Option<AnnotatedText>>
    where
        I: IntoIterator<Item = &'a AnnotationObject>,
    {
        let mut merged: Option<AnnotatedText> = None;

        for annotation in annotations {
            let text = self.resolve(annotation)?;
            match merged.as_mut() {
                Some(existing) => existing.update(&text)?,
                None => merged = Some(text),
            }
        }

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ABCD_MD5: &str = "e2fc714c4727ee9395f324cd2e7f331f";

    #[test]
    fn test_annotators() {
        assert!(Annotator::parse("http://example.com/tagger").unwrap().is_agent());
        assert!(Annotator::parse("https://example.com").unwrap().is_agent());
        assert!(Annotator::parse("ftp://host/path").unwrap().is_agent());
        assert!(Annotator::parse("mailto:someone@example.com").unwrap().is_agent());
        assert!(!Annotator::parse("someone@example.com").unwrap().is_agent());

        assert!(Annotator::parse("someone").is_err());
        assert!(Annotator::parse("gopher://host").is_err());
        assert!(Annotator::parse("http://").is_err());
        assert!(Annotator::parse("some one@example.com").is_err());
    }

    #[test]
    fn test_text_object_round_trip() {
        let value = json!({"_id": "t1", "text": "abcd", "checksum": {"encoding": "UTF-8", "MD5": ABCD_MD5}, "extra": 1});
        let object = TextObject::from_json(&value).unwrap();
        assert_eq!(object.id.as_deref(), Some("t1"));
        assert_eq!(object.checksum.hex, ABCD_MD5);

        let again = TextObject::from_json(&object.to_json()).unwrap();
        assert_eq!(again, object);
        assert!(again.to_json().get("extra").is_none());
    }

    #[test]
    fn test_text_object_rejects() {
        let mutated = json!({"text": "abce", "checksum": {"encoding": "utf-8", "md5": ABCD_MD5}});
        assert!(matches!(TextObject::from_json(&mutated), Err(TextError::ChecksumMismatch { .. })));

        let no_checksum = json!({"text": "abcd"});
        assert!(matches!(TextObject::from_json(&no_checksum), Err(TextError::MalformedWireObject(_))));

        let bad_id = json!({"_id": 7, "text": "abcd", "checksum": {"encoding": "utf-8", "md5": ABCD_MD5}});
        assert!(matches!(TextObject::from_json(&bad_id), Err(TextError::MalformedWireObject(_))));
    }

    #[test]
    fn test_long_id_is_accepted() {
        let id = "x".repeat(MAX_ID_LEN + 1);
        let object = TextObject::from_text("abcd", HashType::Md5, Encoding::Utf8, Some(id.clone()));
        assert_eq!(TextObject::from_json(&object.to_json()).unwrap().id, Some(id));
    }

    #[test]
    fn test_annotation_object_target_rules() {
        let tags = json!({"ns": {"id": {"0.2": null}}});
        let checksum = json!({"encoding": "utf-8", "md5": ABCD_MD5});

        let both = json!({"annotator": "a@b.org", "tags": tags.clone(), "text_id": "t", "text": "abcd", "checksum": checksum.clone()});
        assert!(AnnotationObject::from_json(&both).is_err());

        let neither = json!({"annotator": "a@b.org", "tags": tags.clone()});
        assert!(AnnotationObject::from_json(&neither).is_err());

        let inline_without_checksum = json!({"annotator": "a@b.org", "tags": tags.clone(), "text": "abcd"});
        assert!(AnnotationObject::from_json(&inline_without_checksum).is_err());

        let bad_annotator = json!({"annotator": "nobody", "tags": tags.clone(), "text_id": "t"});
        assert!(AnnotationObject::from_json(&bad_annotator).is_err());

        let reference = json!({"annotator": "a@b.org", "tags": tags.clone(), "text_id": "t"});
        let object = AnnotationObject::from_json(&reference).unwrap();
        assert_eq!(object.target, TextTarget::Reference("t".to_string()));
        assert_eq!(object.tags.len(), 1);
    }

    #[test]
    fn test_annotation_object_tags() {
        let value = json!({
            "annotator": "http://tagger.example.org",
            "text_id": "t",
            "tags": {"penn": {"NN": {"0.2": {"p": 0.9}, "1.2.3.4": null}}}
        });
        let object = AnnotationObject::from_json(&value).unwrap();
        assert_eq!(object.tags.len(), 2);

        let again = AnnotationObject::from_json(&object.to_json()).unwrap();
        assert_eq!(again, object);

        let bad_key = json!({"annotator": "a@b.org", "text_id": "t", "tags": {"n": {"i": {"3.1": null}}}});
        assert!(matches!(AnnotationObject::from_json(&bad_key), Err(TextError::InvalidOffset { .. })));
    }

    #[test]
    fn test_collection_resolves_references() {
        let mut collection = WireCollection::new();
        collection
            .insert_text(TextObject::from_text("abcd", HashType::Md5, Encoding::Utf8, Some("t".to_string())))
            .unwrap();

        let duplicate = TextObject::from_text("other", HashType::Md5, Encoding::Utf8, Some("t".to_string()));
        assert!(collection.insert_text(duplicate).is_err());

        let value = json!({"annotator": "a@b.org", "text_id": "t", "tags": {"n": {"i": {"0.2": null}}}});
        let text = collection.resolve(&AnnotationObject::from_json(&value).unwrap()).unwrap();
        assert_eq!(text.as_str(), "abcd");
        assert_eq!(text.len(), 1);

        let dangling = json!({"annotator": "a@b.org", "text_id": "missing", "tags": {}});
        assert!(collection.resolve(&AnnotationObject::from_json(&dangling).unwrap()).is_err());

        let out_of_bounds = json!({"annotator": "a@b.org", "text_id": "t", "tags": {"n": {"i": {"0.9": null}}}});
        assert!(matches!(
            collection.resolve(&AnnotationObject::from_json(&out_of_bounds).unwrap()),
            Err(TextError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn test_apply_checks_inline_text() {
        let inline = TextObject::from_text("abcd", HashType::Sha256, Encoding::Utf16Le, None);
        let source = AnnotatedText::with_tags("abcd", vec![(Tag::span("n", "i", 1, 3).unwrap(), None)]).unwrap();
        let object = AnnotationObject::from_text(&source, Annotator::parse("a@b.org").unwrap(), TextTarget::Inline(inline));

        let mut same = AnnotatedText::new("abcd");
        assert_eq!(object.apply(&mut same).unwrap(), 1);

        let mut other = AnnotatedText::new("abcx");
        assert!(matches!(object.apply(&mut other), Err(TextError::ChecksumMismatch { .. })));
    }
}
