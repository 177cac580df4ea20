//! Annotated text: an immutable text plus per-namespace ordered tag indices
//!
//! Tags are validated against the text length on every insertion path.
//! Attributes live in a separate map keyed by tag value, so the indices only
//! ever hold plain tags. Byte offset maps and the MD5 digest are computed on
//! first use and cached; the text never changes after construction.

use crate::error::{Result, TextError};
use crate::models::{merge_attributes, Attributes, Tag};
use crate::text::codec::{check_map, offset_map, Encoding};
use crate::text::digest::{base64_digest, HashType};
use crate::text::index::{Containment, OrderedTagIndex};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

/// A character position or range used to query tags
pub trait CharQuery {
    /// The code-point range `[s, e)` this query stands for
    fn char_range(self, char_len: usize) -> Range<usize>;
}

/// A single position `o` queries `[o, o + 1)`
impl CharQuery for usize {
    fn char_range(self, _char_len: usize) -> Range<usize> {
        self..self.saturating_add(1)
    }
}

impl CharQuery for Range<usize> {
    fn char_range(self, _char_len: usize) -> Range<usize> {
        self
    }
}

impl CharQuery for RangeFrom<usize> {
    fn char_range(self, char_len: usize) -> Range<usize> {
        self.start..char_len
    }
}

impl CharQuery for RangeTo<usize> {
    fn char_range(self, _char_len: usize) -> Range<usize> {
        0..self.end
    }
}

impl CharQuery for RangeFull {
    fn char_range(self, char_len: usize) -> Range<usize> {
        0..char_len
    }
}

/// Traversal order for [`AnnotatedText::tags`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagOrder {
    #[default]
    Key,
    ReverseKey,
}

/// One tag of a namespace with the text it covers
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub id: &'a str,
    pub text: String,
    pub attributes: Option<&'a Attributes>,
}

#[derive(Debug, Clone)]
pub struct AnnotatedText {
    text: String,
    char_len: usize,
    indices: HashMap<String, OrderedTagIndex>,
    attributes: HashMap<Tag, Attributes>,
    md5: OnceCell<Vec<u8>>,
    utf8: OnceCell<Vec<usize>>,
    utf16: OnceCell<Vec<usize>>,
    utf32: OnceCell<Vec<usize>>,
}

impl AnnotatedText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let char_len = text.chars().count();

        Self {
            text,
            char_len,
            indices: HashMap::new(),
            attributes: HashMap::new(),
            md5: OnceCell::new(),
            utf8: OnceCell::new(),
            utf16: OnceCell::new(),
            utf32: OnceCell::new(),
        }
    }

    /// Create a text and bulk-load its tags
    ///
    /// Every tag is validated before any is inserted.
    pub fn with_tags<I>(text: impl Into<String>, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Tag, Option<Attributes>)>,
    {
        let mut annotated = Self::new(text);
        annotated.add_all(tags)?;
        Ok(annotated)
    }

    fn validate(&self, tag: &Tag) -> Result<()> {
        tag.offsets().check_bounds(self.char_len)
    }

    fn store_attributes(&mut self, tag: &Tag, attributes: Option<Attributes>) {
        let Some(attributes) = attributes else {
            return;
        };

        if attributes.is_empty() {
            return;
        }

        match self.attributes.get_mut(tag) {
            Some(existing) => merge_attributes(existing, attributes),
            None => {
                self.attributes.insert(tag.clone(), attributes);
            }
        }
    }

    /// Add a tag, merging `attributes` into any it already has
    ///
    /// Returns false if the tag was already present (only its attributes changed).
    pub fn add(&mut self, tag: Tag, attributes: Option<Attributes>) -> Result<bool> {
        self.validate(&tag)?;
        self.store_attributes(&tag, attributes);

        let added = self
            .indices
            .entry(tag.namespace().to_string())
            .or_default()
            .insert(tag);

        Ok(added)
    }

    /// Add many tags at once, sorting each namespace's batch once
    ///
    /// Nothing is inserted if any tag is invalid. Returns the number of new tags.
    pub fn add_all<I>(&mut self, tags: I) -> Result<usize>
    where
        I: IntoIterator<Item = (Tag, Option<Attributes>)>,
    {
        let pairs: Vec<(Tag, Option<Attributes>)> = tags.into_iter().collect();

        for (tag, _) in &pairs {
            self.validate(tag)?;
        }

        let mut batches: HashMap<String, Vec<Tag>> = HashMap::new();

        for (tag, attributes) in pairs {
            self.store_attributes(&tag, attributes);
            batches.entry(tag.namespace().to_string()).or_default().push(tag);
        }

        let added = batches
            .into_iter()
            .map(|(namespace, batch)| self.indices.entry(namespace).or_default().extend(batch))
            .sum();

        log::debug!("bulk load added {} tags", added);
        Ok(added)
    }

    /// All tags matching `query` under `mode`, across namespaces, in Key order
    pub fn get(&self, query: impl CharQuery, mode: Containment) -> Vec<&Tag> {
        let range = query.char_range(self.char_len);

        let mut tags: Vec<&Tag> = self
            .indices
            .values()
            .flat_map(|index| index.query(range.clone(), mode))
            .collect();

        if self.indices.len() > 1 {
            tags.sort_unstable();
        }

        tags
    }

    /// Remove all tags matching `query` under `mode` together with their attributes
    pub fn remove(&mut self, query: impl CharQuery, mode: Containment) -> Vec<Tag> {
        let range = query.char_range(self.char_len);

        let mut removed: Vec<Tag> = self
            .indices
            .values_mut()
            .flat_map(|index| index.remove(range.clone(), mode))
            .collect();

        removed.sort_unstable();
        self.forget(&removed);
        removed
    }

    /// Remove specific tags; returns how many were present
    pub fn remove_tags<'a, I>(&mut self, tags: I) -> usize
    where
        I: IntoIterator<Item = &'a Tag>,
    {
        let mut removed = Vec::new();

        for tag in tags {
            let present = self
                .indices
                .get_mut(tag.namespace())
                .map(|index| index.remove_tag(tag))
                .unwrap_or(false);

            if present {
                removed.push(tag.clone());
            }
        }

        self.forget(&removed);
        removed.len()
    }

    /// Drop a whole namespace, returning its tags in Key order
    pub fn remove_namespace(&mut self, namespace: &str) -> Vec<Tag> {
        let Some(index) = self.indices.remove(namespace) else {
            return Vec::new();
        };

        let removed: Vec<Tag> = index.iter().cloned().collect();
        for tag in &removed {
            self.attributes.remove(tag);
        }
        removed
    }

    /// Drop attributes of removed tags and namespaces left empty
    fn forget(&mut self, removed: &[Tag]) {
        for tag in removed {
            self.attributes.remove(tag);
        }
        self.indices.retain(|_, index| !index.is_empty());
    }

    /// All tags in the requested order
    pub fn tags(&self, order: TagOrder) -> Vec<&Tag> {
        if self.indices.len() == 1 {
            if let Some(index) = self.indices.values().next() {
                return match order {
                    TagOrder::Key => index.iter().collect(),
                    TagOrder::ReverseKey => index.iter_reverse_key().collect(),
                };
            }
        }

        let mut tags: Vec<&Tag> = self.indices.values().flat_map(|index| index.iter()).collect();

        match order {
            TagOrder::Key => tags.sort_unstable(),
            TagOrder::ReverseKey => tags.sort_unstable_by(|a, b| a.reverse_key_cmp(b)),
        }

        tags
    }

    /// Tags with their attributes, in Key order
    pub fn tags_with_attributes(&self) -> Vec<(&Tag, Option<&Attributes>)> {
        self.tags(TagOrder::Key)
            .into_iter()
            .map(|tag| (tag, self.attributes.get(tag)))
            .collect()
    }

    /// Names of all namespaces holding at least one tag, in no particular order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.indices.keys().map(String::as_str)
    }

    /// Tags of one namespace with their attributes, in Key order
    pub fn namespace_tags(&self, namespace: &str) -> Vec<(&Tag, Option<&Attributes>)> {
        self.indices
            .get(namespace)
            .map(|index| index.iter().map(|tag| (tag, self.attributes.get(tag))).collect())
            .unwrap_or_default()
    }

    /// `(id, covered text, attributes)` for every tag of a namespace, in Key order
    pub fn tokens(&self, namespace: &str) -> Vec<Token<'_>> {
        self.namespace_tags(namespace)
            .into_iter()
            .map(|(tag, attributes)| Token {
                id: tag.id(),
                text: self.covered_text(tag),
                attributes,
            })
            .collect()
    }

    /// Text covered by `tag`; sub-spans are concatenated, points cover nothing
    pub fn tag_text(&self, tag: &Tag) -> Result<String> {
        self.validate(tag)?;
        Ok(self.covered_text(tag))
    }

    fn covered_text(&self, tag: &Tag) -> String {
        let map = self.utf8();

        tag.offsets()
            .spans()
            .map(|(start, end)| &self.text[map[start]..map[end]])
            .collect()
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.indices
            .get(tag.namespace())
            .map(|index| index.contains(tag))
            .unwrap_or(false)
    }

    /// Number of tags across all namespaces
    pub fn len(&self) -> usize {
        self.indices.values().map(OrderedTagIndex::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Text length in code points
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn attributes(&self, tag: &Tag) -> Option<&Attributes> {
        self.attributes.get(tag)
    }

    /// Merge the tags and attributes of another annotation of the same text
    pub fn update(&mut self, other: &AnnotatedText) -> Result<()> {
        if self.text != other.text {
            return Err(TextError::TextMismatch(self.hex_digest(), other.hex_digest()));
        }

        let pairs: Vec<(Tag, Option<Attributes>)> = other
            .tags_with_attributes()
            .into_iter()
            .map(|(tag, attributes)| (tag.clone(), attributes.cloned()))
            .collect();

        self.add_all(pairs)?;
        Ok(())
    }

    /// MD5 digest of the UTF-8 text
    pub fn checksum(&self) -> &[u8] {
        self.md5.get_or_init(|| HashType::Md5.digest(self.text.as_bytes()))
    }

    /// Digest of the text in any supported hash and encoding
    pub fn digest(&self, hash: HashType, encoding: Encoding) -> Vec<u8> {
        if hash == HashType::Md5 && encoding == Encoding::Utf8 {
            return self.checksum().to_vec();
        }
        hash.digest(&encoding.encode(&self.text))
    }

    /// Hex rendering of [`checksum`](Self::checksum)
    pub fn hex_digest(&self) -> String {
        hex::encode(self.checksum())
    }

    /// URL-safe base64 rendering of [`checksum`](Self::checksum)
    pub fn base64_digest(&self) -> String {
        base64_digest(self.checksum())
    }

    /// UTF-8 byte position of every code point, plus the total length
    pub fn utf8(&self) -> &[usize] {
        self.utf8.get_or_init(|| offset_map(&self.text, Encoding::Utf8))
    }

    /// UTF-16 byte position of every code point, plus the total length
    pub fn utf16(&self) -> &[usize] {
        self.utf16.get_or_init(|| offset_map(&self.text, Encoding::Utf16Le))
    }

    /// UTF-32 byte position of every code point, plus the total length
    pub fn utf32(&self) -> &[usize] {
        self.utf32.get_or_init(|| offset_map(&self.text, Encoding::Utf32Le))
    }

    /// Seed the offset map cache of `encoding` with a precomputed map
    ///
    /// Maps of the wrong shape are rejected and nothing is cached. A map that
    /// is already cached is kept.
    pub fn set_offset_map(&mut self, encoding: Encoding, map: &[usize]) -> Result<()> {
        let map = check_map(map, self.char_len, encoding)?;
        let cell = match encoding {
            Encoding::Utf8 => &self.utf8,
            Encoding::Utf16Le | Encoding::Utf16Be => &self.utf16,
            Encoding::Utf32Le | Encoding::Utf32Be => &self.utf32,
        };

        if cell.set(map).is_err() {
            log::debug!("{} map already cached", encoding);
        }
        Ok(())
    }
}

/// Equal texts with equal tag sets; attributes are not compared
impl PartialEq for AnnotatedText {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.indices == other.indices
    }
}

impl Eq for AnnotatedText {}
