//! Document operations for the WASM API
//!
//! The module keeps one annotated text, the current document, in a global.
//! Each exported function locks it, runs an operation from the core API and
//! converts errors to JavaScript strings. The operations themselves are plain
//! Rust functions so they can be tested natively.

use crate::api::helpers::{deserialize, serialize, to_js_error};
use crate::converters::wire::{AnnotationObject, TextObject};
use crate::converters::from_json_str;
use crate::error::{Result as TextResult, TextError};
use crate::models::{Attributes, Tag};
use crate::text::codec::{self, Encoding};
use crate::text::{AnnotatedText, Containment};
use crate::{wasm_info, wasm_log, wasm_warn};
use lazy_static::lazy_static;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use wasm_bindgen::prelude::*;

// WASM-owned document storage (canonical source of truth)
lazy_static! {
    static ref DOCUMENT: Mutex<Option<AnnotatedText>> = Mutex::new(None);
}

/// Lock the current document; a poisoned lock still holds a consistent text
pub(crate) fn lock_document() -> MutexGuard<'static, Option<AnnotatedText>> {
    DOCUMENT.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run `f` on the current document
pub(crate) fn with_document<T>(f: impl FnOnce(&mut AnnotatedText) -> TextResult<T>) -> TextResult<T> {
    let mut guard = lock_document();
    let document = guard
        .as_mut()
        .ok_or(TextError::NoDocument)?;
    f(document)
}

pub(crate) fn replace_document(text: AnnotatedText) -> usize {
    let tags = text.len();
    *lock_document() = Some(text);
    tags
}

/// A tag as handed to JavaScript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagView {
    pub namespace: String,
    pub id: String,
    pub offsets: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

impl TagView {
    fn new(tag: &Tag, attributes: Option<&Attributes>) -> Self {
        Self {
            namespace: tag.namespace().to_string(),
            id: tag.id().to_string(),
            offsets: tag.offsets().as_slice().to_vec(),
            attributes: attributes.cloned(),
        }
    }
}

fn containment(contained: bool) -> Containment {
    if contained {
        Containment::Contained
    } else {
        Containment::Covers
    }
}

// ============================================================================
// Core operations
// ============================================================================

pub(crate) fn add_tag_impl(namespace: &str, id: &str, offsets: &[u32], attributes: Option<Attributes>) -> TextResult<bool> {
    let offsets: Vec<usize> = offsets.iter().map(|&o| o as usize).collect();
    let tag = Tag::new(namespace, id, &offsets)?;
    with_document(|document| document.add(tag, attributes))
}

pub(crate) fn get_tags_impl(start: usize, end: usize, contained: bool) -> TextResult<Vec<TagView>> {
    with_document(|document| {
        Ok(document
            .get(start..end, containment(contained))
            .into_iter()
            .map(|tag| TagView::new(tag, document.attributes(tag)))
            .collect())
    })
}

pub(crate) fn remove_tags_impl(start: usize, end: usize, contained: bool) -> TextResult<usize> {
    with_document(|document| Ok(document.remove(start..end, containment(contained)).len()))
}

pub(crate) fn namespaces_impl() -> TextResult<Vec<String>> {
    with_document(|document| {
        let mut namespaces: Vec<String> = document.namespaces().map(str::to_string).collect();
        namespaces.sort();
        Ok(namespaces)
    })
}

pub(crate) fn apply_annotation_impl(json_text: &str) -> TextResult<usize> {
    let value: serde_json::Value = serde_json::from_str(json_text)?;
    let annotation = AnnotationObject::from_json(&value)?;
    with_document(|document| annotation.apply(document))
}

pub(crate) fn byte_range_impl(start: usize, end: usize, encoding: &str) -> TextResult<Vec<usize>> {
    let encoding = Encoding::from_label(encoding)?;
    with_document(|document| {
        let range = codec::to_bytes(document.as_str(), start..end, encoding)?;
        Ok(vec![range.start, range.end])
    })
}

// ============================================================================
// Exported functions
// ============================================================================

/// Replace the current document with an unannotated text
#[wasm_bindgen(js_name = loadText)]
pub fn load_text(text: String) {
    wasm_info!("loadText called: {} bytes", text.len());
    replace_document(AnnotatedText::new(text));
}

/// Replace the current document from its JSON form; returns the tag count
#[wasm_bindgen(js_name = loadJson)]
pub fn load_json(json_text: &str) -> Result<usize, JsValue> {
    wasm_info!("loadJson called: {} bytes", json_text.len());
    let text = from_json_str(json_text).map_err(|e| to_js_error("loadJson", e))?;
    Ok(replace_document(text))
}

/// Replace the current document with the text of a verified text object
#[wasm_bindgen(js_name = loadTextObject)]
pub fn load_text_object(json_text: &str) -> Result<(), JsValue> {
    wasm_info!("loadTextObject called: {} bytes", json_text.len());
    let object = serde_json::from_str::<serde_json::Value>(json_text)
        .map_err(TextError::from)
        .and_then(|value| TextObject::from_json(&value))
        .map_err(|e| to_js_error("loadTextObject", e))?;
    replace_document(object.to_annotated_text());
    Ok(())
}

/// Add the tags of an annotation object to the current document
#[wasm_bindgen(js_name = applyAnnotation)]
pub fn apply_annotation(json_text: &str) -> Result<usize, JsValue> {
    let added = apply_annotation_impl(json_text).map_err(|e| to_js_error("applyAnnotation", e))?;
    if added == 0 {
        wasm_warn!("applyAnnotation: no new tags");
    }
    Ok(added)
}

/// Add one tag; `attributes` may be null. Returns false if the tag existed.
#[wasm_bindgen(js_name = addTag)]
pub fn add_tag(namespace: &str, id: &str, offsets: Vec<u32>, attributes: JsValue) -> Result<bool, JsValue> {
    wasm_log!("addTag called: {}:{} {:?}", namespace, id, offsets);

    let attributes: Option<Attributes> = if attributes.is_null() || attributes.is_undefined() {
        None
    } else {
        Some(deserialize(attributes, "addTag attributes")?)
    };

    add_tag_impl(namespace, id, &offsets, attributes).map_err(|e| to_js_error("addTag", e))
}

/// Tags overlapping (or, with `contained`, inside) `[start, end)`
#[wasm_bindgen(js_name = getTags)]
pub fn get_tags(start: u32, end: u32, contained: bool) -> Result<JsValue, JsValue> {
    let tags = get_tags_impl(start as usize, end as usize, contained).map_err(|e| to_js_error("getTags", e))?;
    serialize(&tags, "getTags")
}

/// Remove matching tags; returns how many were removed
#[wasm_bindgen(js_name = removeTags)]
pub fn remove_tags(start: u32, end: u32, contained: bool) -> Result<usize, JsValue> {
    remove_tags_impl(start as usize, end as usize, contained).map_err(|e| to_js_error("removeTags", e))
}

/// Namespaces of the current document, sorted
#[wasm_bindgen(js_name = getNamespaces)]
pub fn get_namespaces() -> Result<js_sys::Array, JsValue> {
    let namespaces = namespaces_impl().map_err(|e| to_js_error("getNamespaces", e))?;
    Ok(namespaces.iter().map(|ns| JsValue::from_str(ns)).collect())
}

/// Hex MD5 digest of the current text
#[wasm_bindgen(js_name = textChecksum)]
pub fn text_checksum() -> Result<String, JsValue> {
    with_document(|document| Ok(document.hex_digest())).map_err(|e| to_js_error("textChecksum", e))
}

/// Byte range `[start, end]` of a character range in the given encoding
#[wasm_bindgen(js_name = byteRange)]
pub fn byte_range(start: u32, end: u32, encoding: &str) -> Result<Vec<u32>, JsValue> {
    let range = byte_range_impl(start as usize, end as usize, encoding).map_err(|e| to_js_error("byteRange", e))?;
    Ok(range.into_iter().map(|b| b as u32).collect())
}
