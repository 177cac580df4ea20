//! Export operations for the WASM API
//!
//! This module provides functions to export the current document to, and
//! import it from, its serialized forms:
//! - JSON: text, tags and attribute metadata with a checksum
//! - Markup: nested elements, configured by optional YAML options

use crate::api::document::{replace_document, with_document};
use crate::api::helpers::{markup_options, to_js_error};
use crate::converters::{from_markup, json};
use crate::error::Result as TextResult;
use crate::renderers::to_markup;
use crate::{wasm_error, wasm_info};
use wasm_bindgen::prelude::*;

pub(crate) fn export_json_impl() -> TextResult<String> {
    with_document(|document| json::to_json_string(document))
}

pub(crate) fn export_markup_impl(options_yaml: Option<&str>) -> TextResult<String> {
    let options = markup_options(options_yaml)?;
    with_document(|document| to_markup(document, &options))
}

pub(crate) fn import_markup_impl(markup: &str, options_yaml: Option<&str>) -> TextResult<usize> {
    let options = markup_options(options_yaml)?;
    let text = from_markup(markup, &options)?;
    Ok(replace_document(text))
}

// ============================================================================
// JSON Export
// ============================================================================

/// Export the current document as JSON
#[wasm_bindgen(js_name = exportJson)]
pub fn export_json() -> Result<String, JsValue> {
    wasm_info!("exportJson called");
    let json = export_json_impl().map_err(|e| to_js_error("exportJson", e))?;
    wasm_info!("  JSON generated: {} bytes", json.len());
    Ok(json)
}

// ============================================================================
// Markup Export / Import
// ============================================================================

/// Export the current document as markup
///
/// # Parameters
/// * `options_yaml` - optional YAML markup options (weights, renaming, root, ...)
#[wasm_bindgen(js_name = exportMarkup)]
pub fn export_markup(options_yaml: Option<String>) -> Result<String, JsValue> {
    wasm_info!("exportMarkup called");

    let markup = export_markup_impl(options_yaml.as_deref()).map_err(|e| {
        wasm_error!("Markup export error: {}", e);
        to_js_error("exportMarkup", e)
    })?;

    wasm_info!("  Markup generated: {} bytes", markup.len());
    Ok(markup)
}

/// Replace the current document by parsing markup; returns the tag count
#[wasm_bindgen(js_name = importMarkup)]
pub fn import_markup(markup: &str, options_yaml: Option<String>) -> Result<usize, JsValue> {
    wasm_info!("importMarkup called: {} bytes", markup.len());
    import_markup_impl(markup, options_yaml.as_deref()).map_err(|e| to_js_error("importMarkup", e))
}
