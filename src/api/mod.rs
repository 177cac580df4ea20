//! Annotated text WASM API
//!
//! This module provides the JavaScript-facing API over one current document.
//!
//! # Module Structure
//!
//! - `helpers`: Shared utilities for serialization, error handling, and logging
//! - `document`: Loading the document and tag operations (add, query, remove)
//! - `export`: JSON and markup export/import

pub mod helpers;
pub mod document;
pub mod export;

// Re-export all public functions from modules to maintain the current public API
pub use document::{
    add_tag, apply_annotation, byte_range, get_namespaces, get_tags, load_json, load_text, load_text_object, remove_tags,
    text_checksum, TagView,
};
pub use export::{export_json, export_markup, import_markup};
