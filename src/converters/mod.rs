//! Format converters
//!
//! This module contains the readers (and the JSON writers) of the wire
//! formats an annotated text travels in.

pub mod json;
pub mod markup;
pub mod wire;

// Re-export for convenience
pub use json::{from_json, from_json_str, to_json, to_json_string};
pub use markup::from_markup;
pub use wire::{AnnotationObject, Annotator, TextObject, TextTarget, WireCollection};
