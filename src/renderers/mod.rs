//! Renderers module
//!
//! This module contains export logic for turning an annotated text into
//! nested markup.

pub mod markup;

// Re-export commonly used types
pub use markup::{to_markup, validate_name, OFFSETS_ATTRIBUTE};
