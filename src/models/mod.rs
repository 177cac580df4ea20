//! Models module for annotated text
//!
//! This module contains the value types shared by the index, the container
//! and the serializers.

pub mod attributes;
pub mod tag;

// Re-export commonly used types
pub use attributes::{merge_attributes, Attributes};
pub use tag::{Offsets, Tag};
