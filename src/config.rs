//! Markup options
//!
//! Controls element nesting weights, namespace renaming and filtering, the
//! optional root element and attribute emission. Options deserialize from
//! YAML; every field has a default, so partial files are fine:
//!
//! ```yaml
//! namespace_weights:
//!   section: 0
//! namespaces:
//!   penn: pos      # rename
//!   offset: ~      # suppress: elements are named by id only
//! include: [section, penn]
//! root: doc
//! emit_attributes: true
//! ```

use crate::error::{Result, TextError};
use crate::models::Tag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Weight of namespaces and ids without a configured weight
///
/// Large enough that any configured weight below it sorts outward, so
/// unweighted tags fall back to namespace then id order.
pub const DEFAULT_WEIGHT: u64 = 1_000_000;

/// Namespace assigned to bare element names when parsing markup
pub const DEFAULT_NAMESPACE: &str = "markup";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupOptions {
    /// Nesting weight per namespace; lower weights enclose higher ones
    pub namespace_weights: HashMap<String, u64>,

    /// Nesting weight per tag id, multiplied with the namespace weight
    pub id_weights: HashMap<String, u64>,

    /// Output namespace per namespace; `None` drops the prefix
    pub namespaces: HashMap<String, Option<String>>,

    /// Emit only these namespaces (all if unset)
    pub include: Option<Vec<String>>,

    /// Wrap the output in this element
    pub root: Option<String>,

    /// Write scalar tag attributes as XML attributes, and read them back
    pub emit_attributes: bool,

    /// Namespace for unprefixed elements when parsing
    pub default_namespace: String,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            namespace_weights: HashMap::new(),
            id_weights: HashMap::new(),
            namespaces: HashMap::new(),
            include: None,
            root: None,
            emit_attributes: false,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl MarkupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: MarkupOptions = serde_yaml::from_str(yaml)?;
        log::debug!(
            "loaded markup options: {} namespace weights, {} renamed namespaces",
            options.namespace_weights.len(),
            options.namespaces.len()
        );
        Ok(options)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| TextError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Set the weight of a namespace
    pub fn with_namespace_weight(mut self, namespace: impl Into<String>, weight: u64) -> Self {
        self.namespace_weights.insert(namespace.into(), weight);
        self
    }

    /// Rename a namespace in output, or drop its prefix with `None`
    pub fn with_namespace_alias(mut self, namespace: impl Into<String>, alias: Option<String>) -> Self {
        self.namespaces.insert(namespace.into(), alias);
        self
    }

    /// Nesting weight of a tag: namespace weight times id weight
    pub fn weight(&self, tag: &Tag) -> u64 {
        let namespace = self
            .namespace_weights
            .get(tag.namespace())
            .copied()
            .unwrap_or(DEFAULT_WEIGHT);
        let id = self.id_weights.get(tag.id()).copied().unwrap_or(DEFAULT_WEIGHT);

        namespace.saturating_mul(id)
    }

    /// Whether the namespace filter lets `namespace` through
    pub fn includes(&self, namespace: &str) -> bool {
        match &self.include {
            Some(selected) => selected.iter().any(|ns| ns == namespace),
            None => true,
        }
    }

    /// Element name of a tag after renaming: `namespace:id` or bare `id`
    pub fn element_name(&self, tag: &Tag) -> String {
        let prefix = match self.namespaces.get(tag.namespace()) {
            Some(Some(alias)) if !alias.is_empty() => Some(alias.as_str()),
            Some(_) => None,
            None => Some(tag.namespace()),
        };

        match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, tag.id()),
            _ => tag.id().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_are_equal() {
        let options = MarkupOptions::default();
        let a = Tag::span("a", "x", 0, 1).unwrap();
        let b = Tag::span("b", "y", 0, 1).unwrap();
        assert_eq!(options.weight(&a), options.weight(&b));
        assert_eq!(options.weight(&a), DEFAULT_WEIGHT * DEFAULT_WEIGHT);
    }

    #[test]
    fn test_zero_weight_wins() {
        let options = MarkupOptions::new().with_namespace_weight("section", 0);
        let tag = Tag::span("section", "p", 0, 6).unwrap();
        assert_eq!(options.weight(&tag), 0);
    }

    #[test]
    fn test_element_names() {
        let options = MarkupOptions::new()
            .with_namespace_alias("penn", Some("pos".to_string()))
            .with_namespace_alias("offset", None);

        assert_eq!(options.element_name(&Tag::point("penn", "NN", 0)), "pos:NN");
        assert_eq!(options.element_name(&Tag::point("offset", "order", 0)), "order");
        assert_eq!(options.element_name(&Tag::point("other", "x", 0)), "other:x");
    }

    #[test]
    fn test_yaml_partial() {
        let options = MarkupOptions::from_yaml_str("namespaces:\n  penn: ~\nroot: doc\n").unwrap();
        assert_eq!(options.namespaces.get("penn"), Some(&None));
        assert_eq!(options.root.as_deref(), Some("doc"));
        assert_eq!(options.default_namespace, DEFAULT_NAMESPACE);
        assert!(options.includes("anything"));
    }

    #[test]
    fn test_yaml_errors() {
        assert!(matches!(
            MarkupOptions::from_yaml_str("namespace_weights: [1, 2]"),
            Err(TextError::Config(_))
        ));
    }
}
