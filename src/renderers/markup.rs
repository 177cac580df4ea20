//! Markup renderer: annotated text to nested XML-like elements
//!
//! Every tag becomes an element named `namespace:id` around the text it
//! spans. Elements are opened in Key order; tags sharing both start and end
//! nest by ascending weight (see [`MarkupOptions::weight`]). Tags that
//! overlap without nesting cannot be expressed as elements and are reported
//! instead of being split.

use crate::config::MarkupOptions;
use crate::error::{Result, TextError};
use crate::models::attributes::scalar_to_string;
use crate::models::Tag;
use crate::text::AnnotatedText;
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use regex::Regex;
use std::cmp::Ordering;

/// Element attribute holding the relative sub-span boundaries of multi-span tags
pub const OFFSETS_ATTRIBUTE: &str = "offsets";

static XML_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{N}._\-]*(?::[\p{L}_][\p{L}\p{N}._\-]*)?$").expect("Invalid element name pattern")
});

/// Check that `name` can be used as an (optionally prefixed) element name
pub fn validate_name(name: &str) -> Result<()> {
    if XML_NAME.is_match(name) {
        Ok(())
    } else {
        Err(TextError::InvalidMarkup(format!("'{}' is not a valid element name", name)))
    }
}

/// Nesting order: start ascending, end descending, weight, namespace, id, offsets
fn nesting_cmp(a: &(&Tag, u64), b: &(&Tag, u64)) -> Ordering {
    let (a, a_weight) = a;
    let (b, b_weight) = b;

    a.start()
        .cmp(&b.start())
        .then_with(|| b.end().cmp(&a.end()))
        .then_with(|| a_weight.cmp(b_weight))
        .then_with(|| a.namespace().cmp(b.namespace()))
        .then_with(|| a.id().cmp(b.id()))
        .then_with(|| a.offsets().as_slice().cmp(b.offsets().as_slice()))
}

struct MarkupWriter<'a> {
    source: &'a str,
    map: &'a [usize],
    out: String,
    /// Code-point position up to which text has been written
    cursor: usize,
}

impl<'a> MarkupWriter<'a> {
    fn text_until(&mut self, position: usize) {
        if position > self.cursor {
            let slice = &self.source[self.map[self.cursor]..self.map[position]];
            self.out.push_str(&escape(slice));
            self.cursor = position;
        }
    }

    fn open(&mut self, name: &str, attributes: &[(String, String)], empty: bool) {
        self.out.push('<');
        self.out.push_str(name);

        for (key, value) in attributes {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape(value.as_str()));
            self.out.push('"');
        }

        self.out.push_str(if empty { "/>" } else { ">" });
    }

    fn close(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }
}

/// Element attributes of a tag: relative offsets, then (optionally) scalar tag attributes
fn element_attributes(text: &AnnotatedText, tag: &Tag, options: &MarkupOptions) -> Vec<(String, String)> {
    let mut attributes = Vec::new();

    if tag.offsets().is_multi_span() {
        let relative: Vec<String> = tag.offsets().relative().iter().map(|o| o.to_string()).collect();
        attributes.push((OFFSETS_ATTRIBUTE.to_string(), relative.join(" ")));
    }

    if options.emit_attributes {
        if let Some(values) = text.attributes(tag) {
            let mut names: Vec<&String> = values.keys().collect();
            names.sort();

            for name in names {
                if name == OFFSETS_ATTRIBUTE || name.contains(':') || validate_name(name).is_err() {
                    log::debug!("skipping attribute '{}' of {}", name, tag);
                    continue;
                }

                if let Some(value) = values.get(name).and_then(scalar_to_string) {
                    attributes.push((name.clone(), value));
                }
            }
        }
    }

    attributes
}

/// Render the annotated text as markup
pub fn to_markup(text: &AnnotatedText, options: &MarkupOptions) -> Result<String> {
    let mut tags: Vec<(&Tag, u64)> = text
        .tags(crate::text::TagOrder::Key)
        .into_iter()
        .filter(|tag| options.includes(tag.namespace()))
        .map(|tag| (tag, options.weight(tag)))
        .collect();
    tags.sort_by(nesting_cmp);

    let mut writer = MarkupWriter {
        source: text.as_str(),
        map: text.utf8(),
        out: String::with_capacity(text.as_str().len() + 16 * tags.len()),
        cursor: 0,
    };

    if let Some(root) = &options.root {
        validate_name(root)?;
        writer.open(root, &[], false);
    }

    let mut stack: Vec<(&Tag, String)> = Vec::new();

    for (tag, _) in tags {
        while let Some((open, _)) = stack.last() {
            if open.end() > tag.start() {
                break;
            }
            if let Some((open, name)) = stack.pop() {
                writer.text_until(open.end());
                writer.close(&name);
            }
        }

        if let Some((open, _)) = stack.last() {
            if tag.end() > open.end() {
                log::warn!("cannot nest {} inside {}", tag, open);
                return Err(TextError::NonHierarchicalTag {
                    outer: open.to_string(),
                    inner: tag.to_string(),
                });
            }
        }

        writer.text_until(tag.start());

        // a bare name would read back under the default namespace
        if tag.namespace().is_empty() && !options.namespaces.contains_key("") {
            return Err(TextError::InvalidMarkup(format!("tag {} has an empty namespace", tag)));
        }

        let name = options.element_name(tag);
        validate_name(&name)?;
        let attributes = element_attributes(text, tag, options);

        if tag.offsets().is_point() {
            writer.open(&name, &attributes, true);
        } else {
            writer.open(&name, &attributes, false);
            stack.push((tag, name));
        }
    }

    while let Some((open, name)) = stack.pop() {
        writer.text_until(open.end());
        writer.close(&name);
    }

    writer.text_until(text.char_len());

    if let Some(root) = &options.root {
        writer.close(root);
    }

    Ok(writer.out)
}
