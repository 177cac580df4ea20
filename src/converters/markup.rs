//! Markup parser: nested XML-like elements back into an annotated text
//!
//! Character data becomes the text; every element becomes a tag spanning the
//! code points between its start and end. `prefix:local` names map to
//! namespace and id, bare names get the configured default namespace.

use crate::config::MarkupOptions;
use crate::error::{Result, TextError};
use crate::models::{Attributes, Offsets, Tag};
use crate::renderers::markup::OFFSETS_ATTRIBUTE;
use crate::text::AnnotatedText;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;

/// An element whose end tag has not been seen yet
struct OpenElement {
    name: String,
    start: usize,
    relative: Option<Vec<usize>>,
    attributes: Attributes,
}

fn split_name(name: &str, options: &MarkupOptions) -> (String, String) {
    match name.split_once(':') {
        Some((namespace, id)) => (namespace.to_string(), id.to_string()),
        None => (options.default_namespace.clone(), name.to_string()),
    }
}

fn read_element(element: &BytesStart<'_>, start: usize, options: &MarkupOptions) -> Result<OpenElement> {
    let name = std::str::from_utf8(element.name().as_ref())
        .map_err(|e| TextError::InvalidMarkup(format!("element name is not UTF-8: {}", e)))?
        .to_string();

    let mut relative = None;
    let mut attributes = Attributes::new();

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| TextError::InvalidMarkup(e.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| TextError::InvalidMarkup(format!("attribute name is not UTF-8: {}", e)))?
            .to_string();
        let value = attribute.unescape_value()?;

        if key == OFFSETS_ATTRIBUTE {
            let offsets = value
                .split_whitespace()
                .map(str::parse::<usize>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| TextError::InvalidMarkup(format!("bad offsets attribute '{}' on {}", value, name)))?;
            relative = Some(offsets);
        } else if options.emit_attributes {
            attributes.insert(key, Value::String(value.into_owned()));
        }
    }

    Ok(OpenElement {
        name,
        start,
        relative,
        attributes,
    })
}

/// Absolute offsets of a closed element spanning `[start, end)`
fn element_offsets(element: &OpenElement, end: usize) -> Result<Offsets> {
    if end == element.start {
        return Ok(Offsets::point(end));
    }

    match &element.relative {
        Some(relative) => {
            let mismatch = || {
                TextError::InvalidMarkup(format!("offsets attribute of {} does not match its content", element.name))
            };

            let absolute = relative
                .iter()
                .map(|o| element.start.checked_add(*o).ok_or_else(mismatch))
                .collect::<Result<Vec<usize>>>()?;

            if relative.first() != Some(&0) || absolute.last() != Some(&end) {
                return Err(mismatch());
            }

            Offsets::new(absolute)
        }
        None => Offsets::span(element.start, end),
    }
}

fn into_pair(element: OpenElement, offsets: Offsets, options: &MarkupOptions) -> (Tag, Option<Attributes>) {
    let (namespace, id) = split_name(&element.name, options);
    let attributes = if element.attributes.is_empty() {
        None
    } else {
        Some(element.attributes)
    };

    (Tag::from_offsets(namespace, id, offsets), attributes)
}

/// Parse markup produced by [`to_markup`](crate::renderers::markup::to_markup)
pub fn from_markup(markup: &str, options: &MarkupOptions) -> Result<AnnotatedText> {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(false);

    let mut text = String::with_capacity(markup.len());
    let mut position = 0usize;
    let mut open: Vec<OpenElement> = Vec::new();
    let mut tags: Vec<(Tag, Option<Attributes>)> = Vec::new();
    let mut root_open = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let element = read_element(e, position, options)?;

                if !root_open && open.is_empty() && options.root.as_deref() == Some(element.name.as_str()) {
                    root_open = true;
                    continue;
                }

                open.push(element);
            }
            Ok(Event::Empty(ref e)) => {
                let element = read_element(e, position, options)?;
                tags.push(into_pair(element, Offsets::point(position), options));
            }
            Ok(Event::End(_)) => match open.pop() {
                Some(element) => {
                    let offsets = element_offsets(&element, position)?;
                    tags.push(into_pair(element, offsets, options));
                }
                None if root_open => root_open = false,
                None => return Err(TextError::InvalidMarkup("unbalanced end tag".to_string())),
            },
            Ok(Event::Text(e)) => {
                let content = e.unescape()?;
                position += content.chars().count();
                text.push_str(&content);
            }
            Ok(Event::CData(e)) => {
                let content = String::from_utf8(e.into_inner().into_owned())
                    .map_err(|e| TextError::InvalidMarkup(format!("CDATA is not UTF-8: {}", e)))?;
                position += content.chars().count();
                text.push_str(&content);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TextError::InvalidMarkup(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if let Some(element) = open.last() {
        return Err(TextError::InvalidMarkup(format!("element {} is not closed", element.name)));
    }

    log::debug!("parsed {} tags from markup over {} characters", tags.len(), position);
    AnnotatedText::with_tags(text, tags)
}

impl AnnotatedText {
    /// See [`to_markup`](crate::renderers::markup::to_markup)
    pub fn to_markup(&self, options: &MarkupOptions) -> Result<String> {
        crate::renderers::markup::to_markup(self, options)
    }

    /// See [`from_markup`]
    pub fn from_markup(markup: &str, options: &MarkupOptions) -> Result<Self> {
        from_markup(markup, options)
    }
}
