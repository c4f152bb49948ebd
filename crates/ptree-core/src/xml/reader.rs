//! Minimal owned element tree built from `quick-xml` events.
//!
//! The importer needs random access (first-descendant lookups, sibling
//! indexes), so the streaming events are collected into [`Element`]s first.
//! Comments, processing instructions and the declaration are dropped.

use std::fmt::Display;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::TreeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Attributes in source order, values unescaped.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Content>,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        })
    }

    /// First direct child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.child_elements().find(|e| e.name == name)
    }

    /// Concatenated text of this element and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for content in &element.children {
        match content {
            Content::Text(t) => out.push_str(t),
            Content::Element(e) => collect_text(e, out),
        }
    }
}

fn parse_error(message: impl Display, position: impl TryInto<u64>) -> TreeError {
    TreeError::Parse {
        message: message.to_string(),
        position: position.try_into().unwrap_or_default(),
    }
}

/// Parse `text` into its root element.
///
/// # Errors
///
/// Returns [`TreeError::Parse`] for syntax errors, mismatched or unclosed
/// tags, text or a second element outside the root, and empty documents.
pub fn parse_document(text: &str) -> Result<Element, TreeError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| parse_error(e, reader.error_position()))?;
        match event {
            Event::Start(start) => stack.push(open_element(&start, position)?),
            Event::Empty(start) => {
                let element = open_element(&start, position)?;
                close_element(&mut stack, &mut root, element, position)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| parse_error("closing tag without an open element", position))?;
                close_element(&mut stack, &mut root, element, position)?;
            }
            Event::Text(raw) => {
                let text = raw.unescape().map_err(|e| parse_error(e, position))?;
                push_text(&mut stack, &text, position)?;
            }
            Event::CData(raw) => {
                let bytes = raw.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(|e| parse_error(e, position))?;
                push_text(&mut stack, text, position)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(
            format!("unclosed element <{}>", open.name),
            reader.buffer_position(),
        ));
    }
    root.ok_or_else(|| parse_error("document has no root element", 0_u64))
}

fn open_element(start: &BytesStart<'_>, position: impl TryInto<u64> + Copy) -> Result<Element, TreeError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(e, position))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(e, position))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn close_element(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    position: impl TryInto<u64>,
) -> Result<(), TreeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Content::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(parse_error(
            format!("second root element <{}>", element.name),
            position,
        ));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str, position: impl TryInto<u64>) -> Result<(), TreeError> {
    match stack.last_mut() {
        Some(top) => {
            top.children.push(Content::Text(text.to_string()));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(parse_error("text outside the root element", position)),
    }
}
