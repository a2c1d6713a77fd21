// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse a report fragment into an element tree.

use crate::errors::MalformedReportError;
use indexmap::IndexMap;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

/// A single element of a parsed report fragment.
///
/// This is a transient view of one fragment, scoped to a single ingestion: it
/// is inspected for classification and extraction and then dropped.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Element {
    /// The tag name of this element.
    pub name: String,

    /// The attributes of this element, in document order.
    pub attrs: IndexMap<String, String>,

    /// The child elements of this element, in document order.
    pub children: Vec<Element>,

    /// The concatenated direct text content of this element.
    pub text: String,
}

impl Element {
    /// Returns the value of the attribute with the given name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Returns the first child element with the given tag name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Returns all child elements with the given tag name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// Parses one report fragment, returning its root [`Element`].
///
/// The entire fragment is rejected on any structural problem: invalid syntax,
/// mismatched or unclosed tags, an empty document, or content outside the root
/// element. No partial tree is returned.
pub fn parse_report(fragment: &str) -> Result<Element, MalformedReportError> {
    let mut reader = Reader::from_str(fragment);
    reader.trim_text(true);

    let mut root: Option<Element> = None;
    let mut open: Vec<Element> = Vec::new();

    loop {
        match reader.read_event().map_err(MalformedReportError::Xml)? {
            Event::Start(start) => {
                if root.is_some() && open.is_empty() {
                    return Err(MalformedReportError::ContentOutsideRoot);
                }
                open.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                if root.is_some() && open.is_empty() {
                    return Err(MalformedReportError::ContentOutsideRoot);
                }
                let element = element_from_start(&start)?;
                attach(element, &mut open, &mut root);
            }
            Event::End(end) => {
                // Mismatched names are caught by the reader; a stray end tag
                // with nothing open is not.
                let Some(element) = open.pop() else {
                    return Err(MalformedReportError::UnmatchedEndTag {
                        found: String::from_utf8_lossy(end.name().into_inner()).into_owned(),
                    });
                };
                attach(element, &mut open, &mut root);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(MalformedReportError::Xml)?;
                match open.last_mut() {
                    Some(element) => element.text.push_str(&text),
                    None => return Err(MalformedReportError::ContentOutsideRoot),
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                match open.last_mut() {
                    Some(element) => element.text.push_str(&String::from_utf8_lossy(&data)),
                    None => return Err(MalformedReportError::ContentOutsideRoot),
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            // carry no result data.
            _ => {}
        }
    }

    if let Some(element) = open.pop() {
        return Err(MalformedReportError::UnclosedElement { name: element.name });
    }
    root.ok_or(MalformedReportError::NoRootElement)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, MalformedReportError> {
    let name = String::from_utf8_lossy(start.name().into_inner()).into_owned();
    let mut attrs = IndexMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|error| MalformedReportError::Xml(error.into()))?;
        let key = String::from_utf8_lossy(attr.key.into_inner()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(MalformedReportError::Xml)?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(element: Element, open: &mut Vec<Element>, root: &mut Option<Element>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}
