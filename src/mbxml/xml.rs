//! Textual XML adapter built on `quick-xml`.
//!
//! Loading keeps the element structure, attributes in document order and the
//! *direct* text of each element: all text and CDATA fragments that are
//! immediate children, concatenated. An empty concatenation is stored as no
//! text. Comments, processing instructions, the declaration and DOCTYPE are
//! skipped.
//!
//! Saving writes an element's text as one fragment placed before its children.
//! Text that sat between child elements in the source therefore moves to the
//! front: loading and saving normalizes mixed content rather than preserving it.
//!
//! XML forbids repeated attribute names, which the binary model allows. When
//! saving, a repeated name keeps the position of its first occurrence and the
//! value of its last one.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use log::{debug, info};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::mbxml::types::error::{MbxmlError, Result};
use crate::mbxml::types::models::{Element, XmlOptions};

/// Parses an XML document into its root element.
pub fn parse_str(xml: &str, options: &XmlOptions) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    // Open elements with their accumulated direct text.
    let mut open: Vec<(Element, String)> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(MbxmlError::Xml("more than one root element".to_string()));
                }
                open.push((start_element(&e)?, String::new()));
            }
            Event::Empty(e) => {
                if root.is_some() {
                    return Err(MbxmlError::Xml("more than one root element".to_string()));
                }
                close_element(start_element(&e)?, String::new(), &mut open, &mut root);
            }
            Event::End(_) => {
                let (element, text) = open
                    .pop()
                    .ok_or_else(|| MbxmlError::Xml("unexpected closing tag".to_string()))?;
                close_element(element, text, &mut open, &mut root);
            }
            Event::Text(t) => {
                if let Some((_, text)) = open.last_mut() {
                    let fragment = t.unescape()?;
                    if options.preserve_whitespace || !fragment.trim().is_empty() {
                        text.push_str(&fragment);
                    }
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = open.last_mut() {
                    let fragment = String::from_utf8(c.into_inner().into_owned())
                        .map_err(|e| MbxmlError::Xml(format!("CDATA is not valid UTF-8: {}", e)))?;
                    text.push_str(&fragment);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !open.is_empty() {
        return Err(MbxmlError::Xml(format!("unclosed element <{}>", open[open.len() - 1].0.tag)));
    }
    let root = root.ok_or_else(|| MbxmlError::Xml("document has no root element".to_string()))?;
    debug!("Parsed XML: root <{}>, {} elements", root.tag, root.subtree_len());
    Ok(root)
}

/// Reads and parses an XML file.
pub fn load(path: impl AsRef<Path>, options: &XmlOptions) -> Result<Element> {
    let path = path.as_ref();
    info!("Loading XML: {}", path.display());
    let xml = fs::read_to_string(path)?;
    parse_str(&xml, options)
}

/// Writes `root` as an XML fragment, without a declaration.
pub fn write<W: Write>(root: &Element, writer: W, options: &XmlOptions) -> Result<()> {
    let mut writer = new_writer(writer, options);
    write_element(&mut writer, root)
}

/// Renders `root` to a string, without a declaration.
pub fn to_string(root: &Element, options: &XmlOptions) -> Result<String> {
    let mut buf = Vec::new();
    write(root, &mut buf, options)?;
    String::from_utf8(buf).map_err(|e| MbxmlError::Xml(e.to_string()))
}

/// Writes `root` to `path` as a UTF-8 document with an XML declaration.
/// An existing file is overwritten.
pub fn save(root: &Element, path: impl AsRef<Path>, options: &XmlOptions) -> Result<()> {
    let path = path.as_ref();
    info!("Saving XML: {}", path.display());
    let file = BufWriter::new(File::create(path)?);
    let mut writer = new_writer(file, options);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write_element(&mut writer, root)?;
    writer.into_inner().flush()?;
    Ok(())
}

fn new_writer<W: Write>(inner: W, options: &XmlOptions) -> Writer<W> {
    match options.indent {
        Some(width) => Writer::new_with_indent(inner, b' ', width),
        None => Writer::new(inner),
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, root: &Element) -> Result<()> {
    enum Step<'a> {
        Open(&'a Element),
        Close(&'a str),
    }

    let mut steps = vec![Step::Open(root)];
    while let Some(step) = steps.pop() {
        let element = match step {
            Step::Open(element) => element,
            Step::Close(tag) => {
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
                continue;
            }
        };

        let mut start = BytesStart::new(element.tag.as_str());
        for (name, value) in merged_attributes(&element.attributes) {
            start.push_attribute((name, value));
        }

        let text = element.text.as_deref().filter(|t| !t.is_empty());
        if text.is_none() && element.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            continue;
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        steps.push(Step::Close(element.tag.as_str()));
        steps.extend(element.children.iter().rev().map(Step::Open));
    }
    Ok(())
}

/// Collapses repeated attribute names: first position, last value.
fn merged_attributes(attributes: &[(String, String)]) -> Vec<(&str, &str)> {
    let mut merged: Vec<(&str, &str)> = Vec::with_capacity(attributes.len());
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(attributes.len());
    for (name, value) in attributes {
        match positions.get(name.as_str()) {
            Some(&position) => merged[position].1 = value.as_str(),
            None => {
                positions.insert(name.as_str(), merged.len());
                merged.push((name.as_str(), value.as_str()));
            }
        }
    }
    merged
}

fn start_element(e: &BytesStart) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MbxmlError::Xml(format!("failed to parse attribute: {}", e)))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((name, value));
    }
    Ok(element)
}

fn close_element(
    mut element: Element,
    text: String,
    open: &mut [(Element, String)],
    root: &mut Option<Element>,
) {
    if !text.is_empty() {
        element.text = Some(text);
    }
    match open.last_mut() {
        Some((parent, _)) => parent.children.push(element),
        None => *root = Some(element),
    }
}
