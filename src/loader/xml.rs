//! Owned element tree over `quick-xml` events.
//!
//! Source documents are small enough to hold in memory, and every later stage
//! wants random access (layout detection walks the whole tree before any
//! transaction is built), so the streaming reader is folded into a tree once.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, Vsi2wmError};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Element name without its namespace prefix
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |element| element.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.name == name)
    }

    /// Depth-first, pre-order walk over all descendant elements (excluding `self`)
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        let mut stack: Vec<&XmlElement> = self.elements().collect();
        stack.reverse();
        while let Some(element) = stack.pop() {
            found.push(element);
            let mark = stack.len();
            stack.extend(element.elements());
            stack[mark..].reverse();
        }
        found
    }

    /// First descendant element with the given name, in document order
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.descendants()
            .into_iter()
            .find(|element| element.name == name)
    }

    pub fn has_descendant(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Concatenated direct text content (text and CDATA)
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Trimmed direct text, `None` when blank
    pub fn trimmed_text(&self) -> Option<String> {
        let text = self.text();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Serialized markup of the children
    pub fn inner_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, &mut out);
        }
        out
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    /// Content carried by this element: its markup when it has child elements,
    /// otherwise its text
    pub fn content(&self) -> Option<String> {
        if self.elements().next().is_none() {
            return self.trimmed_text();
        }
        let markup = self.inner_xml();
        let trimmed = markup.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(existing)) = self.children.last_mut() {
            existing.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }
}

fn write_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(element) => write_element(element, out),
        XmlNode::Text(text) => out.push_str(&escape(text.as_str())),
    }
}

fn write_element(element: &XmlElement, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            Vsi2wmError::MalformedDocument(format!("Bad attribute on <{}>: {}", name, e))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| {
            Vsi2wmError::MalformedDocument(format!("Bad attribute value on <{}>: {}", name, e))
        })?;
        attributes.push((key, value.into_owned()));
    }
    Ok(XmlElement::new(name, attributes))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(Vsi2wmError::MalformedDocument(format!(
            "Multiple root elements (second is <{}>)",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn add_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_text(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(Vsi2wmError::MalformedDocument(
            "Text content outside the root element".to_string(),
        )),
    }
}

/// Parse a complete XML document into its root element
pub fn parse_document(content: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(element_from_start(&start)?),
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    Vsi2wmError::MalformedDocument("Unexpected closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|e| {
                    Vsi2wmError::MalformedDocument(format!(
                        "Bad text at position {}: {}",
                        reader.buffer_position(),
                        e
                    ))
                })?;
                add_text(&mut stack, &text)?;
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                add_text(&mut stack, &text)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Vsi2wmError::MalformedDocument(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(Vsi2wmError::MalformedDocument(format!(
            "Unclosed element <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| Vsi2wmError::MalformedDocument("Document has no root element".to_string()))
}

/// Whether `content` is a single well-formed XML element tree
pub fn is_well_formed(content: &str) -> bool {
    parse_document(content).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree_with_cdata_and_attributes() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
<serviceImage version="10.5" buildNumber="42">
  <t id="a&amp;b"><bd><![CDATA[{"x": 1}]]></bd></t>
</serviceImage>"#,
        )
        .unwrap();

        assert_eq!(root.name, "serviceImage");
        assert_eq!(root.attr("buildNumber"), Some("42"));
        let t = root.child("t").unwrap();
        assert_eq!(t.attr("id"), Some("a&b"));
        assert_eq!(t.child("bd").unwrap().text(), r#"{"x": 1}"#);
    }

    #[test]
    fn test_descendants_are_in_document_order() {
        let root = parse_document("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = root.descendants().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
        assert!(root.has_descendant("c"));
        assert!(root.find("zz").is_none());
    }

    #[test]
    fn test_inner_markup_is_reserialized() {
        let root = parse_document(r#"<bd><user id="7">Ann &amp; Bo</user></bd>"#).unwrap();
        assert_eq!(root.content().unwrap(), r#"<user id="7">Ann &amp; Bo</user>"#);
    }

    #[test]
    fn test_mixed_content_keeps_child_markup() {
        let root = parse_document("<bd>Hello <b>World</b></bd>").unwrap();
        assert_eq!(root.content().unwrap(), "Hello <b>World</b>");

        let root = parse_document("<bd>\n  plain &amp; simple\n</bd>").unwrap();
        assert_eq!(root.content().unwrap(), "plain & simple");
        assert!(parse_document("<bd>  </bd>").unwrap().content().is_none());
    }

    #[test]
    fn test_well_formedness() {
        assert!(is_well_formed("<a>1</a>"));
        assert!(is_well_formed("<soap:Envelope><soap:Body/></soap:Envelope>"));
        assert!(!is_well_formed("<a><b></a>"));
        assert!(!is_well_formed("<a>1</a><b/>"));
        assert!(!is_well_formed("plain"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("<a>"));
    }

    #[test]
    fn test_local_name_strips_prefix() {
        let root = parse_document("<soapenv:Envelope/>").unwrap();
        assert_eq!(root.local_name(), "Envelope");
    }
}
