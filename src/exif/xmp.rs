//! XMP packet: the RDF/XML document reduced to simple properties.
//!
//! Simple text properties, `rdf:Bag`, `rdf:Seq` and `rdf:Alt` arrays of
//! plain items become editable properties. Anything richer (structures,
//! resource references, nested arrays) is kept verbatim and written back
//! unchanged.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::registry::xmp::{self as schema, RDF_URI};

const PACKET_ID: &str = "W5M0MpCehiHzreSzNTczkc9d";
pub(crate) const DEFAULT_LANG: &str = "x-default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XmpValue {
    Text(String),
    Bag(Vec<String>),
    Seq(Vec<String>),
    /// `(xml:lang, text)` alternatives.
    Alt(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Property {
    /// Canonical schema prefix.
    pub prefix: String,
    pub name: String,
    pub value: XmpValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct XmpPacket {
    /// Declarations needed to write the packet back: prefix → URI.
    namespaces: BTreeMap<String, String>,
    properties: Vec<Property>,
    /// Properties kept as serialized XML.
    opaque: Vec<String>,
}

impl XmpPacket {
    pub(crate) fn parse(xml: &str) -> Result<Self, String> {
        let (root, declared) = parse_dom(xml)?;
        let mut packet = Self::default();
        let mut descriptions = Vec::new();
        collect_descriptions(&root, &declared, &mut descriptions);
        for description in descriptions {
            packet.load_description(description, &declared);
        }
        Ok(packet)
    }

    fn load_description(&mut self, description: &Element, declared: &BTreeMap<String, String>) {
        for (name, value) in &description.attributes {
            let Some((prefix, local)) = name.split_once(':') else {
                continue;
            };
            let Some(uri) = declared.get(prefix) else {
                continue;
            };
            if uri == RDF_URI || prefix == "xml" {
                continue;
            }
            let prefix = self.declare(prefix, uri);
            self.properties.push(Property {
                prefix,
                name: local.to_string(),
                value: XmpValue::Text(value.clone()),
            });
        }

        for child in description.elements() {
            let simple = child
                .name
                .split_once(':')
                .and_then(|(prefix, local)| Some((prefix, local, declared.get(prefix)?)))
                .and_then(|(prefix, local, uri)| Some((prefix, local, uri, classify(child, declared)?)));
            match simple {
                Some((prefix, local, uri, value)) => {
                    let prefix = self.declare(prefix, uri);
                    self.properties.push(Property {
                        prefix,
                        name: local.to_string(),
                        value,
                    });
                }
                None => {
                    for prefix in child.prefixes() {
                        if let Some(uri) = declared.get(&prefix) {
                            self.namespaces.entry(prefix).or_insert_with(|| uri.clone());
                        }
                    }
                    let mut xml = String::new();
                    write_element(&mut xml, child);
                    self.opaque.push(xml);
                }
            }
        }
    }

    /// Register `uri`, returning the canonical prefix for it.
    fn declare(&mut self, file_prefix: &str, uri: &str) -> String {
        let prefix = schema::prefix_for_uri(uri).unwrap_or(file_prefix).to_string();
        self.namespaces.entry(prefix.clone()).or_insert_with(|| uri.to_string());
        prefix
    }

    pub(crate) fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub(crate) fn get(&self, prefix: &str, name: &str) -> Option<&XmpValue> {
        self.properties
            .iter()
            .find(|p| p.prefix == prefix && p.name == name)
            .map(|p| &p.value)
    }

    /// Namespace URI bound to `prefix`, from the packet or the schema table.
    pub(crate) fn namespace_uri(&self, prefix: &str) -> Option<String> {
        self.namespaces
            .get(prefix)
            .cloned()
            .or_else(|| schema::uri_for_prefix(prefix).map(str::to_string))
    }

    /// Bind `prefix` to `uri` unless the packet already binds it.
    pub(crate) fn bind(&mut self, prefix: &str, uri: &str) {
        self.namespaces.entry(prefix.to_string()).or_insert_with(|| uri.to_string());
    }

    /// Set a property; fails when `prefix` has no known namespace.
    pub(crate) fn set(&mut self, prefix: &str, name: &str, value: XmpValue) -> Result<(), String> {
        let uri = self
            .namespace_uri(prefix)
            .ok_or_else(|| format!("unknown XMP namespace prefix `{prefix}`"))?;
        self.namespaces.entry(prefix.to_string()).or_insert(uri);
        match self.properties.iter_mut().find(|p| p.prefix == prefix && p.name == name) {
            Some(property) => property.value = value,
            None => self.properties.push(Property {
                prefix: prefix.to_string(),
                name: name.to_string(),
                value,
            }),
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, prefix: &str, name: &str) -> bool {
        let before = self.properties.len();
        self.properties.retain(|p| p.prefix != prefix || p.name != name);
        self.properties.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.opaque.is_empty()
    }

    pub(crate) fn serialize(&self) -> String {
        let mut xmp = String::new();
        xmp.push_str("<?xpacket begin=\"\u{feff}\" id=\"");
        xmp.push_str(PACKET_ID);
        xmp.push_str("\"?>\n");
        xmp.push_str("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n");
        xmp.push_str("<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n");
        xmp.push_str("<rdf:Description rdf:about=\"\"");
        for (prefix, uri) in &self.namespaces {
            if matches!(prefix.as_str(), "rdf" | "x" | "xml") {
                continue;
            }
            let _ = write!(xmp, "\n  xmlns:{prefix}=\"{}\"", xml_escape(uri));
        }
        xmp.push_str(">\n");

        for property in &self.properties {
            let tag = format!("{}:{}", property.prefix, property.name);
            match &property.value {
                XmpValue::Text(text) => {
                    let _ = writeln!(xmp, "  <{tag}>{}</{tag}>", xml_escape(text));
                }
                XmpValue::Bag(items) | XmpValue::Seq(items) => {
                    let kind = if matches!(property.value, XmpValue::Bag(_)) { "Bag" } else { "Seq" };
                    let _ = writeln!(xmp, "  <{tag}><rdf:{kind}>");
                    for item in items {
                        let _ = writeln!(xmp, "    <rdf:li>{}</rdf:li>", xml_escape(item));
                    }
                    let _ = writeln!(xmp, "  </rdf:{kind}></{tag}>");
                }
                XmpValue::Alt(alts) => {
                    let _ = write!(xmp, "  <{tag}><rdf:Alt>");
                    for (lang, text) in alts {
                        let _ = write!(
                            xmp,
                            "<rdf:li xml:lang=\"{}\">{}</rdf:li>",
                            xml_escape(lang),
                            xml_escape(text)
                        );
                    }
                    let _ = writeln!(xmp, "</rdf:Alt></{tag}>");
                }
            }
        }
        for xml in &self.opaque {
            xmp.push_str("  ");
            xmp.push_str(xml);
            xmp.push('\n');
        }

        xmp.push_str("</rdf:Description>\n");
        xmp.push_str("</rdf:RDF>\n");
        xmp.push_str("</x:xmpmeta>\n");
        xmp.push_str("<?xpacket end=\"w\"?>");
        xmp
    }
}

/// Escape special XML characters.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ── document tree ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    fn has_content_text(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, Node::Text(text) if !text.trim().is_empty()))
    }

    /// Attributes other than `xml:lang`.
    fn has_foreign_attributes(&self) -> bool {
        self.attributes.iter().any(|(name, _)| name != "xml:lang")
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }

    /// Namespace prefixes used anywhere in this subtree.
    fn prefixes(&self) -> Vec<String> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            let names = std::iter::once(&element.name).chain(element.attributes.iter().map(|(n, _)| n));
            for name in names {
                if let Some((prefix, _)) = name.split_once(':') {
                    if !found.iter().any(|p| p == prefix) {
                        found.push(prefix.to_string());
                    }
                }
            }
            stack.extend(element.elements());
        }
        found
    }
}

fn is_rdf(name: &str, local: &str, declared: &BTreeMap<String, String>) -> bool {
    name.split_once(':')
        .is_some_and(|(prefix, l)| l == local && declared.get(prefix).is_some_and(|uri| uri == RDF_URI))
}

fn collect_descriptions<'a>(
    element: &'a Element,
    declared: &BTreeMap<String, String>,
    out: &mut Vec<&'a Element>,
) {
    for child in element.elements() {
        if is_rdf(&child.name, "Description", declared) {
            out.push(child);
        } else {
            collect_descriptions(child, declared, out);
        }
    }
}

/// Simple value of a property element, or `None` when it must stay opaque.
fn classify(element: &Element, declared: &BTreeMap<String, String>) -> Option<XmpValue> {
    if element.has_foreign_attributes() {
        return None;
    }
    let children: Vec<&Element> = element.elements().collect();
    let [container] = children.as_slice() else {
        return children.is_empty().then(|| XmpValue::Text(element.text()));
    };
    if element.has_content_text() || container.has_foreign_attributes() {
        return None;
    }
    let items: Vec<&Element> = container.elements().collect();
    if container.has_content_text()
        || items.iter().any(|li| {
            !is_rdf(&li.name, "li", declared) || li.has_foreign_attributes() || li.elements().next().is_some()
        })
    {
        return None;
    }
    if is_rdf(&container.name, "Bag", declared) {
        Some(XmpValue::Bag(items.iter().map(|li| li.text()).collect()))
    } else if is_rdf(&container.name, "Seq", declared) {
        Some(XmpValue::Seq(items.iter().map(|li| li.text()).collect()))
    } else if is_rdf(&container.name, "Alt", declared) {
        Some(XmpValue::Alt(
            items
                .iter()
                .map(|li| (li.attribute("xml:lang").unwrap_or(DEFAULT_LANG).to_string(), li.text()))
                .collect(),
        ))
    } else {
        None
    }
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        let _ = write!(out, " {name}=\"{}\"", xml_escape(value));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(out, child),
            Node::Text(text) => out.push_str(&xml_escape(text)),
        }
    }
    let _ = write!(out, "</{}>", element.name);
}

/// Parse `xml` into a tree rooted at a synthetic document element, plus
/// every `xmlns:` declaration seen.
fn parse_dom(xml: &str) -> Result<(Element, BTreeMap<String, String>), String> {
    let mut reader = Reader::from_str(xml);
    let mut declared = BTreeMap::new();
    let mut stack = vec![Element::default()];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML error at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => stack.push(start_element(&e, &mut declared)?),
            Event::Empty(e) => {
                let element = start_element(&e, &mut declared)?;
                push_child(&mut stack, Node::Element(element))?;
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err("unbalanced end tag".to_string());
                }
                let Some(element) = stack.pop() else {
                    return Err("unbalanced end tag".to_string());
                };
                push_child(&mut stack, Node::Element(element))?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?.into_owned();
                push_child(&mut stack, Node::Text(text))?;
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_child(&mut stack, Node::Text(text))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok((root, declared)),
        _ => Err("unclosed element at end of packet".to_string()),
    }
}

fn push_child(stack: &mut [Element], node: Node) -> Result<(), String> {
    let parent = stack
        .last_mut()
        .ok_or_else(|| "content outside the document".to_string())?;
    parent.children.push(node);
    Ok(())
}

fn start_element(e: &BytesStart<'_>, declared: &mut BTreeMap<String, String>) -> Result<Element, String> {
    let mut element = Element {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        ..Element::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        if let Some(prefix) = name.strip_prefix("xmlns:") {
            declared.insert(prefix.to_string(), value);
        } else if name != "xmlns" {
            element.attributes.push((name, value));
        }
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmlns:DC="http://purl.org/dc/elements/1.1/"
    xmlns:xmpMM="http://ns.adobe.com/xap/1.0/mm/"
    xmlns:stEvt="http://ns.adobe.com/xap/1.0/sType/ResourceEvent#"
    xmp:Rating="4">
   <DC:title><rdf:Alt><rdf:li xml:lang="x-default">Sunset &amp; sea</rdf:li></rdf:Alt></DC:title>
   <DC:subject>
    <rdf:Bag>
     <rdf:li>sea</rdf:li>
     <rdf:li>sunset</rdf:li>
    </rdf:Bag>
   </DC:subject>
   <DC:creator><rdf:Seq><rdf:li>Anna</rdf:li></rdf:Seq></DC:creator>
   <xmpMM:History>
    <rdf:Seq>
     <rdf:li rdf:parseType="Resource"><stEvt:action>saved</stEvt:action></rdf:li>
    </rdf:Seq>
   </xmpMM:History>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn simple_properties_use_canonical_prefix() {
        let packet = XmpPacket::parse(SAMPLE).unwrap();
        assert_eq!(
            packet.get("dc", "title"),
            Some(&XmpValue::Alt(vec![("x-default".into(), "Sunset & sea".into())]))
        );
        assert_eq!(
            packet.get("dc", "subject"),
            Some(&XmpValue::Bag(vec!["sea".into(), "sunset".into()]))
        );
        assert_eq!(packet.get("dc", "creator"), Some(&XmpValue::Seq(vec!["Anna".into()])));
        assert_eq!(packet.get("xmp", "Rating"), Some(&XmpValue::Text("4".into())));
        assert!(packet.get("xmpMM", "History").is_none());
    }

    #[test]
    fn structures_survive_rewrite() {
        let packet = XmpPacket::parse(SAMPLE).unwrap();
        let written = packet.serialize();
        assert!(written.contains("xmlns:stEvt="));
        assert!(written.contains("<stEvt:action>saved</stEvt:action>"));
        let reparsed = XmpPacket::parse(&written).unwrap();
        assert_eq!(reparsed.properties(), packet.properties());
        assert_eq!(reparsed.opaque, packet.opaque);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(XmpPacket::parse("<x:xmpmeta><rdf:RDF></x:xmpmeta>").is_err());
        assert!(XmpPacket::parse("<a><b>").is_err());
    }

    // ── editing ─────────────────────────────────────────────────────

    #[test]
    fn set_and_remove() {
        let mut packet = XmpPacket::default();
        packet
            .set("photoshop", "Headline", XmpValue::Text("Hi <there>".into()))
            .unwrap();
        assert!(packet.set("nosuch", "Thing", XmpValue::Text(String::new())).is_err());
        let written = packet.serialize();
        assert!(written.contains("xmlns:photoshop=\"http://ns.adobe.com/photoshop/1.0/\""));
        assert!(written.contains("Hi &lt;there&gt;"));
        assert!(packet.remove("photoshop", "Headline"));
        assert!(packet.is_empty());
    }

    #[test]
    fn bound_prefix_accepts_properties() {
        let mut packet = XmpPacket::default();
        packet.bind("acme", "http://acme.example/ns/1.0/");
        packet.set("acme", "Rig", XmpValue::Text("B2".into())).unwrap();
        packet.bind("acme", "http://other.example/");
        assert_eq!(packet.namespace_uri("acme").as_deref(), Some("http://acme.example/ns/1.0/"));
        assert!(packet.serialize().contains("xmlns:acme=\"http://acme.example/ns/1.0/\""));
    }
}
