//! In-memory XML tree that keeps everything the catalogs care about:
//! attribute order, whitespace text, comments and CDATA.

use l10nrebase_core::{RebaseError, Result};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    CData(String),
    ProcessingInstruction(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Node::Element(e) => e.write_to(out),
            Node::Text(t) => out.push_str(&partial_escape(t.as_str())),
            Node::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
            Node::CData(c) => {
                out.push_str("<![CDATA[");
                out.push_str(c);
                out.push_str("]]>");
            }
            Node::ProcessingInstruction(p) => {
                out.push_str("<?");
                out.push_str(p);
                out.push_str("?>");
            }
        }
    }
}

/// Decision taken for one child node while rebuilding a tree.
#[derive(Debug)]
pub enum Rewrite {
    Keep,
    /// Remove the node together with its tail (the whitespace after it).
    Drop,
    Replace(Element),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(idx).1)
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// All descendant elements named `name`, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }

    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.child_elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        for child in self.children.iter_mut() {
            if let Node::Element(e) = child {
                if pred(e) {
                    return Some(e);
                }
                if let Some(found) = e.find_mut(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Visit this element and every descendant element, parents first.
    pub fn for_each_element_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        f(self);
        for child in self.children.iter_mut() {
            if let Node::Element(e) = child {
                e.for_each_element_mut(f);
            }
        }
    }

    /// Build a new tree, asking `decide` about every descendant node.
    /// Kept elements are descended into; replaced ones are taken as given.
    pub fn rewrite<F>(&self, decide: &mut F) -> Element
    where
        F: FnMut(&Node) -> Rewrite,
    {
        let mut children = Vec::with_capacity(self.children.len());
        let mut drop_tail = false;
        for child in &self.children {
            if std::mem::take(&mut drop_tail) && child.is_blank_text() {
                continue;
            }
            match decide(child) {
                Rewrite::Keep => children.push(match child {
                    Node::Element(e) => Node::Element(e.rewrite(decide)),
                    other => other.clone(),
                }),
                Rewrite::Drop => drop_tail = true,
                Rewrite::Replace(e) => children.push(Node::Element(e)),
            }
        }
        Element {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children,
        }
    }

    /// Append `child` after the last element child, reusing the whitespace
    /// the existing children are laid out with.
    pub fn append_element(&mut self, child: Element) {
        let closing = match self.children.last() {
            Some(Node::Text(t)) if t.trim().is_empty() => self.children.pop(),
            _ => None,
        };
        let indent = self
            .children
            .iter()
            .rposition(|n| matches!(n, Node::Element(_)))
            .and_then(|idx| idx.checked_sub(1))
            .and_then(|idx| match &self.children[idx] {
                Node::Text(t) if t.trim().is_empty() => Some(t.clone()),
                _ => None,
            });
        let has_elements = self.child_elements().next().is_some();
        if has_elements {
            if let Some(ws) = indent.or_else(|| closing.as_ref().and_then(text_of)) {
                self.children.push(Node::Text(ws));
            }
        } else if let Some(ws) = closing.as_ref().and_then(text_of) {
            self.children.push(Node::Text(ws));
        }
        self.children.push(Node::Element(child));
        if let Some(closing) = closing {
            self.children.push(closing);
        }
    }

    /// Concatenated text of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
                _ => {}
            }
        }
    }

    /// Serialized children, i.e. the element without its own tags.
    pub fn inner_xml(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_to(&mut out);
        }
        out
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_attr(v, out);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_to(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(prev)) = self.children.last_mut() {
            prev.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    fn from_start(start: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let mut el = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            el.attributes.push((key, value.into_owned()));
        }
        Ok(el)
    }
}

fn text_of(node: &Node) -> Option<String> {
    match node {
        Node::Text(t) => Some(t.clone()),
        _ => None,
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#09;"),
            c => out.push(c),
        }
    }
}

/// Parsed document: the root element plus comments found before it.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub leading_comments: Vec<String>,
    pub root: Element,
}

fn xml_error(path: &Path, message: impl Into<String>) -> color_eyre::Report {
    RebaseError::Xml {
        path: path.to_path_buf(),
        message: message.into(),
    }
    .into()
}

/// Parse `xml` into a tree. `path` is only used for diagnostics.
pub fn parse_document(xml: &str, path: &Path) -> Result<XmlDocument> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.trim_text(false);
    config.expand_empty_elements = true;

    let mut leading_comments = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let pos = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| xml_error(path, format!("error at byte {pos}: {e}")))?;
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(xml_error(path, "content after the root element"));
                }
                stack.push(Element::from_start(&start).map_err(|e| xml_error(path, e))?);
            }
            Event::End(_) => {
                let done = stack
                    .pop()
                    .ok_or_else(|| xml_error(path, "unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(done)),
                    None => root = Some(done),
                }
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| xml_error(path, e.to_string()))?;
                    parent.push_text(&text);
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let data = String::from_utf8_lossy(&data).into_owned();
                    parent.children.push(Node::CData(data));
                }
            }
            Event::Comment(comment) => {
                let body = String::from_utf8_lossy(&comment).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Comment(body)),
                    None if root.is_none() => leading_comments.push(body),
                    None => {}
                }
            }
            Event::PI(pi) => {
                if let Some(parent) = stack.last_mut() {
                    let body = String::from_utf8_lossy(&pi).into_owned();
                    parent.children.push(Node::ProcessingInstruction(body));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error(path, format!("unclosed element <{}>", stack[stack.len() - 1].name)));
    }
    let root = root.ok_or_else(|| xml_error(path, "document has no root element"))?;
    Ok(XmlDocument {
        leading_comments,
        root,
    })
}

/// Raw bodies of the comments that precede the root element of `path`.
pub fn leading_comments(path: &Path) -> Result<Vec<String>> {
    let xml = std::fs::read_to_string(path)?;
    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(false);
    let mut out = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Comment(c)) => out.push(String::from_utf8_lossy(&c).into_owned()),
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) | Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(path, e.to_string())),
        }
    }
    tracing::debug!(event = "leading_comments", path = %path.display(), count = out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(xml: &str) -> XmlDocument {
        parse_document(xml, &PathBuf::from("test.xml")).unwrap()
    }

    #[test]
    fn round_trips_whitespace_comments_and_attribute_order() {
        let xml = "<root b=\"2\" a=\"1\">\n  <!-- note -->\n  <x>a &amp; b</x>\n  <y z=\"&quot;q&quot;\"/>\n</root>";
        let doc = parse(xml);
        assert_eq!(doc.root.to_xml_string(), xml);
    }

    #[test]
    fn collects_comments_before_the_root_only() {
        let doc = parse("<?xml version=\"1.0\"?>\n<!-- Copyright -->\n<!--second-->\n<root><!-- inner --></root>");
        assert_eq!(doc.leading_comments, vec![" Copyright ", "second"]);
        assert!(matches!(doc.root.children[0], Node::Comment(_)));
    }

    #[test]
    fn empty_elements_are_written_without_padding() {
        let doc = parse("<root><part file=\"a.grdp\" /><e></e></root>");
        assert_eq!(doc.root.to_xml_string(), "<root><part file=\"a.grdp\"/><e/></root>");
    }

    #[test]
    fn rewrite_drops_nodes_with_their_tail() {
        let doc = parse("<r>\n  <a/>\n  <!-- c -->\n  <b/>\n</r>");
        let out = doc.root.rewrite(&mut |n: &Node| match n {
            Node::Comment(_) => Rewrite::Drop,
            Node::Element(e) if e.name == "a" => Rewrite::Drop,
            _ => Rewrite::Keep,
        });
        assert_eq!(out.to_xml_string(), "<r>\n  <b/>\n</r>");
        // input untouched
        assert_eq!(doc.root.child_elements().count(), 2);
    }

    #[test]
    fn append_element_follows_sibling_layout() {
        let mut doc = parse("<r>\n    <m>1</m>\n  </r>");
        let mut m = Element::new("m");
        m.children.push(Node::Text("2".into()));
        doc.root.append_element(m);
        assert_eq!(doc.root.to_xml_string(), "<r>\n    <m>1</m>\n    <m>2</m>\n  </r>");
    }

    #[test]
    fn reports_malformed_input_with_path() {
        let err = parse_document("<a><b></a>", &PathBuf::from("bad.grd")).unwrap_err();
        assert!(err.to_string().contains("bad.grd"));
        assert!(err.downcast_ref::<RebaseError>().is_some());
    }

    #[test]
    fn leading_comments_reads_raw_bodies_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.grd");
        std::fs::write(&p, "<?xml version=\"1.0\"?>\n<!-- a &amp; b -->\n<grit><!-- no --></grit>").unwrap();
        assert_eq!(leading_comments(&p).unwrap(), vec![" a &amp; b "]);
    }
}
