use crate::tree::{parse_document, Element, Node};
use l10nrebase_core::{MessageId, RebaseError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CATALOG_EXTENSIONS: &[&str] = &["grd", "grdp"];

/// A resource catalog (`.grd`) or catalog part (`.grdp`).
#[derive(Debug, Clone)]
pub struct ResourceDocument {
    pub path: PathBuf,
    /// Comments before the root element; the tree itself never holds them.
    pub leading_comments: Vec<String>,
    pub root: Element,
}

/// Borrowed view of a `<message>` element.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a>(pub &'a Element);

impl<'a> Message<'a> {
    pub fn name(&self) -> &'a str {
        self.0.attr("name").unwrap_or_default()
    }

    pub fn desc(&self) -> Option<&'a str> {
        self.0.attr("desc")
    }

    pub fn meaning(&self) -> Option<&'a str> {
        self.0.attr("meaning")
    }

    /// Message content with the `<message>` tags themselves stripped, so
    /// that only the translatable markup is compared.
    pub fn text(&self) -> String {
        self.0.inner_xml().trim().to_string()
    }

    /// Text the translation id is derived from: placeholders collapse to
    /// their upper-cased names, examples are dropped.
    pub fn presentable_text(&self) -> String {
        let mut out = String::new();
        for child in &self.0.children {
            match child {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(ph) if ph.name == "ph" => {
                    out.push_str(&ph.attr("name").unwrap_or_default().to_uppercase())
                }
                _ => {}
            }
        }
        let trimmed = out.trim();
        let trimmed = trimmed.strip_prefix("'''").unwrap_or(trimmed);
        let trimmed = trimmed.strip_suffix("'''").unwrap_or(trimmed);
        trimmed.to_string()
    }

    pub fn id(&self) -> MessageId {
        MessageId::with_meaning(&self.presentable_text(), self.meaning())
    }

    pub fn element(&self) -> &'a Element {
        self.0
    }
}

impl ResourceDocument {
    pub fn read(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path)?;
        Self::parse(&xml, path)
    }

    pub fn parse(xml: &str, path: &Path) -> Result<Self> {
        let doc = parse_document(xml, path)?;
        Ok(ResourceDocument {
            path: path.to_path_buf(),
            leading_comments: doc.leading_comments,
            root: doc.root,
        })
    }

    /// Same document identity with a different tree.
    pub fn with_root(&self, root: Element) -> Self {
        ResourceDocument {
            path: self.path.clone(),
            leading_comments: self.leading_comments.clone(),
            root,
        }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// File name without extension, e.g. `brave_strings`.
    pub fn basename(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<Message<'_>> {
        self.root
            .descendants_named("message")
            .into_iter()
            .map(Message)
            .collect()
    }

    pub fn parts(&self) -> Vec<&Element> {
        self.root.descendants_named("part")
    }

    pub fn files(&self) -> Vec<&Element> {
        self.root.descendants_named("file")
    }

    pub fn outputs(&self) -> Vec<&Element> {
        self.root.descendants_named("output")
    }

    pub fn find_message(&self, name: &str) -> Option<Message<'_>> {
        self.root
            .find(&|e: &Element| e.name == "message" && e.attr("name") == Some(name))
            .map(Message)
    }

    pub fn find_message_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.root
            .find_mut(&|e: &Element| e.name == "message" && e.attr("name") == Some(name))
    }

    /// Like `find_message`, but absence is a `MissingMessage` failure.
    pub fn require_message(&self, name: &str) -> Result<Message<'_>> {
        self.find_message(name).ok_or_else(|| {
            RebaseError::MissingMessage {
                document: self.path.clone(),
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn require_message_mut(&mut self, name: &str) -> Result<&mut Element> {
        let document = self.path.clone();
        self.find_message_mut(name).ok_or_else(|| {
            RebaseError::MissingMessage {
                document,
                name: name.to_string(),
            }
            .into()
        })
    }

    /// The first `<messages>` container, where new messages are appended.
    pub fn messages_container_mut(&mut self) -> Option<&mut Element> {
        if self.root.name == "messages" {
            return Some(&mut self.root);
        }
        self.root.find_mut(&|e: &Element| e.name == "messages")
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        for comment in &self.leading_comments {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->\n");
        }
        out.push_str(&self.root.to_xml_string());
        out.push('\n');
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_xml_string())?;
        tracing::debug!(event = "catalog_written", path = %path.display());
        Ok(())
    }
}

/// Whether `path` carries one of the catalog extensions.
pub fn is_catalog_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CATALOG_EXTENSIONS.contains(&ext))
}
