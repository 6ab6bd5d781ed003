use crate::tree::{parse_document, Element, Node};
use l10nrebase_core::{MessageId, Result};
use std::fs;
use std::path::{Path, PathBuf};

const XTB_PROLOG: &str = "<?xml version=\"1.0\" ?>\n<!DOCTYPE translationbundle>\n";

/// Per-locale `<translationbundle>` of `<translation id="...">` entries.
#[derive(Debug, Clone)]
pub struct TranslationBundle {
    pub path: PathBuf,
    pub root: Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

impl TranslationBundle {
    pub fn read(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path)?;
        Self::parse(&xml, path)
    }

    pub fn parse(xml: &str, path: &Path) -> Result<Self> {
        let doc = parse_document(xml, path)?;
        Ok(TranslationBundle {
            path: path.to_path_buf(),
            root: doc.root,
        })
    }

    pub fn lang(&self) -> Option<&str> {
        self.root.attr("lang")
    }

    pub fn len(&self) -> usize {
        self.translations().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn translations(&self) -> impl Iterator<Item = &Element> {
        self.root.child_elements().filter(|e| e.name == "translation")
    }

    pub fn translation(&self, id: &MessageId) -> Option<&Element> {
        self.translations()
            .find(|e| e.attr("id") == Some(id.as_str()))
    }

    /// Insert a translation for `id`, or overwrite the content of the one
    /// already present. Content nodes are copied as-is (placeholders too).
    pub fn upsert(&mut self, id: &MessageId, content: Vec<Node>) -> Upsert {
        let existing = self.root.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.name == "translation" && e.attr("id") == Some(id.as_str()) => {
                Some(e)
            }
            _ => None,
        });
        if let Some(e) = existing {
            e.children = content;
            return Upsert::Updated;
        }
        let mut el = Element::new("translation");
        el.set_attr("id", id.as_str());
        el.children = content;
        self.root.append_element(el);
        Upsert::Inserted
    }

    /// Serialized form: fixed prolog, translations unindented, no trailing
    /// newline after the closing tag.
    pub fn to_xml_string(&self) -> String {
        let mut root = self.root.clone();
        let mut prev_blank: Option<usize> = None;
        let mut unindent = Vec::new();
        for (idx, child) in root.children.iter().enumerate() {
            match child {
                Node::Element(e) if e.name == "translation" => {
                    if let Some(p) = prev_blank {
                        unindent.push(p);
                    }
                    prev_blank = None;
                }
                n if n.is_blank_text() => prev_blank = Some(idx),
                _ => prev_blank = None,
            }
        }
        for idx in unindent {
            if let Node::Text(t) = &mut root.children[idx] {
                let keep = t.rfind('\n').map_or(0, |nl| nl + 1);
                t.truncate(keep);
            }
        }
        let mut out = String::from(XTB_PROLOG);
        out.push_str(&root.to_xml_string());
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_xml_string())?;
        tracing::info!(event = "bundle_written", path = %path.display(), translations = self.len());
        Ok(())
    }
}
