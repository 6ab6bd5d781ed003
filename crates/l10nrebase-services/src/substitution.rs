use crate::Result;
use l10nrebase_config::{SubstitutionRule, SubstitutionTarget};
use l10nrebase_parsers_xml::{Element, Node, ResourceDocument};
use regex::Regex;
use std::path::Path;

/// Attributes holding file references, rewritten by path rules.
const PATH_ATTRIBUTES: &[(&str, &str)] = &[
    ("part", "file"),
    ("file", "path"),
    ("output", "filename"),
    ("structure", "file"),
    ("include", "file"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only the rules flagged as branding.
    Branding,
    Full,
}

/// Turns an upstream tree into its locally customized form.
pub trait Substitutor {
    fn substitute(&self, root: &Element, scope: Scope) -> Element;
}

#[derive(Debug)]
struct CompiledRule {
    regex: Regex,
    replacement: String,
    branding: bool,
    target: SubstitutionTarget,
}

/// Ordered regex rules; message text and file references are handled
/// by separate rule sets.
#[derive(Debug, Default)]
pub struct RuleSubstitutor {
    rules: Vec<CompiledRule>,
}

impl RuleSubstitutor {
    pub fn new(rules: &[SubstitutionRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|r| -> Result<CompiledRule> {
                Ok(CompiledRule {
                    regex: Regex::new(&r.pattern)?,
                    replacement: r.replacement.clone(),
                    branding: r.branding,
                    target: r.target,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleSubstitutor { rules })
    }

    fn apply(&self, input: &str, scope: Scope, target: SubstitutionTarget) -> String {
        let mut out = input.to_string();
        for rule in self
            .rules
            .iter()
            .filter(|r| r.target == target && (scope == Scope::Full || r.branding))
        {
            out = rule
                .regex
                .replace_all(&out, rule.replacement.as_str())
                .into_owned();
        }
        out
    }

    pub fn substitute_text(&self, input: &str, scope: Scope) -> String {
        self.apply(input, scope, SubstitutionTarget::Text)
    }

    pub fn substitute_path(&self, input: &str, scope: Scope) -> String {
        self.apply(input, scope, SubstitutionTarget::Path)
    }

    fn substitute_message_text(&self, el: &mut Element, scope: Scope) {
        for child in el.children.iter_mut() {
            match child {
                Node::Text(t) | Node::CData(t) => *t = self.substitute_text(t, scope),
                Node::Element(e) => self.substitute_message_text(e, scope),
                _ => {}
            }
        }
    }
}

impl Substitutor for RuleSubstitutor {
    fn substitute(&self, root: &Element, scope: Scope) -> Element {
        let mut out = root.clone();
        out.for_each_element_mut(&mut |el: &mut Element| {
            if el.name == "message" {
                self.substitute_message_text(el, scope);
                return;
            }
            for (name, attr) in PATH_ATTRIBUTES {
                if el.name == *name {
                    if let Some(value) = el.attr(attr) {
                        let swapped = self.substitute_path(value, scope);
                        el.set_attr(attr, swapped);
                    }
                }
            }
        });
        out
    }
}

/// Apply `scope` rules to the catalog at `path` and write it back.
pub fn substitute_in_place(path: &Path, substitutor: &dyn Substitutor, scope: Scope) -> Result<()> {
    let doc = ResourceDocument::read(path)?;
    let root = substitutor.substitute(&doc.root, scope);
    doc.with_root(root).write(path)?;
    tracing::debug!(event = "substituted_in_place", path = %path.display(), ?scope);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rule(pattern: &str, replacement: &str, branding: bool) -> SubstitutionRule {
        SubstitutionRule {
            pattern: pattern.into(),
            replacement: replacement.into(),
            branding,
            target: SubstitutionTarget::Text,
        }
    }

    fn substitutor() -> RuleSubstitutor {
        let mut path_rule = rule("chromium_strings", "brave_strings", false);
        path_rule.target = SubstitutionTarget::Path;
        RuleSubstitutor::new(&[
            rule(r"\bGoogle LLC\b", "Brave Software, Inc.", true),
            rule(r"\bChrome\b", "Brave", false),
            path_rule,
        ])
        .unwrap()
    }

    const GRD: &str = r#"<grit>
  <outputs><output filename="chromium_strings_en.pak" type="data_package"/></outputs>
  <release seq="1"><messages>
    <message name="IDS_A" desc="Chrome here is not translated">Hello Chrome <ph name="X">Chrome<ex>Chrome</ex></ph></message>
    <message name="IDS_B">Copyright Google LLC</message>
  </messages></release>
</grit>"#;

    fn doc() -> ResourceDocument {
        ResourceDocument::parse(GRD, &PathBuf::from("chromium_strings.grd")).unwrap()
    }

    #[test]
    fn branding_scope_only_applies_branding_rules() {
        let s = substitutor();
        let doc = doc().with_root(s.substitute(&doc().root, Scope::Branding));
        assert_eq!(doc.find_message("IDS_A").unwrap().element().text(), "Hello Chrome ChromeChrome");
        assert_eq!(doc.find_message("IDS_B").unwrap().text(), "Copyright Brave Software, Inc.");
        assert_eq!(doc.outputs()[0].attr("filename"), Some("chromium_strings_en.pak"));
    }

    #[test]
    fn full_scope_rewrites_text_and_paths_but_not_attributes() {
        let s = substitutor();
        let doc = doc().with_root(s.substitute(&doc().root, Scope::Full));
        let a = doc.find_message("IDS_A").unwrap();
        assert_eq!(a.text(), r#"Hello Brave <ph name="X">Brave<ex>Brave</ex></ph>"#);
        assert_eq!(a.desc(), Some("Chrome here is not translated"));
        assert_eq!(doc.outputs()[0].attr("filename"), Some("brave_strings_en.pak"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        assert!(RuleSubstitutor::new(&[rule("(", "x", false)]).is_err());
    }

    #[test]
    fn in_place_substitution_keeps_leading_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chromium_strings.grd");
        std::fs::write(&path, format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- c -->\n{GRD}\n")).unwrap();
        substitute_in_place(&path, &substitutor(), Scope::Full).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- c -->\n<grit>"));
        assert!(written.contains("Hello Brave"));
    }
}
